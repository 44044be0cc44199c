//! Commit/reveal records and the two oracle transaction messages.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{CommitmentHash, FeederAddress, RateSet, TypesError, ValidatorAddress, VotingPeriod};

/// Secret mixed into a commitment and revealed with the vote.
///
/// The oracle module accepts 1 to 4 characters; the feeder always uses
/// decimal digits.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Salt(String);

impl Salt {
    pub const MAX_LEN: usize = 4;
    /// Exclusive upper bound of numeric salts.
    pub const SPACE: u16 = 10_000;

    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        if s.is_empty() || s.len() > Self::MAX_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TypesError::InvalidSalt(s));
        }
        Ok(Self(s))
    }

    pub fn from_number(n: u16) -> Result<Self, TypesError> {
        if n >= Self::SPACE {
            return Err(TypesError::InvalidSalt(n.to_string()));
        }
        Ok(Self(n.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Salts are secret until revealed.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(..)")
    }
}

impl TryFrom<String> for Salt {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<Salt> for String {
    fn from(salt: Salt) -> Self {
        salt.0
    }
}

/// A commitment this feeder submitted for one voting period.
///
/// Created by the vote cycle, held by the prevote store, and consumed once
/// by the next period's vote. Never mutated after creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Prevote {
    pub period: VotingPeriod,
    pub hash: CommitmentHash,
    pub salt: Salt,
    pub rates: RateSet,
}

/// A reveal of the previous period's commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    /// Period the vote is cast in.
    pub period: VotingPeriod,
    /// Period whose prevote is being revealed (always `period - 1`).
    pub prevote_period: VotingPeriod,
    pub salt: Salt,
    pub rates: RateSet,
}

impl Vote {
    /// Reveal `prevote` during `period`.
    pub fn revealing(prevote: &Prevote, period: VotingPeriod) -> Self {
        Self {
            period,
            prevote_period: prevote.period,
            salt: prevote.salt.clone(),
            rates: prevote.rates.clone(),
        }
    }
}

/// Wire form of the aggregate exchange-rate prevote transaction message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrevoteMsg {
    pub hash: String,
    pub feeder: FeederAddress,
    pub validator: ValidatorAddress,
}

impl PrevoteMsg {
    pub fn new(hash: &CommitmentHash, feeder: FeederAddress, validator: ValidatorAddress) -> Self {
        Self {
            hash: hash.to_string(),
            feeder,
            validator,
        }
    }
}

/// Wire form of the aggregate exchange-rate vote transaction message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMsg {
    pub salt: String,
    pub exchange_rates: String,
    pub feeder: FeederAddress,
    pub validator: ValidatorAddress,
}

impl VoteMsg {
    pub fn new(vote: &Vote, feeder: FeederAddress, validator: ValidatorAddress) -> Self {
        Self {
            salt: vote.salt.as_str().to_string(),
            exchange_rates: vote.rates.canonical_string(),
            feeder,
            validator,
        }
    }
}
