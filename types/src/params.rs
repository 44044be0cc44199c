//! Oracle module parameters as reported by the chain.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

use crate::TypesError;

/// Parameters of the on-chain oracle module.
///
/// Only `vote_period` drives the feeder; the rest are carried for logging.
/// The chain can change any of them through governance, so callers must
/// not cache them for long.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleParams {
    /// Number of blocks in one voting period.
    pub vote_period: u64,
    /// Minimum voting power for a pair's rate to be accepted (decimal string).
    #[serde(default)]
    pub vote_threshold: Option<String>,
    /// Tolerated deviation from the weighted median (decimal string).
    #[serde(default)]
    pub reward_band: Option<String>,
    /// Number of blocks in one slashing window.
    #[serde(default)]
    pub slash_window: Option<u64>,
}

impl OracleParams {
    /// Params carrying only a vote period.
    pub fn with_vote_period(vote_period: u64) -> Self {
        Self {
            vote_period,
            vote_threshold: None,
            reward_band: None,
            slash_window: None,
        }
    }

    /// The vote period as a divisor; zero is a chain misconfiguration.
    pub fn vote_period_len(&self) -> Result<NonZeroU64, TypesError> {
        NonZeroU64::new(self.vote_period).ok_or(TypesError::ZeroVotePeriod)
    }
}
