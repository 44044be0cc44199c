//! Voting period arithmetic.
//!
//! A voting period is `height / vote_period` (integer division). Periods are
//! totally ordered and strictly increase with block height.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU64;

/// Identifier of one oracle voting round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VotingPeriod(u64);

impl VotingPeriod {
    pub fn new(index: u64) -> Self {
        Self(index)
    }

    /// The period containing `height`.
    pub fn from_height(height: u64, vote_period: NonZeroU64) -> Self {
        Self(height / vote_period.get())
    }

    pub fn index(&self) -> u64 {
        self.0
    }

    /// The period before this one, if any.
    pub fn previous(&self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }

    /// First block height belonging to this period.
    pub fn start_height(&self, vote_period: NonZeroU64) -> u64 {
        self.0.saturating_mul(vote_period.get())
    }

    /// Whether `height` is the first height of its period.
    pub fn is_boundary(height: u64, vote_period: NonZeroU64) -> bool {
        height % vote_period.get() == 0
    }
}

impl fmt::Display for VotingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
