//! Validation errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid asset pair {0:?}: expected \"base:quote\"")]
    InvalidPair(String),

    #[error("invalid exchange rate {0:?}")]
    InvalidRate(String),

    #[error("invalid salt {0:?}: expected 1 to 4 decimal digits")]
    InvalidSalt(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid commitment hash {0}")]
    InvalidHash(String),

    #[error("vote period length must be greater than zero")]
    ZeroVotePeriod,
}
