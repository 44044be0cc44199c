//! Fundamental types for the price feeder.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! asset pairs, exchange rates, voting periods, addresses, oracle parameters,
//! and the prevote/vote messages exchanged with the chain.

pub mod address;
pub mod error;
pub mod hash;
pub mod message;
pub mod pair;
pub mod params;
pub mod period;
pub mod price;
pub mod rate;

pub use address::{FeederAddress, ValidatorAddress};
pub use error::TypesError;
pub use hash::CommitmentHash;
pub use message::{Prevote, PrevoteMsg, Salt, Vote, VoteMsg};
pub use pair::AssetPair;
pub use params::OracleParams;
pub use period::VotingPeriod;
pub use price::Price;
pub use rate::{ExchangeRate, RateSet};
