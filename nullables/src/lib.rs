//! Nullable infrastructure for deterministic testing.
//!
//! Every external collaborator of the feeder (chain node, price source,
//! block height feed, salt randomness, clock) sits behind a trait. This crate
//! provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be scripted to fail on demand
//! - Record what was sent to them for assertions
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod gateway;
pub mod height;
pub mod prices;
pub mod salt;

pub use clock::NullClock;
pub use gateway::NullGateway;
pub use height::{HeightSender, NullHeightSource};
pub use prices::StaticPriceSource;
pub use salt::NullSalt;
