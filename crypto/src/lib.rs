//! Commit-reveal primitives for the price feeder.
//!
//! - **SHA-256** commitments over `salt:rates:validator`, truncated to 20 bytes
//!   so the oracle module recomputes the same hash from the revealed vote
//! - Salt generation from the operating system's secure random source

pub mod commitment;
pub mod salt;

pub use commitment::{commitment_hash, commitment_preimage, verify_commitment};
pub use salt::{generate_salt, OsSaltGenerator, SaltGenerator};
