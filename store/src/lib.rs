//! In-memory storage for the feeder's outstanding prevote.
//!
//! Only the commitment from the immediately preceding voting period is ever
//! revealed, so the store holds at most one [`Prevote`](feeder_types::Prevote).
//! Nothing is persisted: a restart starts empty and the first cycle after it
//! skips its vote.

pub mod prevote;

pub use prevote::{PrevoteReader, PrevoteStore};
