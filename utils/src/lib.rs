//! Shared utilities for the price feeder.

pub mod logging;
pub mod tracing_spans;

pub use logging::{init_logging, LogFormat};
