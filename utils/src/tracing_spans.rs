//! Pre-built [`tracing::Span`] constructors for feeder operations.
//!
//! Using consistent span names and field sets across the codebase makes it
//! easy to filter, search, and correlate one voting period's activity.

use feeder_types::VotingPeriod;
use tracing::{info_span, Span};

/// Span covering one full vote cycle (vote reveal + new prevote).
pub fn cycle_span(period: VotingPeriod) -> Span {
    info_span!("vote_cycle", period = %period)
}

/// Span covering the delivery of one oracle message, retries included.
pub fn submit_span(kind: &str, period: VotingPeriod) -> Span {
    info_span!("submit", kind = %kind, period = %period)
}

/// Span covering a single query against the chain node.
pub fn query_span(query: &str) -> Span {
    info_span!("query", query = %query)
}
