//! Typed outcomes of a vote cycle.
//!
//! Every decision the engine makes is emitted as a [`CycleEvent`] on the
//! [`CycleEventBus`] and collected into the cycle's [`CycleReport`], so a
//! skipped vote is distinguishable from a cast one without reading logs.

use feeder_types::{CommitmentHash, VotingPeriod};
use std::fmt;
use std::time::Duration;

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubmissionKind {
    Prevote,
    Vote,
}

impl SubmissionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prevote => "prevote",
            Self::Vote => "vote",
        }
    }
}

impl fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a submission failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// Transient failures outlived the retry budget.
    Retryable,
    /// The request itself was refused, or could not be built.
    NonRetryable,
    /// Shutdown interrupted the submission.
    Cancelled,
}

impl FailureClass {
    pub fn of(error: &EngineError) -> Self {
        match error {
            EngineError::Network(_) => Self::Retryable,
            EngineError::PriceSource(feeder_gateway::PriceSourceError::Unavailable(_)) => {
                Self::Retryable
            }
            EngineError::Cancelled => Self::Cancelled,
            EngineError::Validation(_)
            | EngineError::PriceSource(_)
            | EngineError::Configuration(_)
            | EngineError::ProtocolViolation(_) => Self::NonRetryable,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retryable => "retryable",
            Self::NonRetryable => "non_retryable",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Why a cycle did not cast a vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing was committed for the previous period (first run, restart,
    /// or the previous prevote failed).
    NoPrevote,
    /// The held commitment belongs to a period older than the previous one.
    /// It was discarded.
    StalePrevote { held: VotingPeriod },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CycleEvent {
    PrevoteSubmitted {
        period: VotingPeriod,
        hash: CommitmentHash,
        tx_hash: String,
    },
    VoteSubmitted {
        period: VotingPeriod,
        /// Period whose commitment the vote revealed.
        revealed: VotingPeriod,
        tx_hash: String,
    },
    VoteSkipped {
        period: VotingPeriod,
        reason: SkipReason,
    },
    SubmissionFailed {
        period: VotingPeriod,
        kind: SubmissionKind,
        class: FailureClass,
        reason: String,
    },
    /// The cycle ran past its deadline and was dropped mid-flight.
    CycleAbandoned {
        period: VotingPeriod,
        deadline: Duration,
    },
}

impl CycleEvent {
    pub fn period(&self) -> VotingPeriod {
        match self {
            Self::PrevoteSubmitted { period, .. }
            | Self::VoteSubmitted { period, .. }
            | Self::VoteSkipped { period, .. }
            | Self::SubmissionFailed { period, .. }
            | Self::CycleAbandoned { period, .. } => *period,
        }
    }
}

/// Everything one cycle emitted, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub period: Option<VotingPeriod>,
    pub events: Vec<CycleEvent>,
}

impl CycleReport {
    pub fn new(period: VotingPeriod) -> Self {
        Self {
            period: Some(period),
            events: Vec::new(),
        }
    }

    pub fn voted(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CycleEvent::VoteSubmitted { .. }))
    }

    pub fn vote_skipped(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CycleEvent::VoteSkipped { .. }))
    }

    pub fn prevoted(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CycleEvent::PrevoteSubmitted { .. }))
    }

    pub fn abandoned(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, CycleEvent::CycleAbandoned { .. }))
    }

    /// Failures of the given submission kind.
    pub fn failures(&self, kind: SubmissionKind) -> impl Iterator<Item = (FailureClass, &str)> {
        self.events.iter().filter_map(move |e| match e {
            CycleEvent::SubmissionFailed {
                kind: k,
                class,
                reason,
                ..
            } if *k == kind => Some((*class, reason.as_str())),
            _ => None,
        })
    }
}

/// Synchronous fan-out event bus for cycle events.
///
/// Listeners are invoked inline on the cycle task; keep handlers fast.
pub struct CycleEventBus {
    listeners: Vec<Box<dyn Fn(&CycleEvent) + Send + Sync>>,
}

impl CycleEventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&CycleEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &CycleEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for CycleEventBus {
    fn default() -> Self {
        Self::new()
    }
}
