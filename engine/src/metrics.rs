//! Prometheus metrics for the feeder.
//!
//! [`FeederMetrics`] owns a dedicated [`Registry`] that the daemon's
//! `/metrics` endpoint encodes into the Prometheus text exposition format.
//! It is fed from the engine's event bus through [`FeederMetrics::listener`].

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::Arc;

use crate::event::CycleEvent;

pub struct FeederMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub prevotes_submitted: IntCounter,
    pub votes_submitted: IntCounter,
    pub votes_skipped: IntCounter,
    /// Failed submissions, labelled by `kind` and `class`.
    pub submission_failures: IntCounterVec,
    pub cycles_abandoned: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Last voting period the engine emitted an event for.
    pub last_period: IntGauge,
}

impl FeederMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let prevotes_submitted = register_int_counter_with_registry!(
            Opts::new(
                "feeder_prevotes_submitted_total",
                "Prevotes accepted by the chain"
            ),
            registry
        )
        .expect("failed to register prevotes_submitted counter");

        let votes_submitted = register_int_counter_with_registry!(
            Opts::new("feeder_votes_submitted_total", "Votes accepted by the chain"),
            registry
        )
        .expect("failed to register votes_submitted counter");

        let votes_skipped = register_int_counter_with_registry!(
            Opts::new(
                "feeder_votes_skipped_total",
                "Cycles that had no previous prevote to reveal"
            ),
            registry
        )
        .expect("failed to register votes_skipped counter");

        let submission_failures = register_int_counter_vec_with_registry!(
            Opts::new(
                "feeder_submission_failures_total",
                "Failed prevote and vote submissions"
            ),
            &["kind", "class"],
            registry
        )
        .expect("failed to register submission_failures counter");

        let cycles_abandoned = register_int_counter_with_registry!(
            Opts::new(
                "feeder_cycles_abandoned_total",
                "Cycles dropped after running past their deadline"
            ),
            registry
        )
        .expect("failed to register cycles_abandoned counter");

        let last_period = register_int_gauge_with_registry!(
            Opts::new("feeder_last_period", "Last voting period handled"),
            registry
        )
        .expect("failed to register last_period gauge");

        Self {
            registry,
            prevotes_submitted,
            votes_submitted,
            votes_skipped,
            submission_failures,
            cycles_abandoned,
            last_period,
        }
    }

    pub fn record(&self, event: &CycleEvent) {
        self.last_period
            .set(i64::try_from(event.period().index()).unwrap_or(i64::MAX));
        match event {
            CycleEvent::PrevoteSubmitted { .. } => self.prevotes_submitted.inc(),
            CycleEvent::VoteSubmitted { .. } => self.votes_submitted.inc(),
            CycleEvent::VoteSkipped { .. } => self.votes_skipped.inc(),
            CycleEvent::SubmissionFailed { kind, class, .. } => self
                .submission_failures
                .with_label_values(&[kind.as_str(), class.as_str()])
                .inc(),
            CycleEvent::CycleAbandoned { .. } => self.cycles_abandoned.inc(),
        }
    }

    /// An event-bus listener that records into `metrics`.
    pub fn listener(metrics: Arc<Self>) -> Box<dyn Fn(&CycleEvent) + Send + Sync> {
        Box::new(move |event| metrics.record(event))
    }
}

impl Default for FeederMetrics {
    fn default() -> Self {
        Self::new()
    }
}
