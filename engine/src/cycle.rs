//! The per-period commit/reveal state machine.
//!
//! One cycle runs per voting period N:
//!
//! 1. Fetch the vote targets and current prices for them.
//! 2. Reveal: if the store holds the prevote committed for N-1, submit a
//!    vote revealing its salt and rates, then delete it. Otherwise skip.
//! 3. Commit: draw a fresh salt, hash the rates, submit a prevote for N and
//!    store it once the chain accepts it.
//!
//! Steps 2 and 3 are independent. A failed reveal does not stop the new
//! commitment, and a failed commitment leaves nothing for N, which makes
//! the cycle at N+1 skip its vote.

use feeder_crypto::{commitment_hash, verify_commitment, SaltGenerator};
use feeder_gateway::{ChainGateway, PriceSource};
use feeder_store::{PrevoteReader, PrevoteStore};
use feeder_types::{
    FeederAddress, Prevote, PrevoteMsg, RateSet, ValidatorAddress, Vote, VoteMsg, VotingPeriod,
};
use feeder_utils::tracing_spans::{cycle_span, submit_span};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::event::{CycleEvent, CycleEventBus, CycleReport, FailureClass, SkipReason, SubmissionKind};
use crate::{EngineError, SubmissionRetrier};

/// Where the engine is within a cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    AwaitingVoteTargets,
    VoteSubmission,
    PrevoteSubmission,
    /// The vote step found nothing to reveal. The prevote step follows.
    Skipped,
}

/// The validator the feeder votes for and the account that signs for it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoterIdentity {
    pub validator: ValidatorAddress,
    pub feeder: FeederAddress,
}

pub struct VoteCycleEngine {
    gateway: Arc<dyn ChainGateway>,
    prices: Arc<dyn PriceSource>,
    salts: Box<dyn SaltGenerator>,
    retrier: SubmissionRetrier,
    identity: VoterIdentity,
    store: PrevoteStore,
    bus: CycleEventBus,
    state: CycleState,
    last_period: Option<VotingPeriod>,
    /// Events of the cycle in progress.
    report: CycleReport,
}

impl VoteCycleEngine {
    pub fn new(
        gateway: Arc<dyn ChainGateway>,
        prices: Arc<dyn PriceSource>,
        salts: Box<dyn SaltGenerator>,
        retrier: SubmissionRetrier,
        identity: VoterIdentity,
    ) -> Self {
        Self {
            gateway,
            prices,
            salts,
            retrier,
            identity,
            store: PrevoteStore::new(),
            bus: CycleEventBus::new(),
            state: CycleState::Idle,
            last_period: None,
            report: CycleReport::default(),
        }
    }

    /// Register a listener for every event the engine emits.
    pub fn subscribe(&mut self, listener: Box<dyn Fn(&CycleEvent) + Send + Sync>) {
        self.bus.subscribe(listener);
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Last period a cycle was started for.
    pub fn last_period(&self) -> Option<VotingPeriod> {
        self.last_period
    }

    /// Read-only view of the prevote store.
    pub fn store(&self) -> PrevoteReader {
        self.store.reader()
    }

    pub fn identity(&self) -> &VoterIdentity {
        &self.identity
    }

    /// Start a new period sequence after the vote period length changed.
    ///
    /// Period indices under the new length are not comparable with the old
    /// ones, so the last period is forgotten and the held commitment, whose
    /// period can no longer be matched, is dropped. The next cycle skips
    /// its vote.
    pub fn rebase(&mut self) {
        self.last_period = None;
        if let Some(dropped) = self.store.clear() {
            tracing::warn!(period = %dropped.period, "dropped prevote committed under the old vote period length");
        }
    }

    /// Run the cycle for `period`.
    ///
    /// Submission failures are reported as events and do not make this
    /// fail. Errors are reserved for:
    /// - [`EngineError::ProtocolViolation`]: `period` is not later than the
    ///   last cycle's, or the store holds a commitment that cannot be
    ///   revealed honestly. Nothing is submitted.
    /// - [`EngineError::Cancelled`]: shutdown interrupted the cycle.
    pub async fn run_cycle(&mut self, period: VotingPeriod) -> Result<CycleReport, EngineError> {
        if let Some(last) = self.last_period {
            if period <= last {
                return Err(EngineError::ProtocolViolation(format!(
                    "cycle for period {period} requested after period {last}"
                )));
            }
        }
        self.last_period = Some(period);
        self.report = CycleReport::new(period);

        let outcome = self.cycle_steps(period).instrument(cycle_span(period)).await;
        self.state = CycleState::Idle;
        outcome.map(|()| std::mem::take(&mut self.report))
    }

    /// [`run_cycle`](Self::run_cycle) bounded by `deadline`.
    ///
    /// A cycle that runs out of time is dropped wherever it was: steps that
    /// had not completed leave the store untouched. The report then ends
    /// with [`CycleEvent::CycleAbandoned`], and the period still counts as
    /// run.
    pub async fn run_cycle_with_deadline(
        &mut self,
        period: VotingPeriod,
        deadline: Duration,
    ) -> Result<CycleReport, EngineError> {
        match tokio::time::timeout(deadline, self.run_cycle(period)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(period = %period, deadline_ms = deadline.as_millis() as u64, "cycle deadline expired, abandoning");
                self.state = CycleState::Idle;
                self.emit(CycleEvent::CycleAbandoned { period, deadline });
                Ok(std::mem::take(&mut self.report))
            }
        }
    }

    async fn cycle_steps(&mut self, period: VotingPeriod) -> Result<(), EngineError> {
        self.state = CycleState::AwaitingVoteTargets;
        let rates = self.fetch_rates().await;
        if matches!(rates, Err(EngineError::Cancelled)) {
            return Err(EngineError::Cancelled);
        }

        self.vote_step(period).await?;
        self.prevote_step(period, rates).await
    }

    async fn fetch_rates(&self) -> Result<RateSet, EngineError> {
        let gateway = Arc::clone(&self.gateway);
        let targets = self
            .retrier
            .run("query_vote_targets", || gateway.query_vote_targets())
            .await?;
        if targets.is_empty() {
            return Ok(RateSet::new());
        }
        let prices = self
            .retrier
            .cancellable(self.prices.fetch_prices(&targets))
            .await?;
        let rates = RateSet::from_targets(&targets, &prices);
        tracing::debug!(
            targets = targets.len(),
            voted = rates.voted_count(),
            abstained = rates.len() - rates.voted_count(),
            "built exchange rates"
        );
        Ok(rates)
    }

    // ── Reveal ──────────────────────────────────────────────────────────

    async fn vote_step(&mut self, period: VotingPeriod) -> Result<(), EngineError> {
        let Some(previous) = period.previous() else {
            self.skip_vote(period, SkipReason::NoPrevote);
            return Ok(());
        };

        let prevote = match self.store.latest() {
            None => {
                self.skip_vote(period, SkipReason::NoPrevote);
                return Ok(());
            }
            Some(held) if held.period < previous => {
                self.store.prune_before(previous);
                self.skip_vote(period, SkipReason::StalePrevote { held: held.period });
                return Ok(());
            }
            Some(held) if held.period > previous => {
                return Err(EngineError::ProtocolViolation(format!(
                    "store holds a prevote for period {} during cycle {period}",
                    held.period
                )));
            }
            Some(held) => held,
        };

        if !verify_commitment(&prevote.hash, &prevote.salt, &prevote.rates, &self.identity.validator) {
            return Err(EngineError::ProtocolViolation(format!(
                "stored commitment for period {} does not match its contents",
                prevote.period
            )));
        }

        let vote = Vote::revealing(&prevote, period);
        let msg = VoteMsg::new(
            &vote,
            self.identity.feeder.clone(),
            self.identity.validator.clone(),
        );
        tracing::info!(
            period = %period,
            revealed = %prevote.period,
            pairs = vote.rates.len(),
            "prepared vote message"
        );

        self.state = CycleState::VoteSubmission;
        let gateway = Arc::clone(&self.gateway);
        let submitted = self
            .retrier
            .run("broadcast_vote", || gateway.broadcast_vote(&msg))
            .instrument(submit_span(SubmissionKind::Vote.as_str(), period))
            .await;

        match submitted {
            Ok(tx) => {
                self.store.remove(prevote.period);
                tracing::info!(period = %period, tx_hash = %tx.tx_hash, "vote submitted");
                self.emit(CycleEvent::VoteSubmitted {
                    period,
                    revealed: prevote.period,
                    tx_hash: tx.tx_hash,
                });
                Ok(())
            }
            Err(e) => self.submission_failed(period, SubmissionKind::Vote, e),
        }
    }

    fn skip_vote(&mut self, period: VotingPeriod, reason: SkipReason) {
        self.state = CycleState::Skipped;
        tracing::info!(period = %period, ?reason, "skipping vote preparation as there is no old prevote");
        self.emit(CycleEvent::VoteSkipped { period, reason });
    }

    // ── Commit ──────────────────────────────────────────────────────────

    async fn prevote_step(
        &mut self,
        period: VotingPeriod,
        rates: Result<RateSet, EngineError>,
    ) -> Result<(), EngineError> {
        let rates = match rates {
            Ok(rates) if rates.is_empty() => {
                tracing::warn!(period = %period, "oracle has no vote targets");
                return self.submission_failed(
                    period,
                    SubmissionKind::Prevote,
                    EngineError::ProtocolViolation("no vote targets to commit to".into()),
                );
            }
            Ok(rates) => rates,
            Err(e) => return self.submission_failed(period, SubmissionKind::Prevote, e),
        };

        let salt = self.salts.next_salt();
        let hash = commitment_hash(&salt, &rates, &self.identity.validator);
        let msg = PrevoteMsg::new(
            &hash,
            self.identity.feeder.clone(),
            self.identity.validator.clone(),
        );
        let prevote = Prevote {
            period,
            hash,
            salt,
            rates,
        };

        self.state = CycleState::PrevoteSubmission;
        let gateway = Arc::clone(&self.gateway);
        let submitted = self
            .retrier
            .run("broadcast_prevote", || gateway.broadcast_prevote(&msg))
            .instrument(submit_span(SubmissionKind::Prevote.as_str(), period))
            .await;

        match submitted {
            Ok(tx) => {
                if let Some(displaced) = self.store.put(prevote) {
                    tracing::debug!(period = %displaced.period, "discarded unrevealed prevote");
                }
                tracing::info!(period = %period, hash = %hash, tx_hash = %tx.tx_hash, "prevote submitted");
                self.emit(CycleEvent::PrevoteSubmitted {
                    period,
                    hash,
                    tx_hash: tx.tx_hash,
                });
                Ok(())
            }
            Err(e) => self.submission_failed(period, SubmissionKind::Prevote, e),
        }
    }

    // ── Events ──────────────────────────────────────────────────────────

    /// Record a failed step. Only cancellation propagates.
    fn submission_failed(
        &mut self,
        period: VotingPeriod,
        kind: SubmissionKind,
        error: EngineError,
    ) -> Result<(), EngineError> {
        let class = FailureClass::of(&error);
        tracing::warn!(
            period = %period,
            kind = kind.as_str(),
            class = class.as_str(),
            error = %error,
            "submission failed"
        );
        self.emit(CycleEvent::SubmissionFailed {
            period,
            kind,
            class,
            reason: error.to_string(),
        });
        match error {
            EngineError::Cancelled => Err(EngineError::Cancelled),
            _ => Ok(()),
        }
    }

    fn emit(&mut self, event: CycleEvent) {
        self.bus.emit(&event);
        self.report.events.push(event);
    }
}
