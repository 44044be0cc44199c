//! Voting periods from block heights.
//!
//! The period of a height is `height / vote_period`. The vote period is an
//! oracle module parameter that governance can change, so it is fetched
//! through the gateway and cached for a short TTL. Callers pass `now`
//! explicitly; nothing here reads the wall clock.

use feeder_gateway::ChainGateway;
use feeder_types::{OracleParams, VotingPeriod};
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;

use crate::EngineError;

/// Oracle params with a time-to-live.
pub struct ParamsCache {
    ttl: Duration,
    entry: Option<(OracleParams, Instant)>,
}

impl ParamsCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entry: None }
    }

    /// Cached params, if fetched less than `ttl` before `now`.
    pub fn fresh(&self, now: Instant) -> Option<&OracleParams> {
        self.entry
            .as_ref()
            .filter(|(_, fetched_at)| now.saturating_duration_since(*fetched_at) < self.ttl)
            .map(|(params, _)| params)
    }

    /// Cached params regardless of age.
    pub fn last(&self) -> Option<&OracleParams> {
        self.entry.as_ref().map(|(params, _)| params)
    }

    pub fn store(&mut self, params: OracleParams, now: Instant) {
        self.entry = Some((params, now));
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }
}

/// A period boundary reported by [`PeriodClock::observe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodSignal {
    pub period: VotingPeriod,
    /// The vote period length changed since the previous signal. Periods
    /// before this one were numbered under the old length.
    pub rebased: bool,
}

/// Derives voting periods and boundary signals from block heights.
pub struct PeriodClock {
    gateway: Arc<dyn ChainGateway>,
    cache: ParamsCache,
    last_signalled: Option<VotingPeriod>,
    /// Length the signalled periods were numbered with.
    signalled_len: Option<NonZeroU64>,
}

impl PeriodClock {
    pub fn new(gateway: Arc<dyn ChainGateway>, params_ttl: Duration) -> Self {
        Self {
            gateway,
            cache: ParamsCache::new(params_ttl),
            last_signalled: None,
            signalled_len: None,
        }
    }

    /// Current vote period length in blocks.
    ///
    /// Refreshes the params when the cache is stale. If the refresh fails
    /// transiently and an older value is cached, the older value is used.
    /// A zero vote period is a [`EngineError::Configuration`] error and is
    /// never cached.
    pub async fn vote_period_len(&mut self, now: Instant) -> Result<NonZeroU64, EngineError> {
        if let Some(params) = self.cache.fresh(now) {
            return Ok(params.vote_period_len()?);
        }

        let queried = self
            .gateway
            .query_oracle_params()
            .instrument(feeder_utils::tracing_spans::query_span("params"))
            .await;
        match queried {
            Ok(params) => {
                let len = match params.vote_period_len() {
                    Ok(len) => len,
                    Err(e) => {
                        self.cache.invalidate();
                        tracing::error!("chain reports a zero vote period");
                        return Err(e.into());
                    }
                };
                if let Some(previous) = self.cache.last() {
                    if previous.vote_period != params.vote_period {
                        tracing::info!(
                            old = previous.vote_period,
                            new = params.vote_period,
                            "vote period changed"
                        );
                    }
                }
                self.cache.store(params, now);
                Ok(len)
            }
            Err(e) if e.is_retryable() => match self.cache.last() {
                Some(params) => {
                    tracing::warn!(error = %e, "params refresh failed, using cached vote period");
                    Ok(params.vote_period_len()?)
                }
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    pub async fn current_period(&mut self, height: u64, now: Instant) -> Result<VotingPeriod, EngineError> {
        let len = self.vote_period_len(now).await?;
        Ok(VotingPeriod::from_height(height, len))
    }

    /// Whether `height` is the first height of its period.
    pub async fn is_period_boundary(&mut self, height: u64, now: Instant) -> Result<bool, EngineError> {
        let len = self.vote_period_len(now).await?;
        Ok(VotingPeriod::is_boundary(height, len))
    }

    /// Feed one observed height.
    ///
    /// Returns the new period the first time a height from a later period
    /// than any signalled before is seen. The very first observation always
    /// signals, so a feeder started mid-period acts right away. Heights may
    /// skip blocks; the boundary height itself need not be observed.
    ///
    /// When the vote period length changes, period indices restart from
    /// `height / new_len`, which can be lower than the last signalled one.
    /// The sequence is then restarted and the signal is marked `rebased`.
    pub async fn observe(&mut self, height: u64, now: Instant) -> Result<Option<PeriodSignal>, EngineError> {
        let len = self.vote_period_len(now).await?;
        let rebased = self.signalled_len.is_some_and(|old| old != len);
        if rebased {
            tracing::info!(
                height,
                old = self.signalled_len.map_or(0, NonZeroU64::get),
                new = len.get(),
                "vote period length changed, restarting period sequence"
            );
            self.last_signalled = None;
        }
        self.signalled_len = Some(len);

        let period = VotingPeriod::from_height(height, len);
        if self.last_signalled.is_some_and(|last| period <= last) {
            return Ok(None);
        }
        tracing::debug!(height, period = %period, "period boundary");
        self.last_signalled = Some(period);
        Ok(Some(PeriodSignal { period, rebased }))
    }

    pub fn last_signalled(&self) -> Option<VotingPeriod> {
        self.last_signalled
    }
}
