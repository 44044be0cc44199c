//! The feeder's run loop.
//!
//! Reads heights from a [`HeightSource`], turns them into period boundaries
//! with a [`PeriodClock`], and runs one bounded vote cycle per new period.
//! Cycles run strictly one after another; heights arriving during a cycle
//! wait in the feed and are evaluated once it finishes.

use feeder_gateway::{ChainGateway, HeightSource};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{EngineError, PeriodClock, ShutdownSignal, VoteCycleEngine};

pub struct FeederService {
    engine: VoteCycleEngine,
    clock: PeriodClock,
    heights: Box<dyn HeightSource>,
    gateway: Arc<dyn ChainGateway>,
    shutdown: ShutdownSignal,
    cycle_deadline: Duration,
}

impl FeederService {
    pub fn new(
        engine: VoteCycleEngine,
        clock: PeriodClock,
        heights: Box<dyn HeightSource>,
        gateway: Arc<dyn ChainGateway>,
        shutdown: ShutdownSignal,
        cycle_deadline: Duration,
    ) -> Self {
        Self {
            engine,
            clock,
            heights,
            gateway,
            shutdown,
            cycle_deadline,
        }
    }

    /// Run until shutdown, the height feed ends, or a fatal error.
    ///
    /// Fatal errors are [`EngineError::Configuration`] (e.g. a zero vote
    /// period) and [`EngineError::ProtocolViolation`]. The gateway is closed
    /// on every exit path.
    pub async fn run(mut self) -> Result<(), EngineError> {
        tracing::info!(
            validator = %self.engine.identity().validator,
            feeder = %self.engine.identity().feeder,
            "feeder service started"
        );
        let outcome = self.run_loop().await;
        self.gateway.close().await;
        match &outcome {
            Ok(()) => tracing::info!("feeder service stopped"),
            Err(e) => tracing::error!(error = %e, "feeder service failed"),
        }
        outcome
    }

    async fn run_loop(&mut self) -> Result<(), EngineError> {
        loop {
            let height = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Ok(()),
                next = self.heights.next_height() => match next {
                    Some(height) => height,
                    None => {
                        tracing::warn!("height feed ended");
                        return Ok(());
                    }
                },
            };

            let period = match self.clock.observe(height, Instant::now()).await {
                Ok(Some(signal)) => {
                    if signal.rebased {
                        self.engine.rebase();
                    }
                    signal.period
                }
                Ok(None) => continue,
                Err(e @ EngineError::Configuration(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(height, error = %e, "could not derive voting period");
                    continue;
                }
            };

            if self.engine.last_period().is_some_and(|last| period <= last) {
                tracing::debug!(period = %period, "period already handled");
                continue;
            }

            match self
                .engine
                .run_cycle_with_deadline(period, self.cycle_deadline)
                .await
            {
                Ok(report) => {
                    tracing::debug!(period = %period, events = report.events.len(), "cycle finished");
                }
                Err(EngineError::Cancelled) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}
