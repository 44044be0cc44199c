//! Bounded exponential backoff around gateway calls.
//!
//! Only retryable failures ([`GatewayError::is_retryable`]) are retried.
//! The delay starts at `base_delay` and doubles after each failed attempt,
//! capped at `max_delay`. Every call and every backoff sleep races the
//! shutdown signal, so shutdown never waits on a retry loop.

use feeder_gateway::GatewayError;
use std::future::Future;
use std::time::Duration;

use crate::{EngineError, ShutdownSignal};

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);
const DEFAULT_MAX_ATTEMPTS: u32 = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Total attempts, the first one included. Zero behaves like one.
    pub max_attempts: u32,
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before attempt `failed + 1`, after `failed` failures.
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

pub struct SubmissionRetrier {
    policy: RetryPolicy,
    shutdown: ShutdownSignal,
}

impl SubmissionRetrier {
    pub fn new(policy: RetryPolicy, shutdown: ShutdownSignal) -> Self {
        Self { policy, shutdown }
    }

    /// Await `fut` once, giving up with [`EngineError::Cancelled`] on
    /// shutdown. For calls that are not retried, such as price fetches.
    pub async fn cancellable<T, E, Fut>(&self, fut: Fut) -> Result<T, EngineError>
    where
        Fut: Future<Output = Result<T, E>>,
        EngineError: From<E>,
    {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => Err(EngineError::Cancelled),
            r = fut => r.map_err(EngineError::from),
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget runs out.
    ///
    /// Errors map to [`EngineError::Validation`] for non-retryable failures,
    /// [`EngineError::Network`] carrying the last failure once the budget is
    /// spent, and [`EngineError::Cancelled`] on shutdown.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, EngineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0u32;
        loop {
            if self.shutdown.is_shutdown() {
                return Err(EngineError::Cancelled);
            }
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(EngineError::Cancelled),
                r = op() => r,
            };

            let error = match result {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(op = label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                tracing::warn!(op = label, attempt, error = %error, "non-retryable failure");
                return Err(EngineError::Validation(error));
            }
            if attempt >= max_attempts {
                tracing::warn!(op = label, attempts = attempt, error = %error, "retries exhausted");
                return Err(EngineError::Network(error));
            }

            let delay = self.policy.delay_after(attempt);
            tracing::debug!(
                op = label,
                attempt,
                error = %error,
                retry_in_ms = delay.as_millis() as u64,
                "retryable failure, backing off"
            );
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(EngineError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ShutdownController;
    use feeder_gateway::PriceSourceError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(350),
            max_attempts,
        }
    }

    #[test]
    fn exponential_backoff() {
        let p = policy(10);
        assert_eq!(p.delay_after(1), Duration::from_millis(100));
        assert_eq!(p.delay_after(2), Duration::from_millis(200));
        assert_eq!(p.delay_after(3), Duration::from_millis(350));
        assert_eq!(p.delay_after(40), Duration::from_millis(350));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_until_success() {
        let retrier = SubmissionRetrier::new(policy(5), ShutdownSignal::never());
        let calls = AtomicU32::new(0);
        let result = retrier
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(GatewayError::Unavailable("down".into()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts_with_last_error() {
        let retrier = SubmissionRetrier::new(policy(3), ShutdownSignal::never());
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retrier
            .run("test", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Timeout(format!("attempt {n}")))
            })
            .await;
        assert_eq!(
            result,
            Err(EngineError::Network(GatewayError::Timeout("attempt 2".into())))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_is_never_retried() {
        let retrier = SubmissionRetrier::new(policy(5), ShutdownSignal::never());
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retrier
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Rejected {
                    code: 4,
                    log: "bad vote".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(EngineError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_backoff() {
        let controller = ShutdownController::new();
        let retrier = SubmissionRetrier::new(
            RetryPolicy {
                base_delay: Duration::from_secs(3600),
                max_delay: Duration::from_secs(3600),
                max_attempts: 5,
            },
            controller.subscribe(),
        );
        let calls = AtomicU32::new(0);
        let run = retrier.run("test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(GatewayError::Unavailable("down".into()))
        });
        let trigger = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            controller.shutdown();
        };
        let (result, ()) = tokio::join!(run, trigger);
        assert_eq!(result, Err(EngineError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_in_flight_call() {
        let controller = ShutdownController::new();
        let retrier = SubmissionRetrier::new(policy(3), controller.subscribe());
        let run = retrier.run("test", || async {
            std::future::pending::<Result<(), GatewayError>>().await
        });
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.shutdown();
        };
        let (result, ()) = tokio::join!(run, trigger);
        assert_eq!(result, Err(EngineError::Cancelled));
    }

    #[tokio::test]
    async fn already_shut_down_makes_no_attempt() {
        let controller = ShutdownController::new();
        controller.shutdown();
        let retrier = SubmissionRetrier::new(policy(3), controller.subscribe());
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retrier
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert_eq!(result, Err(EngineError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_a_single_cancellable_call() {
        let controller = ShutdownController::new();
        let retrier = SubmissionRetrier::new(policy(3), controller.subscribe());
        let call = retrier.cancellable(std::future::pending::<Result<(), PriceSourceError>>());
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            controller.shutdown();
        };
        let (result, ()) = tokio::join!(call, trigger);
        assert_eq!(result, Err(EngineError::Cancelled));
    }

    #[tokio::test]
    async fn cancellable_call_maps_its_error() {
        let retrier = SubmissionRetrier::new(policy(3), ShutdownSignal::never());
        let result: Result<(), _> = retrier
            .cancellable(async { Err(PriceSourceError::Unavailable("down".into())) })
            .await;
        assert_eq!(
            result,
            Err(EngineError::PriceSource(PriceSourceError::Unavailable("down".into())))
        );
    }
}
