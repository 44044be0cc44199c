//! The price feeder's vote cycle.
//!
//! [`PeriodClock`] turns block heights into voting-period boundaries,
//! [`VoteCycleEngine`] runs one commit/reveal cycle per period against a
//! [`ChainGateway`](feeder_gateway::ChainGateway), and [`FeederService`]
//! ties both to a height feed until shutdown.

pub mod clock;
pub mod config;
pub mod cycle;
pub mod error;
pub mod event;
pub mod metrics;
pub mod retrier;
pub mod service;
pub mod shutdown;

pub use clock::{ParamsCache, PeriodClock, PeriodSignal};
pub use config::{FeederConfig, RetryConfig};
pub use cycle::{CycleState, VoteCycleEngine, VoterIdentity};
pub use error::EngineError;
pub use event::{CycleEvent, CycleEventBus, CycleReport, FailureClass, SkipReason, SubmissionKind};
pub use metrics::FeederMetrics;
pub use retrier::{RetryPolicy, SubmissionRetrier};
pub use service::FeederService;
pub use shutdown::{ShutdownController, ShutdownSignal};
