use feeder_gateway::{GatewayError, PriceSourceError};
use feeder_types::TypesError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Zero vote period, bad config file. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transient node failure that outlived the retry budget.
    #[error("network error: {0}")]
    Network(GatewayError),

    /// The chain refused the request; sending it again cannot succeed.
    #[error("rejected: {0}")]
    Validation(GatewayError),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("price source error: {0}")]
    PriceSource(#[from] PriceSourceError),

    #[error("cancelled by shutdown")]
    Cancelled,
}

impl From<GatewayError> for EngineError {
    fn from(e: GatewayError) -> Self {
        if e.is_retryable() {
            Self::Network(e)
        } else {
            Self::Validation(e)
        }
    }
}

impl From<TypesError> for EngineError {
    fn from(e: TypesError) -> Self {
        Self::Configuration(e.to_string())
    }
}
