use thiserror::Error;

/// Failure of a single call against the chain node.
///
/// `Unavailable` and `Timeout` are transient and worth retrying. `Rejected`
/// means the chain refused the request itself; sending it again unchanged
/// cannot succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("node unavailable: {0}")]
    Unavailable(String),

    #[error("rejected by chain (code {code}): {log}")]
    Rejected { code: u32, log: String },

    #[error("request timed out: {0}")]
    Timeout(String),
}

impl GatewayError {
    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Rejected { .. })
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Rejected { .. } => "rejected",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Classify a transport-level `reqwest` failure.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() {
            Self::Unavailable(format!("connection failed: {e}"))
        } else if e.is_decode() {
            Self::Unavailable(format!("invalid response body: {e}"))
        } else {
            Self::Unavailable(e.to_string())
        }
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            Self::Unavailable(format!("HTTP status {status}: {body}"))
        } else if status == reqwest::StatusCode::REQUEST_TIMEOUT {
            Self::Timeout(format!("HTTP status {status}"))
        } else {
            Self::Rejected {
                code: u32::from(status.as_u16()),
                log: body,
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignerError {
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signer refused message: {0}")]
    Refused(String),
}

impl From<SignerError> for GatewayError {
    fn from(e: SignerError) -> Self {
        match e {
            SignerError::Unavailable(msg) => Self::Unavailable(format!("signer: {msg}")),
            SignerError::Refused(msg) => Self::Rejected { code: 0, log: format!("signer: {msg}") },
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PriceSourceError {
    #[error("price source unavailable: {0}")]
    Unavailable(String),

    #[error("invalid price data: {0}")]
    InvalidData(String),
}
