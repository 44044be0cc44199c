//! Transaction signing seam.
//!
//! Key management lives outside the feeder. [`TxSigner`] takes an unsigned
//! oracle message and returns tx bytes ready for broadcast; [`RemoteSigner`]
//! delegates that to a signing service over HTTP.

use async_trait::async_trait;
use feeder_types::{PrevoteMsg, VoteMsg};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::SignerError;

/// The two oracle messages the feeder ever signs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum OracleMsg {
    #[serde(rename = "oracle/MsgAggregateExchangeRatePrevote")]
    Prevote(PrevoteMsg),
    #[serde(rename = "oracle/MsgAggregateExchangeRateVote")]
    Vote(VoteMsg),
}

impl OracleMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Prevote(_) => "prevote",
            Self::Vote(_) => "vote",
        }
    }
}

/// Signed transaction, base64-encoded as the broadcast endpoint expects.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SignedTx {
    pub tx_bytes: String,
}

/// Produces signed transactions for oracle messages.
#[async_trait]
pub trait TxSigner: Send + Sync {
    async fn sign(&self, msg: &OracleMsg) -> Result<SignedTx, SignerError>;
}

#[derive(Serialize)]
struct SignRequest<'a> {
    chain_id: &'a str,
    msgs: [&'a OracleMsg; 1],
}

/// Signer backed by an external signing service.
///
/// Sends `POST {endpoint}/sign` with `{"chain_id", "msgs"}` and expects
/// `{"tx_bytes": "<base64>"}` back.
pub struct RemoteSigner {
    http_client: reqwest::Client,
    endpoint: String,
    chain_id: String,
}

impl RemoteSigner {
    pub fn new(
        endpoint: impl Into<String>,
        chain_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, SignerError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SignerError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            chain_id: chain_id.into(),
        })
    }
}

#[async_trait]
impl TxSigner for RemoteSigner {
    async fn sign(&self, msg: &OracleMsg) -> Result<SignedTx, SignerError> {
        let url = format!("{}/sign", self.endpoint);
        let request = SignRequest {
            chain_id: &self.chain_id,
            msgs: [msg],
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| SignerError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SignerError::Unavailable(format!("HTTP status {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignerError::Refused(format!("HTTP status {status}: {body}")));
        }

        response
            .json::<SignedTx>()
            .await
            .map_err(|e| SignerError::Unavailable(format!("invalid signer response: {e}")))
    }
}
