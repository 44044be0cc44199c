//! [`ChainGateway`] over a Cosmos SDK LCD (REST) endpoint.
//!
//! Queries:
//! - `GET {lcd}{module}/vote_targets`
//! - `GET {lcd}{module}/params`
//! - `GET {lcd}/cosmos/base/tendermint/v1beta1/blocks/latest`
//!
//! Broadcasts sign the message through a [`TxSigner`] and post the tx bytes
//! to `POST {lcd}/cosmos/tx/v1beta1/txs` in sync mode. A non-zero `code` in
//! the tx response is a chain-level rejection.

use async_trait::async_trait;
use feeder_types::{AssetPair, OracleParams, PrevoteMsg, VoteMsg};
use feeder_utils::tracing_spans::query_span;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::Instrument;

use crate::signer::{OracleMsg, TxSigner};
use crate::{ChainGateway, GatewayError, TxResult};

/// Default oracle module REST prefix.
pub const DEFAULT_ORACLE_MODULE_PATH: &str = "/nibiru/oracle/v1";

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const BROADCAST_PATH: &str = "/cosmos/tx/v1beta1/txs";
const LATEST_BLOCK_PATH: &str = "/cosmos/base/tendermint/v1beta1/blocks/latest";

/// Connection settings for [`HttpGateway`].
#[derive(Clone, Debug)]
pub struct HttpGatewayConfig {
    /// Base URL of the LCD endpoint, e.g. `http://localhost:1317`.
    pub lcd_endpoint: String,
    /// REST prefix of the oracle module's query service.
    pub oracle_module_path: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl HttpGatewayConfig {
    pub fn new(lcd_endpoint: impl Into<String>) -> Self {
        Self {
            lcd_endpoint: lcd_endpoint.into(),
            oracle_module_path: DEFAULT_ORACLE_MODULE_PATH.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// REST-backed chain gateway.
pub struct HttpGateway {
    /// `None` once [`ChainGateway::close`] ran.
    http_client: Mutex<Option<reqwest::Client>>,
    base_url: String,
    module_url: String,
    signer: Arc<dyn TxSigner>,
}

// ── Response shapes ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct VoteTargetsResponse {
    #[serde(default)]
    vote_targets: Vec<AssetPair>,
}

#[derive(Deserialize)]
struct ParamsResponse {
    params: RawParams,
}

/// Cosmos JSON encodes 64-bit integers as strings.
#[derive(Deserialize)]
struct RawParams {
    #[serde(deserialize_with = "u64_from_string_or_number")]
    vote_period: u64,
    #[serde(default)]
    vote_threshold: Option<String>,
    #[serde(default)]
    reward_band: Option<String>,
    #[serde(default, deserialize_with = "opt_u64_from_string_or_number")]
    slash_window: Option<u64>,
}

#[derive(Deserialize)]
struct LatestBlockResponse {
    block: BlockBody,
}

#[derive(Deserialize)]
struct BlockBody {
    header: BlockHeader,
}

#[derive(Deserialize)]
struct BlockHeader {
    #[serde(deserialize_with = "u64_from_string_or_number")]
    height: u64,
}

#[derive(Serialize)]
struct BroadcastRequest<'a> {
    tx_bytes: &'a str,
    mode: &'static str,
}

#[derive(Deserialize)]
struct BroadcastResponse {
    tx_response: TxResponse,
}

#[derive(Deserialize)]
struct TxResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    txhash: String,
    #[serde(default)]
    raw_log: String,
    #[serde(default, deserialize_with = "opt_u64_from_string_or_number")]
    height: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(u64),
}

fn u64_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
    match StringOrNumber::deserialize(d)? {
        StringOrNumber::Num(n) => Ok(n),
        StringOrNumber::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

fn opt_u64_from_string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    match Option::<StringOrNumber>::deserialize(d)? {
        None => Ok(None),
        Some(StringOrNumber::Num(n)) => Ok(Some(n)),
        Some(StringOrNumber::Str(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ── Impl ────────────────────────────────────────────────────────────────

impl HttpGateway {
    /// Fails only if the HTTP client cannot be built (e.g. no TLS backend).
    pub fn new(config: HttpGatewayConfig, signer: Arc<dyn TxSigner>) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        let base_url = config.lcd_endpoint.trim_end_matches('/').to_string();
        let module_url = format!(
            "{}/{}",
            base_url,
            config.oracle_module_path.trim_matches('/')
        );
        Ok(Self {
            http_client: Mutex::new(Some(http_client)),
            base_url,
            module_url,
            signer,
        })
    }

    fn client(&self) -> Result<reqwest::Client, GatewayError> {
        self.http_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| GatewayError::Unavailable("gateway closed".into()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        let response = self
            .client()?
            .get(url)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        response.json::<T>().await.map_err(GatewayError::from_transport)
    }

    async fn broadcast(&self, msg: OracleMsg) -> Result<TxResult, GatewayError> {
        let signed = self.signer.sign(&msg).await?;
        let url = format!("{}{}", self.base_url, BROADCAST_PATH);
        let request = BroadcastRequest {
            tx_bytes: &signed.tx_bytes,
            mode: "BROADCAST_MODE_SYNC",
        };

        let response = self
            .client()?
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(GatewayError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::from_status(status, body));
        }

        let body: BroadcastResponse = response.json().await.map_err(GatewayError::from_transport)?;
        let tx = body.tx_response;
        if tx.code != 0 {
            tracing::warn!(
                kind = msg.kind(),
                code = tx.code,
                tx_hash = %tx.txhash,
                raw_log = %tx.raw_log,
                "oracle tx rejected by chain"
            );
            return Err(GatewayError::Rejected {
                code: tx.code,
                log: tx.raw_log,
            });
        }

        Ok(TxResult {
            tx_hash: tx.txhash,
            height: tx.height.filter(|h| *h > 0),
        })
    }
}

#[async_trait]
impl ChainGateway for HttpGateway {
    async fn query_vote_targets(&self) -> Result<Vec<AssetPair>, GatewayError> {
        let url = format!("{}/vote_targets", self.module_url);
        let body: VoteTargetsResponse = self
            .get_json(&url)
            .instrument(query_span("vote_targets"))
            .await?;
        let mut targets = body.vote_targets;
        targets.sort();
        targets.dedup();
        Ok(targets)
    }

    async fn query_oracle_params(&self) -> Result<OracleParams, GatewayError> {
        let url = format!("{}/params", self.module_url);
        let body: ParamsResponse = self.get_json(&url).instrument(query_span("params")).await?;
        let raw = body.params;
        Ok(OracleParams {
            vote_period: raw.vote_period,
            vote_threshold: raw.vote_threshold,
            reward_band: raw.reward_band,
            slash_window: raw.slash_window,
        })
    }

    async fn current_height(&self) -> Result<u64, GatewayError> {
        let url = format!("{}{}", self.base_url, LATEST_BLOCK_PATH);
        let body: LatestBlockResponse = self
            .get_json(&url)
            .instrument(query_span("latest_block"))
            .await?;
        Ok(body.block.header.height)
    }

    async fn broadcast_prevote(&self, msg: &PrevoteMsg) -> Result<TxResult, GatewayError> {
        self.broadcast(OracleMsg::Prevote(msg.clone())).await
    }

    async fn broadcast_vote(&self, msg: &VoteMsg) -> Result<TxResult, GatewayError> {
        self.broadcast(OracleMsg::Vote(msg.clone())).await
    }

    async fn close(&self) {
        if self
            .http_client
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            tracing::info!(lcd = %self.base_url, "chain gateway closed");
        }
    }
}
