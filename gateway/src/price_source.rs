//! Inbound price seam.

use async_trait::async_trait;
use feeder_types::{AssetPair, Price};
use std::time::Duration;

use crate::PriceSourceError;

/// Supplies current prices for a set of asset pairs.
///
/// A source may return fewer prices than requested, or prices flagged
/// invalid; the vote cycle submits an abstain for every such pair.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_prices(&self, pairs: &[AssetPair]) -> Result<Vec<Price>, PriceSourceError>;
}

/// Price source backed by an aggregation service.
///
/// `GET {endpoint}/prices?pairs=ubtc:uusd,ueth:uusd` returning
/// `[{"pair": "...", "price": 1.0, "source": "...", "valid": true}]`.
pub struct HttpPriceSource {
    http_client: reqwest::Client,
    endpoint: String,
}

impl HttpPriceSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PriceSourceError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PriceSourceError::Unavailable(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch_prices(&self, pairs: &[AssetPair]) -> Result<Vec<Price>, PriceSourceError> {
        if pairs.is_empty() {
            return Ok(Vec::new());
        }
        let joined = pairs
            .iter()
            .map(AssetPair::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/prices", self.endpoint);

        let response = self
            .http_client
            .get(&url)
            .query(&[("pairs", joined.as_str())])
            .send()
            .await
            .map_err(|e| PriceSourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PriceSourceError::Unavailable(format!("HTTP status {status}")));
        }

        let prices: Vec<Price> = response
            .json()
            .await
            .map_err(|e| PriceSourceError::InvalidData(e.to_string()))?;
        tracing::debug!(requested = pairs.len(), received = prices.len(), "fetched prices");
        Ok(prices)
    }
}
