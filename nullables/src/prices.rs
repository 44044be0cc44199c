//! Nullable price source: fixed prices.

use async_trait::async_trait;
use feeder_gateway::{PriceSource, PriceSourceError};
use feeder_types::{AssetPair, Price};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Returns a fixed set of prices for every request.
///
/// Prices are returned as configured, regardless of the pairs requested, so
/// tests can feed the vote cycle prices for pairs that are not targets.
pub struct StaticPriceSource {
    prices: Mutex<Vec<Price>>,
    failures: Mutex<VecDeque<PriceSourceError>>,
    requests: Mutex<Vec<Vec<AssetPair>>>,
    delay: Mutex<Duration>,
}

impl StaticPriceSource {
    pub fn new(prices: Vec<Price>) -> Self {
        Self {
            prices: Mutex::new(prices),
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Valid prices from `(pair, value)` tuples.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(pair, value)| Price::new(AssetPair::new(*pair).unwrap(), *value, "static"))
                .collect(),
        )
    }

    pub fn set_prices(&self, prices: Vec<Price>) {
        *self.prices.lock().unwrap() = prices;
    }

    pub fn fail_next(&self, error: PriceSourceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Hold every response for `delay`, like a hung upstream.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    /// Pair lists of every request made so far.
    pub fn requests(&self) -> Vec<Vec<AssetPair>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_prices(&self, pairs: &[AssetPair]) -> Result<Vec<Price>, PriceSourceError> {
        self.requests.lock().unwrap().push(pairs.to_vec());
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(e) = self.failures.lock().unwrap().pop_front() {
            return Err(e);
        }
        Ok(self.prices.lock().unwrap().clone())
    }
}
