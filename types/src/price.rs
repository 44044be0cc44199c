//! Price observations handed to the feeder by the upstream price source.

use serde::{Deserialize, Serialize};

use crate::AssetPair;

/// A single price observation for one asset pair.
///
/// Produced upstream and immutable once handed to the vote cycle. Prices
/// flagged invalid are submitted as abstentions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub pair: AssetPair,
    #[serde(rename = "price")]
    pub value: f64,
    #[serde(rename = "source")]
    pub source_name: String,
    pub valid: bool,
}

impl Price {
    /// A valid observation.
    pub fn new(pair: AssetPair, value: f64, source_name: impl Into<String>) -> Self {
        Self {
            pair,
            value,
            source_name: source_name.into(),
            valid: true,
        }
    }

    /// An observation the source could not produce.
    pub fn invalid(pair: AssetPair, source_name: impl Into<String>) -> Self {
        Self {
            pair,
            value: 0.0,
            source_name: source_name.into(),
            valid: false,
        }
    }

    /// Whether this price can be submitted as a rate.
    pub fn is_usable(&self) -> bool {
        self.valid && self.value.is_finite() && self.value > 0.0
    }
}
