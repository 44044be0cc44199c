//! Asset pair identifiers (`base:quote`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// An oracle asset pair such as `ubtc:uusd`.
///
/// Pairs order lexicographically by their string form; that order is the
/// canonical order used when committing to a set of rates.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetPair(String);

impl AssetPair {
    /// Separator between base and quote denominations.
    pub const SEPARATOR: char = ':';

    /// Parse and validate a pair string.
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        match s.split_once(Self::SEPARATOR) {
            Some((base, quote))
                if !base.is_empty()
                    && !quote.is_empty()
                    && !quote.contains(Self::SEPARATOR)
                    && !s.contains(['(', ')', ',', '|']) =>
            {
                Ok(Self(s))
            }
            _ => Err(TypesError::InvalidPair(s)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn base(&self) -> &str {
        self.0.split_once(Self::SEPARATOR).map_or("", |(b, _)| b)
    }

    pub fn quote(&self) -> &str {
        self.0.split_once(Self::SEPARATOR).map_or("", |(_, q)| q)
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetPair {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AssetPair {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<AssetPair> for String {
    fn from(pair: AssetPair) -> Self {
        pair.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base_and_quote() {
        let pair: AssetPair = "ubtc:uusd".parse().unwrap();
        assert_eq!(pair.base(), "ubtc");
        assert_eq!(pair.quote(), "uusd");
        assert_eq!(pair.to_string(), "ubtc:uusd");
    }

    #[test]
    fn rejects_malformed_pairs() {
        for raw in ["", "ubtc", ":uusd", "ubtc:", "a:b:c", "(a:b)", "a:b|c"] {
            assert!(AssetPair::new(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn orders_lexicographically() {
        let mut pairs = vec![
            AssetPair::new("ueth:uusd").unwrap(),
            AssetPair::new("ubtc:uusd").unwrap(),
            AssetPair::new("uatom:uusd").unwrap(),
        ];
        pairs.sort();
        let names: Vec<_> = pairs.iter().map(AssetPair::as_str).collect();
        assert_eq!(names, ["uatom:uusd", "ubtc:uusd", "ueth:uusd"]);
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: AssetPair = serde_json::from_str("\"ubtc:uusd\"").unwrap();
        assert_eq!(ok.as_str(), "ubtc:uusd");
        assert!(serde_json::from_str::<AssetPair>("\"nonsense\"").is_err());
    }
}
