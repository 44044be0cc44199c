//! Fixed-point exchange rates and the canonical rate set a prevote commits to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::{AssetPair, Price, TypesError};

/// Number of fractional digits carried by the chain's decimal type.
pub const RATE_PRECISION: u32 = 18;

const RATE_SCALE: u128 = 10u128.pow(RATE_PRECISION);

/// A non-negative decimal with 18 fractional digits.
///
/// Zero is the abstain value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExchangeRate(u128);

impl ExchangeRate {
    pub const ZERO: Self = Self(0);

    /// Build from raw units of 10^-18.
    pub fn from_atto(atto: u128) -> Self {
        Self(atto)
    }

    pub fn atto(&self) -> u128 {
        self.0
    }

    pub fn is_abstain(&self) -> bool {
        self.0 == 0
    }

    /// Convert a float through its shortest round-trip decimal form,
    /// truncating past 18 fractional digits.
    pub fn from_f64(value: f64) -> Result<Self, TypesError> {
        if !value.is_finite() || value < 0.0 {
            return Err(TypesError::InvalidRate(value.to_string()));
        }
        if value == 0.0 {
            return Ok(Self::ZERO);
        }
        // f64's Display never uses exponent notation.
        value.to_string().parse()
    }
}

impl FromStr for ExchangeRate {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TypesError::InvalidRate(s.to_string());
        let (int_part, frac_part) = s.split_once('.').unwrap_or((s, ""));
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let int: u128 = int_part.parse().map_err(|_| invalid())?;
        let mut frac: u128 = 0;
        for (i, digit) in frac_part.bytes().take(RATE_PRECISION as usize).enumerate() {
            frac += u128::from(digit - b'0') * 10u128.pow(RATE_PRECISION - 1 - i as u32);
        }

        int.checked_mul(RATE_SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:018}",
            self.0 / RATE_SCALE,
            self.0 % RATE_SCALE
        )
    }
}

/// The ordered set of pair rates carried by one prevote/vote pair.
///
/// Iteration follows [`AssetPair`] order, which makes [`RateSet::canonical_string`]
/// independent of the order prices arrived in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateSet(BTreeMap<AssetPair, ExchangeRate>);

impl RateSet {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build the rates to submit for `targets` from the supplied prices.
    ///
    /// Every target gets an entry: the first usable price for it, otherwise
    /// an abstain. Prices for pairs outside the targets are ignored.
    pub fn from_targets(targets: &[AssetPair], prices: &[Price]) -> Self {
        let mut rates = BTreeMap::new();
        for target in targets {
            let rate = prices
                .iter()
                .filter(|p| &p.pair == target && p.is_usable())
                .find_map(|p| ExchangeRate::from_f64(p.value).ok())
                .unwrap_or(ExchangeRate::ZERO);
            rates.insert(target.clone(), rate);
        }
        Self(rates)
    }

    pub fn insert(&mut self, pair: AssetPair, rate: ExchangeRate) -> Option<ExchangeRate> {
        self.0.insert(pair, rate)
    }

    pub fn get(&self, pair: &AssetPair) -> Option<ExchangeRate> {
        self.0.get(pair).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of pairs carrying a real (non-abstain) rate.
    pub fn voted_count(&self) -> usize {
        self.0.values().filter(|r| !r.is_abstain()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetPair, &ExchangeRate)> {
        self.0.iter()
    }

    /// `(pair,rate)` tuples joined by `|`, in pair order.
    ///
    /// This exact byte string is hashed into the commitment and revealed in
    /// the vote, so the chain can recompute the hash.
    pub fn canonical_string(&self) -> String {
        self.0
            .iter()
            .map(|(pair, rate)| format!("({pair},{rate})"))
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl FromIterator<(AssetPair, ExchangeRate)> for RateSet {
    fn from_iter<I: IntoIterator<Item = (AssetPair, ExchangeRate)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
