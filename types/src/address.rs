//! Bech32 account addresses used by the oracle messages.
//!
//! The feeder does not decode bech32; addresses are carried as opaque strings
//! and only checked for characters that would break the commitment encoding.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

fn check(raw: &str) -> Result<(), TypesError> {
    if raw.is_empty() {
        return Err(TypesError::InvalidAddress("empty address".into()));
    }
    if raw.contains(|c: char| c == ':' || c.is_whitespace()) {
        return Err(TypesError::InvalidAddress(raw.to_string()));
    }
    Ok(())
}

/// Operator address of the validator the feeder votes for.
///
/// This is the voter identity bound into every commitment hash.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValidatorAddress(String);

impl ValidatorAddress {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        check(&s)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Account that signs and pays for the oracle transactions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeederAddress(String);

impl FeederAddress {
    pub fn new(raw: impl Into<String>) -> Result<Self, TypesError> {
        let s = raw.into();
        check(&s)?;
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_conversions {
    ($ty:ident) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = TypesError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(addr: $ty) -> Self {
                addr.0
            }
        }
    };
}

string_conversions!(ValidatorAddress);
string_conversions!(FeederAddress);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bech32_strings() {
        let val = ValidatorAddress::new("nibivaloper1test").unwrap();
        assert_eq!(val.to_string(), "nibivaloper1test");
        assert!(FeederAddress::new("nibi1feeder").is_ok());
    }

    #[test]
    fn rejects_separator_and_whitespace() {
        assert!(ValidatorAddress::new("").is_err());
        assert!(ValidatorAddress::new("a:b").is_err());
        assert!(FeederAddress::new("nibi 1").is_err());
    }
}
