//! Nullable salt generator: deterministic salts.

use feeder_crypto::SaltGenerator;
use feeder_types::Salt;
use std::sync::Mutex;

/// A deterministic salt generator for testing.
///
/// Returns pre-configured salts in order, wrapping around at the end.
pub struct NullSalt {
    salts: Vec<Salt>,
    index: Mutex<usize>,
}

impl NullSalt {
    /// Create with a sequence of salts. Panics on an invalid salt.
    pub fn new(salts: &[&str]) -> Self {
        assert!(!salts.is_empty(), "NullSalt needs at least one salt");
        Self {
            salts: salts.iter().map(|s| Salt::new(*s).unwrap()).collect(),
            index: Mutex::new(0),
        }
    }

    /// Create with a single salt returned for every call.
    pub fn constant(salt: &str) -> Self {
        Self::new(&[salt])
    }

    /// Number of salts drawn so far.
    pub fn drawn(&self) -> usize {
        *self.index.lock().unwrap()
    }
}

impl SaltGenerator for NullSalt {
    fn next_salt(&self) -> Salt {
        let mut idx = self.index.lock().unwrap();
        let salt = self.salts[*idx % self.salts.len()].clone();
        *idx += 1;
        salt
    }
}
