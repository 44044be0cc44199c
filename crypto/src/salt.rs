//! Salt generation for prevote commitments.

use feeder_types::Salt;
use rand::rngs::OsRng;
use rand::Rng;

/// Trait for drawing commitment salts.
///
/// Production code uses [`OsSaltGenerator`]; tests swap in a deterministic
/// generator so commitments can be asserted on.
pub trait SaltGenerator: Send + Sync {
    /// Draw a fresh salt.
    fn next_salt(&self) -> Salt;
}

/// Draws salts uniformly from the OS random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSaltGenerator;

impl SaltGenerator for OsSaltGenerator {
    fn next_salt(&self) -> Salt {
        generate_salt()
    }
}

/// Draw a salt uniformly from `0..Salt::SPACE`.
pub fn generate_salt() -> Salt {
    let n = OsRng.gen_range(0..Salt::SPACE);
    Salt::from_number(n).expect("gen_range stays below Salt::SPACE")
}
