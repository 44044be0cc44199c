//! SHA-256 vote commitments.
//!
//! The preimage is `"{salt}:{rates}:{validator}"`, where `rates` is the
//! canonical `(pair,rate)|...` encoding of the rate set. The hash is the first
//! 20 bytes of its SHA-256 digest. The oracle module recomputes exactly this
//! from the revealed vote, so the encoding must not change.

use feeder_types::{CommitmentHash, RateSet, Salt, ValidatorAddress};
use sha2::{Digest, Sha256};

/// Build the exact byte string that gets hashed.
pub fn commitment_preimage(salt: &Salt, rates: &RateSet, validator: &ValidatorAddress) -> String {
    format!(
        "{}:{}:{}",
        salt.as_str(),
        rates.canonical_string(),
        validator.as_str()
    )
}

/// Compute the commitment for a prevote.
pub fn commitment_hash(salt: &Salt, rates: &RateSet, validator: &ValidatorAddress) -> CommitmentHash {
    let digest = Sha256::digest(commitment_preimage(salt, rates, validator).as_bytes());
    let mut output = [0u8; CommitmentHash::LEN];
    output.copy_from_slice(&digest[..CommitmentHash::LEN]);
    CommitmentHash::new(output)
}

/// Check that a reveal matches a previously submitted commitment.
pub fn verify_commitment(
    hash: &CommitmentHash,
    salt: &Salt,
    rates: &RateSet,
    validator: &ValidatorAddress,
) -> bool {
    commitment_hash(salt, rates, validator) == *hash
}
