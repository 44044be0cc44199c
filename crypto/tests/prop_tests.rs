use proptest::prelude::*;

use feeder_crypto::{commitment_hash, verify_commitment};
use feeder_types::{AssetPair, ExchangeRate, RateSet, Salt, ValidatorAddress};

fn rate_set() -> impl Strategy<Value = RateSet> {
    prop::collection::btree_map("[a-z]{1,5}:[a-z]{1,5}", 0u128..1_000_000_000_000_000_000_000, 0..6)
        .prop_map(|m| {
            m.into_iter()
                .map(|(p, r)| (AssetPair::new(p).unwrap(), ExchangeRate::from_atto(r)))
                .collect()
        })
}

fn validator() -> ValidatorAddress {
    ValidatorAddress::new("nibivaloper1prop").unwrap()
}

proptest! {
    /// Identical (rates, salt, voter) always yields the identical hash.
    #[test]
    fn commitment_is_deterministic(rates in rate_set(), salt in 0u16..Salt::SPACE) {
        let salt = Salt::from_number(salt).unwrap();
        prop_assert_eq!(
            commitment_hash(&salt, &rates, &validator()),
            commitment_hash(&salt, &rates, &validator())
        );
    }

    /// Distinct salts yield distinct hashes over the same rates.
    #[test]
    fn distinct_salts_give_distinct_hashes(
        rates in rate_set(),
        a in 0u16..Salt::SPACE,
        b in 0u16..Salt::SPACE,
    ) {
        prop_assume!(a != b);
        let a = Salt::from_number(a).unwrap();
        let b = Salt::from_number(b).unwrap();
        prop_assert_ne!(
            commitment_hash(&a, &rates, &validator()),
            commitment_hash(&b, &rates, &validator())
        );
    }

    /// A reveal of the committed contents always verifies.
    #[test]
    fn honest_reveal_verifies(rates in rate_set(), salt in 0u16..Salt::SPACE) {
        let salt = Salt::from_number(salt).unwrap();
        let hash = commitment_hash(&salt, &rates, &validator());
        prop_assert!(verify_commitment(&hash, &salt, &rates, &validator()));
    }
}
