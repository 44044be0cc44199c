use criterion::{black_box, criterion_group, criterion_main, Criterion};

use feeder_types::{AssetPair, ExchangeRate, RateSet, Salt, ValidatorAddress};

fn rates(n: usize) -> RateSet {
    (0..n)
        .map(|i| {
            (
                AssetPair::new(format!("u{i}:uusd")).unwrap(),
                ExchangeRate::from_f64(i as f64 * 1.25 + 1.0).unwrap(),
            )
        })
        .collect()
}

fn commitment_hash_bench(c: &mut Criterion) {
    let salt = Salt::new("1234").unwrap();
    let validator = ValidatorAddress::new("nibivaloper1bench").unwrap();
    let small = rates(3);
    let large = rates(64);

    c.bench_function("commitment_hash_3_pairs", |b| {
        b.iter(|| feeder_crypto::commitment_hash(black_box(&salt), &small, &validator))
    });
    c.bench_function("commitment_hash_64_pairs", |b| {
        b.iter(|| feeder_crypto::commitment_hash(black_box(&salt), &large, &validator))
    });
}

fn generate_salt_bench(c: &mut Criterion) {
    c.bench_function("generate_salt", |b| b.iter(feeder_crypto::generate_salt));
}

criterion_group!(benches, commitment_hash_bench, generate_salt_bench);
criterion_main!(benches);
