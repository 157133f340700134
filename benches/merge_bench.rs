//! Merge Path Benchmarks - Classification, Encoding and Batching
//!
//! Run with: cargo bench --bench merge_bench

use std::hint::black_box;

use alloy::primitives::{Address, B256, U256};
use criterion::{criterion_group, criterion_main, Criterion};

use polymarket_merge_bot::domain::batch::BatchBuilder;
use polymarket_merge_bot::domain::market::{classify, Balances, MarketDescriptor, MergeCandidate};
use polymarket_merge_bot::domain::merge::MergeTarget;
use polymarket_merge_bot::domain::throttle::classify_error;

fn target() -> MergeTarget {
    MergeTarget {
        ctf: Address::repeat_byte(0xc7),
        collateral: Address::repeat_byte(0xcc),
    }
}

fn candidates(n: u64) -> Vec<MergeCandidate> {
    (0..n)
        .map(|i| MergeCandidate {
            market: MarketDescriptor {
                condition_id: B256::left_padding_from(&(i + 1).to_be_bytes()),
                yes_token_id: U256::from(2 * i),
                no_token_id: U256::from(2 * i + 1),
                slug: Some(format!("btc-up-or-down-{i}")),
                question: None,
            },
            amount: U256::from(5_000_000u64),
        })
        .collect()
}

fn bench_classify(c: &mut Criterion) {
    let balances = Balances::new(U256::from(7_500_000u64), U256::from(3_200_000u64));
    let minimum = U256::from(1_000_000u64);

    c.bench_function("classify_balances", |b| {
        b.iter(|| classify(black_box(balances), black_box(minimum)));
    });
}

fn bench_encode_merge(c: &mut Criterion) {
    let target = target();
    let candidate = candidates(1).remove(0);

    c.bench_function("encode_merge_positions", |b| {
        b.iter(|| target.encode(black_box(&candidate)));
    });
}

/// Batch 500 candidates, roughly a busy asset's daily market count.
fn bench_build_batches(c: &mut Criterion) {
    let builder = BatchBuilder::new(target(), 10);
    let candidates = candidates(500);

    c.bench_function("build_batches_500", |b| {
        b.iter(|| builder.build(black_box("btc"), black_box(&candidates)));
    });
}

fn bench_classify_error(c: &mut Criterion) {
    let message = "rate limit exceeded: 0 units remaining, resets in 1800 seconds";

    c.bench_function("classify_relay_error", |b| {
        b.iter(|| classify_error(black_box(Some(429)), black_box(message)));
    });
}

criterion_group!(
    benches,
    bench_classify,
    bench_encode_merge,
    bench_build_batches,
    bench_classify_error
);
criterion_main!(benches);
