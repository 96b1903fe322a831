//! Criterion benchmarks for the PrimeRust search pipeline.
//!
//! Run with: `cargo bench`
//! View HTML reports in: `target/criterion/report/index.html`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use primerust_core::oracle::{bpsw, miller_rabin};
use primerust_core::search::CandidateRange;
use primerust_core::{find_probable_prime, SieveFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Candidate sampling cost at various sizes.
fn candidate_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_sampling");
    for digits in [10u32, 100, 1_000, 10_000] {
        let range = CandidateRange::new(digits);
        let mut rng = StdRng::seed_from_u64(42);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(digits), &digits, |b, _| {
            b.iter(|| range.sample(black_box(&mut rng)))
        });
    }
    group.finish();
}

/// Sieve filter cost on random odd candidates.
fn sieve_filter(c: &mut Criterion) {
    let sieve = SieveFilter::shared();
    let mut group = c.benchmark_group("sieve_filter");
    for digits in [50u32, 300, 1_000, 5_000] {
        let range = CandidateRange::new(digits);
        let mut rng = StdRng::seed_from_u64(7);
        let candidates: Vec<_> = (0..64).map(|_| range.sample(&mut rng)).collect();
        group.throughput(Throughput::Elements(candidates.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(digits), &candidates, |b, cs| {
            b.iter(|| cs.iter().filter(|n| sieve.passes(black_box(n))).count())
        });
    }
    group.finish();
}

/// Library test vs Miller-Rabin on known primes (the worst case for both).
fn oracle_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("oracle_comparison");
    group.sample_size(10);
    for digits in [50u32, 150, 300] {
        let prime = match find_probable_prime(digits) {
            Ok(metrics) => metrics.prime_value,
            Err(e) => panic!("no {digits}-digit prime for benchmark: {e}"),
        };
        let mut rng = StdRng::seed_from_u64(1);

        group.bench_with_input(BenchmarkId::new("bpsw", digits), &prime, |b, p| {
            b.iter(|| bpsw::is_probable_prime(black_box(p)))
        });
        group.bench_with_input(BenchmarkId::new("miller_rabin_24", digits), &prime, |b, p| {
            b.iter(|| miller_rabin::is_probable_prime(black_box(p), 24, &mut rng))
        });
    }
    group.finish();
}

/// End-to-end search latency.
fn full_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_search");
    group.sample_size(10);
    for digits in [20u32, 100, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(digits), &digits, |b, &d| {
            b.iter(|| find_probable_prime(black_box(d)))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    candidate_sampling,
    sieve_filter,
    oracle_comparison,
    full_search
);
criterion_main!(benches);
