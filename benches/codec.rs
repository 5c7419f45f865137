//! Codec benchmark suite.
//!
//! Benchmarks compression and bounded decompression at different sizes:
//! - Payload sizes: 1 KiB, 64 KiB, and the reference payload length
//! - Inputs: repetitive text and pseudo-random text
//!
//! Run with: cargo bench --bench codec
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use wsrelay::Codec;
use wsrelay::codec::{DEFAULT_MAX_CAPACITY, REFERENCE_PAYLOAD_LEN};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const PAYLOAD_SIZES: &[usize] = &[1024, 64 * 1024, REFERENCE_PAYLOAD_LEN];

// ============================================================================
// Benchmark: Compress
// ============================================================================

fn bench_compress(c: &mut Criterion) {
    let codec = Codec::init().unwrap();

    let mut group = c.benchmark_group("compress");

    for &size in PAYLOAD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));

        let repetitive = repetitive_text(size);
        group.bench_with_input(BenchmarkId::new("repetitive", size), &repetitive, |b, input| {
            b.iter(|| codec.compress(black_box(input)).unwrap());
        });

        let random = random_text(size, 42);
        group.bench_with_input(BenchmarkId::new("random", size), &random, |b, input| {
            b.iter(|| codec.compress(black_box(input)).unwrap());
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Decompress
// ============================================================================

fn bench_decompress(c: &mut Criterion) {
    let codec = Codec::init().unwrap();

    let mut group = c.benchmark_group("decompress");

    for &size in PAYLOAD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));

        let packed = codec.compress(&random_text(size, 7)).unwrap();
        group.bench_with_input(BenchmarkId::new("random", size), &packed, |b, input| {
            b.iter(|| {
                codec
                    .decompress(black_box(input), DEFAULT_MAX_CAPACITY)
                    .unwrap()
            });
        });
    }

    group.finish();
}

// ============================================================================
// Inputs
// ============================================================================

fn repetitive_text(len: usize) -> Vec<u8> {
    b"the quick brown fox jumps over the lazy dog. "
        .iter()
        .copied()
        .cycle()
        .take(len)
        .collect()
}

fn random_text(len: usize, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
    (0..len)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(i as u64);
            b'a' + ((state >> 33) % 26) as u8
        })
        .collect()
}

// ============================================================================
// Criterion Setup
// ============================================================================

criterion_group!(benches, bench_compress, bench_decompress);
criterion_main!(benches);
