//! Benchmarks for digests and policy signing
//!
//! Run with: cargo bench --package upform-core --bench signing

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use upform_core::{ContentDigest, KeySignature, Policy};

/// Generate test data of specified size
fn generate_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

/// Benchmark MD5 digests at block-relevant sizes
fn bench_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("md5_digest");

    for size in [
        64 * 1024,         // 64 KB
        1024 * 1024,       // 1 MB (one block)
        10 * 1024 * 1024,  // 10 MB
    ] {
        let data = generate_data(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(
            BenchmarkId::new("compute", format_size(size)),
            &data,
            |b, data| b.iter(|| ContentDigest::compute(black_box(data))),
        );
    }

    group.finish();
}

/// Benchmark both signature variants on realistic policies
fn bench_signing(c: &mut Criterion) {
    let signer = KeySignature::new("bench-secret").unwrap();
    let block = Policy::block("9d1c0ab2e6", 1700000300, 42, "d41d8cd98f00b204e9800998ecf8427e");
    let shot = Policy::single_shot("demo", "/photos/2024/cat.jpg", 1700000300);

    c.bench_function("sign_blocks", |b| {
        b.iter(|| signer.sign_blocks(black_box(&block)))
    });
    c.bench_function("sign_file", |b| {
        b.iter(|| signer.sign_file(black_box(&shot)))
    });
}

fn format_size(size: usize) -> String {
    if size >= 1024 * 1024 {
        format!("{}MB", size / (1024 * 1024))
    } else {
        format!("{}KB", size / 1024)
    }
}

criterion_group!(benches, bench_digest, bench_signing);
criterion_main!(benches);
