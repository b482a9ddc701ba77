//! Entry codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use driftkv_bench::utils::generate_pairs;
use driftkv_core::Entry;

fn bench_encode(c: &mut Criterion) {
    let pairs = generate_pairs(1000, 16, 128);
    let entries: Vec<Entry> = pairs
        .iter()
        .map(|(k, v)| Entry::new(k.clone(), v.clone()).unwrap())
        .collect();

    let total_bytes: u64 = entries.iter().map(|e| e.encoded_len() as u64).sum();

    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Bytes(total_bytes));
    group.bench_function("encode_1000", |b| {
        b.iter(|| {
            for entry in &entries {
                black_box(entry.encode());
            }
        });
    });

    let frames: Vec<Vec<u8>> = entries.iter().map(Entry::encode).collect();
    group.bench_function("decode_1000", |b| {
        b.iter(|| {
            for frame in &frames {
                black_box(Entry::decode(frame).unwrap());
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
