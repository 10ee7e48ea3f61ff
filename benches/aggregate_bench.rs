//! Benchmarks for the counter aggregation engine
//!
//! Run with: cargo bench

use cimetry::metrics::{aggregate, Reduction, TimeRange};
use cimetry::store::MemoryStore;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

/// A counter with `count` contiguous 100-second buckets
fn counter_store(count: usize) -> MemoryStore {
    let mut store = MemoryStore::with_bucket_secs(100);
    for i in 0..count {
        store.record_count("total-jobs", i as i64 * 100, (i % 7) as f64);
    }
    store
}

fn bench_aggregate(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("aggregate");

    for size in [1_000, 10_000, 100_000] {
        let store = counter_store(size);
        let range = TimeRange::between(0, size as i64 * 100);

        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("unmerged_{}", size), |b| {
            b.iter(|| {
                runtime
                    .block_on(aggregate(
                        black_box(&store),
                        "total-jobs",
                        range,
                        None,
                        Reduction::Sum,
                    ))
                    .unwrap()
            })
        });

        group.bench_function(format!("downsample_100_{}", size), |b| {
            b.iter(|| {
                runtime
                    .block_on(aggregate(
                        black_box(&store),
                        "total-jobs",
                        range,
                        Some(100),
                        Reduction::Avg,
                    ))
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_aggregate);
criterion_main!(benches);
