//! Performance benchmarks for cache scanning, pruning and the task runner

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::time::Duration;
use thumbcache_core::{CachePolicy, PruneOptions, prune_cache, run_with_concurrency, scan_cache};
use thumbcache_test_utils::CacheFixture;
use tokio::runtime::Runtime;

fn fixture(files: usize) -> CacheFixture {
    CacheFixture::builder()
        .with_files("entry-", files, 4096, Duration::from_secs(48 * 3600))
        .build()
}

fn bench_scan(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("cache_scan");
    group.sample_size(20);

    for files in [100, 1_000, 5_000] {
        let cache = fixture(files);
        group.throughput(Throughput::Elements(files as u64));

        group.bench_with_input(BenchmarkId::from_parameter(files), &cache, |b, cache| {
            b.iter(|| {
                rt.block_on(async {
                    let inventory = scan_cache(black_box(cache.path()), |_| {}).await.unwrap();
                    black_box(inventory.total_bytes)
                })
            });
        });
    }

    group.finish();
}

fn bench_size_prune(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("size_prune");
    group.sample_size(10);

    for files in [100, 1_000] {
        // Evict roughly half of the cache
        let policy = CachePolicy::unlimited().with_max_size_bytes(files as u64 * 4096 / 2);
        group.throughput(Throughput::Elements(files as u64));

        group.bench_function(BenchmarkId::from_parameter(files), |b| {
            b.iter_batched(
                || fixture(files),
                |cache| {
                    rt.block_on(async {
                        let outcome =
                            prune_cache(cache.path(), &policy, PruneOptions::default(), |p| {
                                black_box(p);
                            })
                            .await;
                        black_box(outcome.removed_files)
                    })
                },
                BatchSize::PerIteration,
            );
        });
    }

    group.finish();
}

fn bench_runner_overhead(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("runner_overhead");

    for concurrency in [1, 3, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            &concurrency,
            |b, &concurrency| {
                b.iter(|| {
                    rt.block_on(run_with_concurrency(
                        (0..1_000u32).collect(),
                        concurrency,
                        |item, _| async move { Ok::<_, ()>(black_box(item) * 2) },
                    ))
                    .unwrap()
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_scan, bench_size_prune, bench_runner_overhead);
criterion_main!(benches);
