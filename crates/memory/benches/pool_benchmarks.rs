//! Pool benchmarks
//!
//! Bump allocation throughput, temporary-scope rollback and cascading teardown

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use mem_pool::{Pool, PoolConfig};
use std::hint::black_box;

/// Benchmark bump allocation of many small blocks
fn bench_bump_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("bump_allocation");

    for size in [16usize, 64, 256, 1024] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::new("allocate", size), &size, |b, &size| {
            b.iter_batched(
                Pool::new,
                |mut pool| {
                    for _ in 0..1000 {
                        black_box(pool.allocate(size, false));
                    }
                    pool
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.bench_function("allocate_zeroed_64b", |b| {
        b.iter_batched(
            Pool::new,
            |mut pool| {
                for _ in 0..1000 {
                    black_box(pool.allocate(64, true));
                }
                pool
            },
            BatchSize::SmallInput,
        );
    });

    // Baseline
    group.bench_function("system_vec_64b", |b| {
        b.iter(|| {
            for _ in 0..1000 {
                black_box(vec![0u8; 64]);
            }
        });
    });

    group.finish();
}

/// Benchmark temporary scopes that allocate and roll back
fn bench_temporary_rollback(c: &mut Criterion) {
    let mut group = c.benchmark_group("temporary_rollback");

    for allocations in [10usize, 100, 1000] {
        group.throughput(Throughput::Elements(allocations as u64));
        group.bench_with_input(
            BenchmarkId::new("scope", allocations),
            &allocations,
            |b, &allocations| {
                let mut pool = Pool::with_config(PoolConfig::production()).unwrap();
                pool.allocate(128, false);

                b.iter(|| {
                    let marker = pool.begin_temporary();
                    for _ in 0..allocations {
                        black_box(pool.allocate(48, false));
                    }
                    pool.end_temporary(marker).unwrap();
                });
            },
        );
    }

    group.bench_function("scope_with_destructors", |b| {
        let mut pool = Pool::with_config(PoolConfig::production()).unwrap();

        b.iter(|| {
            let mut scope = pool.temporary();
            for _ in 0..100 {
                scope.allocate_with_destructor(32, false, |bytes| {
                    black_box(bytes.len());
                });
            }
        });
    });

    group.finish();
}

/// Benchmark teardown of pool trees
fn bench_hierarchy_teardown(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy_teardown");

    for children in [4usize, 16, 64] {
        group.bench_with_input(
            BenchmarkId::new("flat", children),
            &children,
            |b, &children| {
                b.iter_batched(
                    || {
                        let mut root = Pool::new();
                        for _ in 0..children {
                            let child = root.new_child();
                            if let Some(pool) = root.child_mut(child) {
                                pool.allocate_with_destructor(64, false, |_| {});
                            }
                        }
                        root
                    },
                    |root| black_box(root.destroy()),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    group.bench_function("chain_32", |b| {
        b.iter_batched(
            || {
                let mut current = Pool::new();
                for _ in 0..32 {
                    let mut parent = Pool::new();
                    current.allocate_with_destructor(64, false, |_| {});
                    parent.add_child(current);
                    current = parent;
                }
                current
            },
            |root| black_box(root.destroy()),
            BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_bump_allocation,
    bench_temporary_rollback,
    bench_hierarchy_teardown
);
criterion_main!(benches);
