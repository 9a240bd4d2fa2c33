//! Basic benchmarks for the `slot_pool` package.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use slot_pool::{LeakTrackingPool, SlotPool};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

const BUFFER_CAPACITY: usize = 256;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("slot_pool");

    group.bench_function("rent_release_hit", |b| {
        let pool = SlotPool::new(|| Vec::<u8>::with_capacity(BUFFER_CAPACITY));
        pool.release(pool.rent());

        b.iter(|| {
            let item = pool.rent();
            pool.release(black_box(item));
        });
    });

    group.bench_function("rent_miss_builds", |b| {
        let pool = SlotPool::new(|| Vec::<u8>::with_capacity(BUFFER_CAPACITY));

        b.iter(|| {
            drop(black_box(pool.rent()));
        });
    });

    group.bench_function("rent_scoped_hit", |b| {
        let pool = SlotPool::new(|| Vec::<u8>::with_capacity(BUFFER_CAPACITY));
        pool.release(pool.rent());

        b.iter(|| {
            drop(black_box(pool.rent_scoped()));
        });
    });

    group.finish();

    let mut tracked_group = c.benchmark_group("slot_pool_tracked");

    tracked_group.bench_function("rent_release_hit", |b| {
        let pool = LeakTrackingPool::wrap(SlotPool::new(|| Vec::<u8>::with_capacity(
            BUFFER_CAPACITY,
        )));
        pool.release(pool.rent());

        b.iter(|| {
            let item = pool.rent();
            pool.release(black_box(item));
        });
    });

    tracked_group.finish();
}
