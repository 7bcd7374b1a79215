use core::hint::black_box;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use ferroseq::{MemoryStore, Sequence, SequenceAllocator, SequenceConfig, SequenceStore, ValueRange};
use std::{
    sync::{Arc, Barrier},
    thread::scope,
    time::Instant,
};

// Number of values issued per benchmark iteration (per-thread for
// multi-threaded).
const TOTAL_VALUES: usize = 4096;

const TABLE: &str = "sequence";

fn allocator(step: i64) -> SequenceAllocator<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.ensure_table(TABLE).unwrap();
    let config = SequenceConfig::default()
        .with_table_name(TABLE)
        .unwrap()
        .with_step(step)
        .unwrap()
        .with_max_value(i64::MAX)
        .unwrap()
        .with_retry_times(1000)
        .unwrap();
    SequenceAllocator::new(store, config).unwrap()
}

/// Benchmarks the lock-free cursor of a single range.
fn bench_value_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_range");
    group.throughput(Throughput::Elements(TOTAL_VALUES as u64));

    group.bench_function(format!("elems/{TOTAL_VALUES}"), |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();
            for _ in 0..iters {
                let range = ValueRange::from(1, TOTAL_VALUES as i64).unwrap();
                while let Some(value) = range.next_value() {
                    black_box(value);
                }
            }
            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmarks single-threaded allocation at several segment sizes. Small steps
/// are dominated by store round-trips, large ones by the cached path.
fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator");
    group.throughput(Throughput::Elements(TOTAL_VALUES as u64));

    for step in [1, 16, 1024] {
        group.bench_function(format!("step/{step}/elems/{TOTAL_VALUES}"), |b| {
            b.iter_custom(|iters| {
                let start = Instant::now();
                for _ in 0..iters {
                    let allocator = allocator(step);
                    for _ in 0..TOTAL_VALUES {
                        black_box(allocator.next_for("BENCH").unwrap());
                    }
                }
                start.elapsed()
            });
        });
    }

    group.finish();
}

/// Benchmarks one allocator shared by every core, all drawing from the same
/// sequence.
fn bench_allocator_contended(c: &mut Criterion) {
    let threads = num_cpus::get();
    let mut group = c.benchmark_group("allocator_contended");
    group.throughput(Throughput::Elements((TOTAL_VALUES * threads) as u64));

    group.bench_function(
        format!("threads/{threads}/elems/{}", TOTAL_VALUES * threads),
        |b| {
            b.iter_custom(|iters| {
                let mut total = core::time::Duration::ZERO;
                for _ in 0..iters {
                    let allocator = allocator(1024);
                    let barrier = Barrier::new(threads + 1);
                    let start = scope(|s| {
                        for _ in 0..threads {
                            s.spawn(|| {
                                barrier.wait();
                                for _ in 0..TOTAL_VALUES {
                                    black_box(allocator.next_for("BENCH").unwrap());
                                }
                            });
                        }
                        barrier.wait();
                        Instant::now()
                    });
                    total += start.elapsed();
                }
                total
            });
        },
    );

    group.finish();
}

criterion_group!(
    benches,
    bench_value_range,
    bench_allocator,
    bench_allocator_contended
);
criterion_main!(benches);
