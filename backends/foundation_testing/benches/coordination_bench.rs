use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use foundation_sync::{
    BoundedChannel, CoordinationConfig, Driver, Journal, ResourceRing, Selection, SharedReadGate,
};
use std::thread;

const ITEMS: u64 = 1_000;

/// One producer and one consumer pushing `ITEMS` items through channels of
/// growing capacity.
fn bench_channel_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("channel_throughput");
    group.throughput(Throughput::Elements(ITEMS));

    for capacity in [1, 8, 64] {
        group.bench_function(format!("capacity_{capacity}"), |b| {
            b.iter_batched(
                || BoundedChannel::new(capacity).unwrap(),
                |channel| {
                    thread::scope(|scope| {
                        scope.spawn(|| {
                            for item in 0..ITEMS {
                                channel.put(item);
                            }
                        });
                        scope.spawn(|| {
                            for _ in 0..ITEMS {
                                black_box(channel.take());
                            }
                        });
                    });
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Four threads mixing reads and writes at different write ratios.
fn bench_gate_mix(c: &mut Criterion) {
    let mut group = c.benchmark_group("gate_read_write_mix");

    for writes_per_hundred in [0u64, 10, 50] {
        group.bench_function(format!("{writes_per_hundred}pct_writes"), |b| {
            b.iter_batched(
                || SharedReadGate::new(0u64),
                |gate| {
                    thread::scope(|scope| {
                        for _ in 0..4 {
                            scope.spawn(|| {
                                for op in 0..250u64 {
                                    if op % 100 < writes_per_hundred {
                                        *gate.write() += 1;
                                    } else {
                                        black_box(*gate.begin_read());
                                    }
                                }
                            });
                        }
                    });
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// Every seat eats 100 meals around rings of different sizes.
fn bench_ring_rounds(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_rounds");

    for ring_size in [2, 5, 8] {
        group.bench_function(format!("{ring_size}_seats"), |b| {
            b.iter_batched(
                || ResourceRing::new(ring_size).unwrap(),
                |ring| {
                    thread::scope(|scope| {
                        for seat in ring.seats() {
                            let ring = &ring;
                            scope.spawn(move || {
                                for _ in 0..100 {
                                    black_box(ring.pick_up(seat).holds_both());
                                }
                            });
                        }
                    });
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

/// The whole default demo without pacing.
fn bench_driver_run(c: &mut Criterion) {
    c.bench_function("driver_run_all_unpaced", |b| {
        b.iter_batched(
            || Driver::with_journal(CoordinationConfig::unpaced(), Journal::silent()).unwrap(),
            |driver| black_box(driver.run(Selection::All).unwrap()),
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_channel_throughput,
    bench_gate_mix,
    bench_ring_rounds,
    bench_driver_run
);
criterion_main!(benches);
