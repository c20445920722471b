//! Stress runners for the three components.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use foundation_sync::config::CoordinationConfig;
use foundation_sync::gate::SharedReadGate;
use foundation_sync::journal::{Journal, Pattern};
use foundation_sync::ring::ResourceRing;
use foundation_sync::Driver;

use crate::invariants::{check_capacity, check_conservation};
use crate::stress::{StressConfig, StressHarness, StressResult};

/// Splits the threads into producers and consumers over one channel of
/// `config.get_capacity()` slots and runs the producer-consumer pattern
/// through the driver.
///
/// Successes are the completed puts and takes. Each failed journal check
/// counts as one failure, and a run that could not start or lost a worker
/// counts as one failure with no successes.
///
/// # Examples
///
/// ```
/// use foundation_testing::stress::{run_channel_stress, StressConfig};
///
/// let result = run_channel_stress(StressConfig::new().threads(4).iterations(200).capacity(2));
/// assert_eq!(result.failures, 0);
/// assert_eq!(result.successes, 2 * 2 * 200);
/// ```
#[must_use]
pub fn run_channel_stress(config: StressConfig) -> StressResult {
    let start = Instant::now();
    let threads = config.get_thread_count().max(2);
    let producers = threads / 2;

    let mut settings = CoordinationConfig::unpaced();
    settings.channel.capacity = config.get_capacity();
    settings.channel.producers = producers;
    settings.channel.consumers = threads - producers;
    settings.channel.iterations = config.get_iterations();

    let outcome = Driver::with_journal(settings, Journal::silent())
        .and_then(|driver| Ok((driver.run_producer_consumer()?, driver)));
    let (report, driver) = match outcome {
        Ok(done) => done,
        Err(err) => {
            coord_logs::error!(%err, "channel stress run failed");
            return StressResult::new(0, 1, start.elapsed(), threads);
        }
    };

    let events = driver.journal().events_for(Pattern::ProducerConsumer);
    let checks = [
        check_conservation(&events),
        check_capacity(&events, config.get_capacity()),
    ];
    let failures = checks.iter().filter(|check| check.is_err()).count();
    for violation in checks.iter().filter_map(|check| check.as_ref().err()) {
        coord_logs::error!(%violation, "channel invariant broken");
    }

    StressResult::new(
        usize::try_from(report.operations).unwrap_or(usize::MAX),
        failures,
        start.elapsed(),
        threads,
    )
}

/// Every fourth thread writes, the rest read. Each iteration checks the
/// gate's exclusion from the inside with independent counters: a reader
/// must never see a writer inside, a writer must be alone.
///
/// # Examples
///
/// ```
/// use foundation_testing::stress::{run_gate_stress, StressConfig};
///
/// let result = run_gate_stress(StressConfig::new().threads(8).iterations(200));
/// assert_eq!(result.success_rate(), 1.0);
/// ```
#[must_use]
pub fn run_gate_stress(config: StressConfig) -> StressResult {
    let gate = SharedReadGate::new(0u64);
    let readers_inside = AtomicUsize::new(0);
    let writers_inside = AtomicUsize::new(0);

    StressHarness::new(config).run(|thread_id, _iteration| {
        if thread_id % 4 == 0 {
            let mut value = gate.write();
            let alone = writers_inside.fetch_add(1, Ordering::SeqCst) == 0
                && readers_inside.load(Ordering::SeqCst) == 0;
            *value += 1;
            writers_inside.fetch_sub(1, Ordering::SeqCst);
            alone
        } else {
            let guard = gate.begin_read();
            readers_inside.fetch_add(1, Ordering::SeqCst);
            let unopposed = writers_inside.load(Ordering::SeqCst) == 0;
            std::hint::black_box(*guard.read());
            readers_inside.fetch_sub(1, Ordering::SeqCst);
            unopposed
        }
    })
}

/// One thread per seat around a ring of `threads` forks (at least two).
/// Each iteration is one meal, which succeeds when both forks are recorded
/// as held by the eating seat.
///
/// # Examples
///
/// ```
/// use foundation_testing::stress::{run_ring_stress, StressConfig};
///
/// let result = run_ring_stress(StressConfig::new().threads(5).iterations(300));
/// assert_eq!(result.successes, 5 * 300);
/// ```
#[must_use]
pub fn run_ring_stress(config: StressConfig) -> StressResult {
    let ring_size = config.get_thread_count().max(2);
    let Ok(ring) = ResourceRing::new(ring_size) else {
        return StressResult::new(0, 1, core::time::Duration::ZERO, ring_size);
    };

    StressHarness::new(config.threads(ring_size)).run(|thread_id, _iteration| {
        let Some(seat) = ring.seat(thread_id) else {
            return false;
        };
        let meal = ring.pick_up(seat);
        let held = meal.holds_both();
        drop(meal);
        held
    })
}
