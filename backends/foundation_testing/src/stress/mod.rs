//! High-contention runs of the coordination components.
//!
//! [`StressHarness`] hammers a closure from many threads; the runners in
//! [`patterns`] point it at a channel, a gate or a ring and count every
//! iteration whose own checks passed.

use core::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

pub mod config;
pub mod patterns;

pub use config::StressConfig;
pub use patterns::{run_channel_stress, run_gate_stress, run_ring_stress};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressResult {
    /// Operations whose checks passed
    pub successes: usize,
    /// Operations whose checks failed, plus one per panicked thread
    pub failures: usize,
    pub duration: Duration,
    pub thread_count: usize,
}

impl StressResult {
    #[must_use]
    pub const fn new(
        successes: usize,
        failures: usize,
        duration: Duration,
        thread_count: usize,
    ) -> Self {
        Self {
            successes,
            failures,
            duration,
            thread_count,
        }
    }

    #[must_use]
    pub const fn total_operations(&self) -> usize {
        self.successes + self.failures
    }

    /// Returns the success rate as a value between 0.0 and 1.0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total_operations() == 0 {
            0.0
        } else {
            self.successes as f64 / self.total_operations() as f64
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn operations_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs == 0.0 {
            0.0
        } else {
            self.total_operations() as f64 / secs
        }
    }
}

/// Spawns scoped threads that run an operation repeatedly until the
/// iteration count or the optional duration runs out.
pub struct StressHarness {
    config: StressConfig,
}

impl StressHarness {
    #[must_use]
    pub const fn new(config: StressConfig) -> Self {
        Self { config }
    }

    /// Runs `operation(thread_id, iteration)` on every thread. It returns
    /// `true` when the iteration's own checks passed.
    ///
    /// Threads are scoped, so `operation` may borrow from the caller. A
    /// panicking thread is counted as one failure instead of tearing the run
    /// down.
    ///
    /// # Examples
    ///
    /// ```
    /// use foundation_testing::stress::{StressConfig, StressHarness};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    ///
    /// let counter = AtomicUsize::new(0);
    /// let harness = StressHarness::new(StressConfig::new().threads(4).iterations(100));
    ///
    /// let result = harness.run(|_thread_id, _iteration| {
    ///     counter.fetch_add(1, Ordering::Relaxed);
    ///     true
    /// });
    ///
    /// assert_eq!(counter.load(Ordering::Relaxed), 400);
    /// assert_eq!(result.successes, 400);
    /// ```
    pub fn run<F>(&self, operation: F) -> StressResult
    where
        F: Fn(usize, usize) -> bool + Sync,
    {
        let start = Instant::now();
        let deadline = self.config.get_duration().map(|limit| start + limit);
        let iterations = self.config.get_iterations();
        let thread_count = self.config.get_thread_count();

        let successes = AtomicUsize::new(0);
        let failures = AtomicUsize::new(0);
        let stop = AtomicBool::new(false);

        thread::scope(|scope| {
            let handles: Vec<_> = (0..thread_count)
                .map(|thread_id| {
                    let (operation, successes, failures, stop) =
                        (&operation, &successes, &failures, &stop);
                    scope.spawn(move || {
                        for iteration in 0..iterations {
                            if stop.load(Ordering::Acquire) {
                                break;
                            }
                            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                                stop.store(true, Ordering::Release);
                                break;
                            }

                            if operation(thread_id, iteration) {
                                successes.fetch_add(1, Ordering::Relaxed);
                            } else {
                                failures.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    })
                })
                .collect();

            for (thread_id, handle) in handles.into_iter().enumerate() {
                if handle.join().is_err() {
                    coord_logs::error!(thread_id, "stress thread panicked");
                    failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        });

        StressResult::new(
            successes.load(Ordering::Relaxed),
            failures.load(Ordering::Relaxed),
            start.elapsed(),
            thread_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failures_and_panics_are_counted() {
        let harness = StressHarness::new(StressConfig::new().threads(3).iterations(10));
        let result = harness.run(|thread_id, iteration| {
            assert!(thread_id != 2 || iteration < 5, "thread 2 gives up");
            iteration % 2 == 0
        });

        // Threads 0 and 1 run 10 iterations, thread 2 runs 5 then panics.
        assert_eq!(result.successes, 5 + 5 + 3);
        assert_eq!(result.failures, 5 + 5 + 2 + 1);
        assert_eq!(result.thread_count, 3);
    }

    #[test]
    fn duration_cuts_a_long_run_short() {
        let harness = StressHarness::new(
            StressConfig::new()
                .threads(2)
                .iterations(usize::MAX)
                .duration(Duration::from_millis(50)),
        );
        let result = harness.run(|_, _| {
            thread::sleep(Duration::from_millis(1));
            true
        });

        assert!(result.successes > 0);
        assert_eq!(result.failures, 0);
        assert!(result.duration < Duration::from_secs(5));
    }

    #[test]
    fn empty_result_reports_zero_rates() {
        let result = StressResult::new(0, 0, Duration::ZERO, 1);
        assert!(result.success_rate().abs() < f64::EPSILON);
        assert!(result.operations_per_second().abs() < f64::EPSILON);
    }
}
