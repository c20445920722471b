//! Stress test configuration.

use core::time::Duration;

/// Configuration for stress tests.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    /// Number of threads to spawn
    thread_count: usize,
    /// Number of iterations per thread
    iterations: usize,
    /// Optional maximum duration for the test
    duration: Option<Duration>,
    /// Channel capacity used by the channel runner
    capacity: usize,
}

impl StressConfig {
    /// Creates a new stress test configuration with default values.
    ///
    /// Defaults:
    /// - `thread_count`: 4
    /// - `iterations`: 1000
    /// - `duration`: None (no time limit)
    /// - `capacity`: 8
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: 4,
            iterations: 1000,
            duration: None,
            capacity: 8,
        }
    }

    /// Sets the number of threads to spawn. For the ring runner this is also
    /// the ring size.
    #[must_use]
    pub const fn threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    /// Sets the maximum duration for the test.
    ///
    /// If the duration is reached, threads stop at their next iteration
    /// boundary. The channel runner ignores it, since stopping producers and
    /// consumers independently would strand one side.
    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    #[must_use]
    pub const fn get_thread_count(&self) -> usize {
        self.thread_count
    }

    #[must_use]
    pub const fn get_iterations(&self) -> usize {
        self.iterations
    }

    #[must_use]
    pub const fn get_duration(&self) -> Option<Duration> {
        self.duration
    }

    #[must_use]
    pub const fn get_capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}
