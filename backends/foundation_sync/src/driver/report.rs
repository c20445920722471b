//! Per-pattern and whole-run summaries.

use core::fmt;
use core::time::Duration;

use crate::journal::Pattern;

/// What one pattern run amounted to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternReport {
    pub pattern: Pattern,
    /// Worker threads spawned for the pattern.
    pub workers: usize,
    /// Puts plus takes, reads plus writes, or meals eaten.
    pub operations: u64,
    pub elapsed: Duration,
}

impl PatternReport {
    /// Operations per second, zero for an instantaneous run.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.operations as f64 / secs
        } else {
            0.0
        }
    }
}

/// Reports of every pattern a [`Driver::run`](super::Driver::run) executed,
/// in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub reports: Vec<PatternReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn report(&self, pattern: Pattern) -> Option<&PatternReport> {
        self.reports.iter().find(|report| report.pattern == pattern)
    }

    #[must_use]
    pub fn total_operations(&self) -> u64 {
        self.reports.iter().map(|report| report.operations).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<20} {:>8} {:>11} {:>12} {:>14}",
            "pattern", "workers", "operations", "elapsed", "ops/sec"
        )?;
        for report in &self.reports {
            writeln!(
                f,
                "{:<20} {:>8} {:>11} {:>12} {:>14.2}",
                report.pattern.name(),
                report.workers,
                report.operations,
                format!("{:.1?}", report.elapsed),
                report.throughput()
            )?;
        }
        write!(
            f,
            "{} operations in {:.1?}",
            self.total_operations(),
            self.elapsed
        )
    }
}
