//! Runs the patterns one after another on OS threads.
//!
//! Each pattern gets fresh component instances, spawns its workers as scoped
//! threads borrowing those instances, and joins every one of them before the
//! next pattern starts. The driver itself holds no coordination invariant.

mod report;
mod workers;

use core::fmt;
use core::str::FromStr;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::Instant;

use crate::channel::BoundedChannel;
use crate::config::{CoordinationConfig, Pacing};
use crate::errors::{PatternError, PatternResult};
use crate::gate::SharedReadGate;
use crate::journal::{Event, Journal, Pattern};
use crate::ring::ResourceRing;

pub use report::{PatternReport, RunSummary};
pub use workers::item_for;

/// Which patterns a [`Driver::run`] executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Only(Pattern),
}

impl Selection {
    #[must_use]
    pub fn patterns(self) -> Vec<Pattern> {
        match self {
            Selection::All => Pattern::ALL.to_vec(),
            Selection::Only(pattern) => vec![pattern],
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str("all"),
            Selection::Only(pattern) => fmt::Display::fmt(pattern, f),
        }
    }
}

impl FromStr for Selection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(Selection::All);
        }
        s.parse().map(Selection::Only)
    }
}

/// Spawned workers of one pattern, tagged with who they are.
struct Crew<'scope> {
    pattern: Pattern,
    members: Vec<(&'static str, usize, ScopedJoinHandle<'scope, u64>)>,
}

impl<'scope> Crew<'scope> {
    fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            members: Vec::new(),
        }
    }

    fn spawn<'env, F>(
        &mut self,
        scope: &'scope Scope<'scope, 'env>,
        role: &'static str,
        worker: usize,
        f: F,
    ) where
        F: FnOnce() -> u64 + Send + 'scope,
    {
        self.members.push((role, worker, scope.spawn(f)));
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    /// Joins every member, even after one of them has panicked, and reports
    /// the first panic.
    fn join(self) -> PatternResult<u64> {
        let mut operations = 0;
        let mut first_panic = None;

        for (role, worker, handle) in self.members {
            match handle.join() {
                Ok(done) => operations += done,
                Err(_) => {
                    coord_logs::error!(pattern = %self.pattern, role, worker, "worker panicked");
                    first_panic.get_or_insert(PatternError::WorkerPanicked {
                        pattern: self.pattern,
                        role,
                        worker,
                    });
                }
            }
        }

        match first_panic {
            Some(err) => Err(err),
            None => Ok(operations),
        }
    }
}

/// Owns a validated configuration and the journal every worker writes to.
#[derive(Debug)]
pub struct Driver {
    config: CoordinationConfig,
    journal: Journal,
}

impl Driver {
    /// Validates `config` and prepares a driver that echoes every event to the
    /// log.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Config`] when the configuration is rejected.
    pub fn new(config: CoordinationConfig) -> PatternResult<Self> {
        Self::with_journal(config, Journal::new())
    }

    /// Same as [`Driver::new`] with a caller-chosen journal, typically
    /// [`Journal::silent`].
    ///
    /// # Errors
    ///
    /// Returns [`PatternError::Config`] when the configuration is rejected.
    pub fn with_journal(config: CoordinationConfig, journal: Journal) -> PatternResult<Self> {
        config.validate()?;
        Ok(Self { config, journal })
    }

    #[must_use]
    pub const fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    #[must_use]
    pub const fn journal(&self) -> &Journal {
        &self.journal
    }

    #[must_use]
    pub fn into_journal(self) -> Journal {
        self.journal
    }

    /// Runs the selected patterns in order, pausing between them, then
    /// records the final completion event.
    ///
    /// # Errors
    ///
    /// Stops at the first pattern that fails.
    pub fn run(&self, selection: Selection) -> PatternResult<RunSummary> {
        let started = Instant::now();
        let mut reports = Vec::new();

        for (position, pattern) in selection.patterns().into_iter().enumerate() {
            if position > 0 {
                Pacing::pause(self.config.pacing.between_patterns_ms);
            }
            reports.push(self.run_pattern(pattern)?);
        }

        self.journal.record(Event::AllCompleted);
        Ok(RunSummary {
            reports,
            elapsed: started.elapsed(),
        })
    }

    /// # Errors
    ///
    /// Fails when a worker panics.
    pub fn run_pattern(&self, pattern: Pattern) -> PatternResult<PatternReport> {
        match pattern {
            Pattern::ProducerConsumer => self.run_producer_consumer(),
            Pattern::ReadersWriters => self.run_readers_writers(),
            Pattern::DiningPhilosophers => self.run_dining_philosophers(),
        }
    }

    /// Producers put `iterations` items each into one bounded channel while
    /// consumers drain exactly that many between them.
    ///
    /// # Errors
    ///
    /// Fails when a worker panics.
    pub fn run_producer_consumer(&self) -> PatternResult<PatternReport> {
        let settings = &self.config.channel;
        let channel = BoundedChannel::new(settings.capacity)?;

        self.supervise(Pattern::ProducerConsumer, |scope, crew| {
            let (channel, journal, pacing) = (&channel, &self.journal, &self.config.pacing);

            for producer in 1..=settings.producers {
                let iterations = settings.iterations;
                crew.spawn(scope, "producer", producer, move || {
                    workers::produce(channel, journal, pacing, producer, iterations)
                });
            }
            for consumer in 1..=settings.consumers {
                let quota = settings.consumer_quota(consumer - 1);
                crew.spawn(scope, "consumer", consumer, move || {
                    workers::consume(channel, journal, pacing, consumer, quota)
                });
            }
        })
    }

    /// Readers and writers share one counter behind a reader-preferring gate.
    /// Each write increments it.
    ///
    /// # Errors
    ///
    /// Fails when a worker panics.
    pub fn run_readers_writers(&self) -> PatternResult<PatternReport> {
        let settings = &self.config.gate;
        let gate = SharedReadGate::new(settings.initial_value);

        self.supervise(Pattern::ReadersWriters, |scope, crew| {
            let (gate, journal, pacing) = (&gate, &self.journal, &self.config.pacing);

            for reader in 1..=settings.readers {
                let iterations = settings.reader_iterations;
                crew.spawn(scope, "reader", reader, move || {
                    workers::read(gate, journal, pacing, reader, iterations)
                });
            }
            for writer in 1..=settings.writers {
                let iterations = settings.writer_iterations;
                crew.spawn(scope, "writer", writer, move || {
                    workers::write(gate, journal, pacing, writer, iterations)
                });
            }
        })
    }

    /// One philosopher per seat plays `rounds` rounds around a fresh ring.
    ///
    /// # Errors
    ///
    /// Fails when a worker panics.
    pub fn run_dining_philosophers(&self) -> PatternResult<PatternReport> {
        let settings = &self.config.ring;
        let ring = ResourceRing::new(settings.ring_size)?;

        self.supervise(Pattern::DiningPhilosophers, |scope, crew| {
            let (ring, journal, pacing) = (&ring, &self.journal, &self.config.pacing);

            for seat in ring.seats() {
                let rounds = settings.rounds;
                crew.spawn(scope, "philosopher", seat.index(), move || {
                    workers::dine(ring, journal, pacing, seat, rounds)
                });
            }
        })
    }

    fn supervise<'env, F>(&self, pattern: Pattern, spawn: F) -> PatternResult<PatternReport>
    where
        F: for<'scope> FnOnce(&'scope Scope<'scope, 'env>, &mut Crew<'scope>),
    {
        self.journal.record(Event::PatternStarted { pattern });
        let started = Instant::now();

        let (workers, outcome) = thread::scope(|scope| {
            let mut crew = Crew::new(pattern);
            spawn(scope, &mut crew);
            coord_logs::debug!(%pattern, workers = crew.len(), "workers spawned");
            (crew.len(), crew.join())
        });
        let operations = outcome?;

        self.journal.record(Event::PatternCompleted { pattern });
        Ok(PatternReport {
            pattern,
            workers,
            operations,
            elapsed: started.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConfigError;

    fn quiet_driver(config: CoordinationConfig) -> Driver {
        Driver::with_journal(config, Journal::silent()).unwrap()
    }

    #[test]
    fn invalid_configuration_never_builds_a_driver() {
        let mut config = CoordinationConfig::unpaced();
        config.channel.consumers = 0;
        let err = Driver::new(config).unwrap_err();
        assert!(matches!(
            err,
            PatternError::Config(ConfigError::Invalid {
                field: "channel.consumers",
                ..
            })
        ));
    }

    #[test]
    fn selection_parses_all_and_single_patterns() {
        assert_eq!("all".parse::<Selection>(), Ok(Selection::All));
        assert_eq!(
            "readers-writers".parse::<Selection>(),
            Ok(Selection::Only(Pattern::ReadersWriters))
        );
        assert!("assembler".parse::<Selection>().is_err());
        assert_eq!(Selection::All.patterns(), Pattern::ALL.to_vec());
        assert_eq!(Selection::Only(Pattern::ReadersWriters).to_string(), "readers-writers");
    }

    #[test]
    #[ntest::timeout(10000)]
    fn default_run_reports_every_pattern() {
        let driver = quiet_driver(CoordinationConfig::unpaced());
        let summary = driver.run(Selection::All).unwrap();

        let operations: Vec<_> = summary
            .reports
            .iter()
            .map(|report| (report.pattern, report.workers, report.operations))
            .collect();
        assert_eq!(
            operations,
            vec![
                (Pattern::ProducerConsumer, 4, 20),
                (Pattern::ReadersWriters, 5, 13),
                (Pattern::DiningPhilosophers, 5, 15),
            ]
        );

        let entries = driver.journal().entries();
        assert_eq!(entries.last().map(|entry| entry.event), Some(Event::AllCompleted));
    }

    #[test]
    #[ntest::timeout(10000)]
    fn uneven_consumers_still_drain_the_channel() {
        let mut config = CoordinationConfig::unpaced();
        config.channel.producers = 3;
        config.channel.consumers = 2;
        config.channel.iterations = 3;
        let driver = quiet_driver(config);

        driver.run_producer_consumer().unwrap();

        let events = driver.journal().events_for(Pattern::ProducerConsumer);
        let mut consumed: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                Event::Consumed { item, .. } => Some(*item),
                _ => None,
            })
            .collect();
        consumed.sort_unstable();
        assert_eq!(consumed, vec![100, 101, 102, 200, 201, 202, 300, 301, 302]);
    }

    #[test]
    #[ntest::timeout(10000)]
    fn writes_land_on_the_shared_counter() {
        let mut config = CoordinationConfig::unpaced();
        config.gate.initial_value = 40;
        let driver = quiet_driver(config);

        driver.run_readers_writers().unwrap();

        let last_written = driver
            .journal()
            .events_for(Pattern::ReadersWriters)
            .into_iter()
            .filter_map(|event| match event {
                Event::Wrote { value, .. } => Some(value),
                _ => None,
            })
            .max();
        assert_eq!(last_written, Some(44));
    }

    #[test]
    fn a_panicking_worker_is_reported_after_the_others_finish() {
        let outcome = thread::scope(|scope| {
            let mut crew = Crew::new(Pattern::ReadersWriters);
            crew.spawn(scope, "reader", 1, || 3);
            crew.spawn(scope, "writer", 2, || panic!("boom"));
            crew.spawn(scope, "reader", 3, || 3);
            crew.join()
        });

        let err = outcome.unwrap_err();
        assert_eq!(err.to_string(), "writer 2 panicked while running readers-writers");
    }
}
