//! Ordered record of everything the workers did.
//!
//! Workers record an event while they are still inside the critical section
//! the event describes: a production is recorded under the queue lock, a read
//! inside its read bracket, a meal while both forks are held. The journal's
//! sequence numbers therefore follow the order in which the protected
//! operations really happened, which is what the invariant checkers rely on.
//!
//! Lock order is always component lock first, journal lock second. The journal
//! never calls back into a component.

use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// The three coordination patterns the driver knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Pattern {
    ProducerConsumer,
    ReadersWriters,
    DiningPhilosophers,
}

impl Pattern {
    /// Every pattern, in the order the driver runs them.
    pub const ALL: [Pattern; 3] = [
        Pattern::ProducerConsumer,
        Pattern::ReadersWriters,
        Pattern::DiningPhilosophers,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Pattern::ProducerConsumer => "producer-consumer",
            Pattern::ReadersWriters => "readers-writers",
            Pattern::DiningPhilosophers => "dining-philosophers",
        }
    }

    #[must_use]
    pub const fn banner(self) -> &'static str {
        match self {
            Pattern::ProducerConsumer => "PRODUCER-CONSUMER PROBLEM",
            Pattern::ReadersWriters => "READERS-WRITERS PROBLEM",
            Pattern::DiningPhilosophers => "DINING PHILOSOPHERS PROBLEM",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::ALL
            .into_iter()
            .find(|pattern| pattern.name() == s)
            .ok_or_else(|| format!("unknown pattern `{s}`"))
    }
}

/// A significant step taken by a worker or the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    PatternStarted {
        pattern: Pattern,
    },
    /// `len` is the channel length right after the put.
    Produced {
        producer: usize,
        item: u64,
        len: usize,
    },
    /// `len` is the channel length right after the take.
    Consumed {
        consumer: usize,
        item: u64,
        len: usize,
    },
    /// `active` counts this reader.
    ReadBegin {
        reader: usize,
        active: usize,
    },
    Read {
        reader: usize,
        value: u64,
    },
    ReadEnd {
        reader: usize,
    },
    WriteBegin {
        writer: usize,
    },
    Wrote {
        writer: usize,
        value: u64,
    },
    WriteEnd {
        writer: usize,
    },
    Thinking {
        seat: usize,
        round: usize,
    },
    Hungry {
        seat: usize,
        round: usize,
    },
    /// Recorded while both forks are held; `forks` is `(left, right)`.
    Eating {
        seat: usize,
        round: usize,
        forks: (usize, usize),
    },
    /// Recorded just before both forks go back down.
    PutDown {
        seat: usize,
        round: usize,
    },
    Finished {
        seat: usize,
    },
    PatternCompleted {
        pattern: Pattern,
    },
    AllCompleted,
}

impl Event {
    /// The pattern an event belongs to, `None` for the final driver line.
    #[must_use]
    pub const fn pattern(&self) -> Option<Pattern> {
        match self {
            Event::PatternStarted { pattern } | Event::PatternCompleted { pattern } => {
                Some(*pattern)
            }
            Event::Produced { .. } | Event::Consumed { .. } => Some(Pattern::ProducerConsumer),
            Event::ReadBegin { .. }
            | Event::Read { .. }
            | Event::ReadEnd { .. }
            | Event::WriteBegin { .. }
            | Event::Wrote { .. }
            | Event::WriteEnd { .. } => Some(Pattern::ReadersWriters),
            Event::Thinking { .. }
            | Event::Hungry { .. }
            | Event::Eating { .. }
            | Event::PutDown { .. }
            | Event::Finished { .. } => Some(Pattern::DiningPhilosophers),
            Event::AllCompleted => None,
        }
    }

    /// Role and identity of the worker behind the event.
    #[must_use]
    pub const fn worker(&self) -> Option<(&'static str, usize)> {
        match *self {
            Event::Produced { producer, .. } => Some(("producer", producer)),
            Event::Consumed { consumer, .. } => Some(("consumer", consumer)),
            Event::ReadBegin { reader, .. }
            | Event::Read { reader, .. }
            | Event::ReadEnd { reader } => Some(("reader", reader)),
            Event::WriteBegin { writer }
            | Event::Wrote { writer, .. }
            | Event::WriteEnd { writer } => Some(("writer", writer)),
            Event::Thinking { seat, .. }
            | Event::Hungry { seat, .. }
            | Event::Eating { seat, .. }
            | Event::PutDown { seat, .. }
            | Event::Finished { seat } => Some(("philosopher", seat)),
            Event::PatternStarted { .. } | Event::PatternCompleted { .. } | Event::AllCompleted => {
                None
            }
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::PatternStarted { pattern } => write!(f, "=== {} ===", pattern.banner()),
            Event::Produced {
                producer,
                item,
                len,
            } => write!(f, "[Producer {producer}] produced: {item} (buffered {len})"),
            Event::Consumed {
                consumer,
                item,
                len,
            } => write!(f, "[Consumer {consumer}] consumed: {item} (buffered {len})"),
            Event::ReadBegin { reader, active } => {
                write!(f, "[Reader {reader}] admitted ({active} active)")
            }
            Event::Read { reader, value } => write!(f, "[Reader {reader}] reads: {value}"),
            Event::ReadEnd { reader } => write!(f, "[Reader {reader}] leaves"),
            Event::WriteBegin { writer } => write!(f, "[Writer {writer}] admitted"),
            Event::Wrote { writer, value } => write!(f, "[Writer {writer}] writes: {value}"),
            Event::WriteEnd { writer } => write!(f, "[Writer {writer}] leaves"),
            Event::Thinking { seat, .. } => write!(f, "[Philosopher {seat}] is thinking..."),
            Event::Hungry { seat, .. } => write!(f, "[Philosopher {seat}] is hungry"),
            Event::Eating { seat, round, .. } => {
                write!(f, "[Philosopher {seat}] is eating (round {})...", round + 1)
            }
            Event::PutDown { seat, .. } => write!(f, "[Philosopher {seat}] puts down both forks"),
            Event::Finished { seat } => write!(f, "[Philosopher {seat}] is done"),
            Event::PatternCompleted { pattern } => write!(f, "=== {pattern} completed ==="),
            Event::AllCompleted => f.write_str("All patterns completed."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub seq: u64,
    pub event: Event,
}

/// Thread-safe, append-only event log.
#[derive(Debug)]
pub struct Journal {
    entries: Mutex<Vec<Entry>>,
    echo: bool,
}

impl Default for Journal {
    fn default() -> Self {
        Self::new()
    }
}

impl Journal {
    /// A journal that also emits every event as an `info` log line.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            echo: true,
        }
    }

    /// A journal that only records. Used by benches and stress runs.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            echo: false,
        }
    }

    /// Appends `event` and returns its sequence number.
    ///
    /// The log line is emitted under the journal lock so console order and
    /// sequence order agree.
    pub fn record(&self, event: Event) -> u64 {
        let mut entries = match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let seq = entries.len() as u64;
        entries.push(Entry { seq, event });

        if self.echo {
            let pattern = event.pattern().map_or("driver", Pattern::name);
            match event.worker() {
                Some((role, worker)) => {
                    coord_logs::info!(pattern, role, worker, "{event}");
                }
                None => {
                    coord_logs::info!(pattern, "{event}");
                }
            }
        }
        seq
    }

    /// Snapshot of every entry recorded so far.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        match self.entries.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Snapshot of the events that belong to `pattern`, in sequence order.
    #[must_use]
    pub fn events_for(&self, pattern: Pattern) -> Vec<Event> {
        self.entries()
            .into_iter()
            .map(|entry| entry.event)
            .filter(|event| event.pattern() == Some(pattern))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self.entries.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
