//! Test tooling for the `foundation_sync` coordination components.
//!
//! This crate provides:
//! - **Stress framework**: configurable high-contention runs of the channel,
//!   the gate and the ring
//! - **Watchdog**: bounds runs that could deadlock
//! - **Invariant checks**: replay a recorded journal and report the first
//!   broken property
//! - **Ring model**: exhaustive exploration of the fork-acquisition protocol
//! - **Criterion benchmarks**: see `benches/`
//!
//! # Examples
//!
//! ```rust
//! use foundation_sync::{CoordinationConfig, Driver, Journal, Pattern, Selection};
//! use foundation_testing::invariants::check_ring_pairing;
//!
//! let config = CoordinationConfig::unpaced();
//! let driver = Driver::with_journal(config.clone(), Journal::silent()).unwrap();
//! driver.run(Selection::Only(Pattern::DiningPhilosophers)).unwrap();
//!
//! let events = driver.journal().events_for(Pattern::DiningPhilosophers);
//! check_ring_pairing(&events, config.ring.ring_size, config.ring.rounds).unwrap();
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod invariants;
pub mod model;
pub mod stress;
pub mod watchdog;

pub use invariants::Violation;
pub use stress::{StressConfig, StressHarness, StressResult};
pub use watchdog::{run_with_deadline, WatchdogError};
