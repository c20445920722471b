//! Coordination patterns over shared mutable state.
//!
//! - [`channel::BoundedChannel`]: fixed-capacity FIFO with blocking `put` and
//!   `take` built on a mutex and two condition variables.
//! - [`gate::SharedReadGate`]: readers share, writers exclude, readers win.
//! - [`ring::ResourceRing`]: a cycle of forks picked up in seat-parity order
//!   so that no wait cycle can form.
//!
//! The [`driver::Driver`] runs the classic producer-consumer, readers-writers
//! and dining-philosophers demos on top of them, recording every step into a
//! [`journal::Journal`].

pub mod channel;
pub mod config;
pub mod driver;
pub mod errors;
pub mod gate;
pub mod journal;
pub mod ring;

pub use channel::BoundedChannel;
pub use config::CoordinationConfig;
pub use driver::{Driver, PatternReport, RunSummary, Selection};
pub use errors::{ConfigError, ConfigResult, PatternError, PatternResult};
pub use gate::SharedReadGate;
pub use journal::{Entry, Event, Journal, Pattern};
pub use ring::ResourceRing;
