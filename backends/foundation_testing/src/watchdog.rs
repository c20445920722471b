//! Bounds a run that might deadlock.
//!
//! The closure runs on a named helper thread and hands its result back over
//! a crossbeam channel. If nothing arrives before the deadline the run is
//! reported as stalled and the helper thread is left behind; a real deadlock
//! cannot be cancelled from the outside.

use core::time::Duration;
use std::thread;

use crossbeam::channel::{self, RecvTimeoutError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchdogError {
    #[error("`{name}` did not finish within {deadline:?}")]
    Stalled { name: String, deadline: Duration },

    #[error("`{name}` panicked")]
    Panicked { name: String },

    #[error("could not spawn a thread for `{name}`")]
    Spawn { name: String },
}

/// Runs `work` and waits at most `deadline` for it to finish.
///
/// # Errors
///
/// [`WatchdogError::Stalled`] on timeout, [`WatchdogError::Panicked`] when
/// `work` unwinds, [`WatchdogError::Spawn`] when the helper thread cannot
/// start.
///
/// # Examples
///
/// ```
/// use foundation_testing::watchdog::run_with_deadline;
/// use std::time::Duration;
///
/// let answer = run_with_deadline("sum", Duration::from_secs(5), || 40 + 2);
/// assert_eq!(answer, Ok(42));
/// ```
pub fn run_with_deadline<T, F>(name: &str, deadline: Duration, work: F) -> Result<T, WatchdogError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (sender, receiver) = channel::bounded(1);

    thread::Builder::new()
        .name(format!("watched-{name}"))
        .spawn(move || {
            let outcome = work();
            // The receiver is gone once the deadline passed; nothing to do.
            let _ = sender.send(outcome);
        })
        .map_err(|_| WatchdogError::Spawn {
            name: name.to_owned(),
        })?;

    match receiver.recv_timeout(deadline) {
        Ok(outcome) => Ok(outcome),
        Err(RecvTimeoutError::Timeout) => {
            coord_logs::warn!(name, ?deadline, "watched run stalled");
            Err(WatchdogError::Stalled {
                name: name.to_owned(),
                deadline,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(WatchdogError::Panicked {
            name: name.to_owned(),
        }),
    }
}
