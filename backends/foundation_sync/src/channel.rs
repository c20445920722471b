//! Fixed-capacity FIFO shared by producer and consumer threads.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::errors::{ConfigError, ConfigResult};

/// Slots reserved up front; larger channels grow on demand.
const PREALLOCATED_SLOTS: usize = 64;

/// A bounded, blocking, multi-producer multi-consumer FIFO.
///
/// `put` blocks while the channel is full and `take` blocks while it is
/// empty. Both re-check their condition after every wake-up, so a spurious
/// wake-up or a lost race against another waiter just puts the caller back to
/// sleep. Items leave in the order they entered, across all producers.
///
/// There is no timeout: a full channel whose consumers have all gone away
/// blocks its producers forever.
///
/// # Examples
///
/// ```
/// use foundation_sync::channel::BoundedChannel;
/// use std::thread;
///
/// let channel = BoundedChannel::new(2).unwrap();
///
/// thread::scope(|scope| {
///     scope.spawn(|| {
///         for item in [100, 101, 102] {
///             channel.put(item);
///         }
///     });
///     scope.spawn(|| {
///         assert_eq!(channel.take(), 100);
///         assert_eq!(channel.take(), 101);
///         assert_eq!(channel.take(), 102);
///     });
/// });
/// ```
#[derive(Debug)]
pub struct BoundedChannel<T> {
    state: Mutex<ChannelState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

#[derive(Debug)]
struct ChannelState<T> {
    items: VecDeque<T>,
    peak: usize,
}

impl<T> BoundedChannel<T> {
    /// Creates an empty channel holding at most `capacity` items.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `capacity` is zero, since no
    /// producer could ever complete a put.
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::invalid(
                "channel.capacity",
                "a channel needs room for at least one item",
            ));
        }

        Ok(Self {
            state: Mutex::new(ChannelState {
                items: VecDeque::with_capacity(capacity.min(PREALLOCATED_SLOTS)),
                peak: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        })
    }

    /// Appends `item`, blocking while the channel is full.
    pub fn put(&self, item: T) {
        self.put_with(item, |_, _| ());
    }

    /// Appends `item`, blocking while the channel is full, and runs `observe`
    /// with the item and the new length before the queue lock is released.
    ///
    /// Anything `observe` does is ordered with every other put and take.
    /// It must not touch this channel.
    pub fn put_with<R, F>(&self, item: T, observe: F) -> R
    where
        F: FnOnce(&T, usize) -> R,
    {
        let mut state = self.lock();

        while state.items.len() >= self.capacity {
            coord_logs::trace!(capacity = self.capacity, "channel full, producer waiting");
            state = match self.not_full.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        }

        let len = state.items.len() + 1;
        let observed = observe(&item, len);
        state.items.push_back(item);
        state.peak = state.peak.max(len);

        drop(state);
        self.not_empty.notify_one();
        observed
    }

    /// Removes the oldest item, blocking while the channel is empty.
    pub fn take(&self) -> T {
        self.take_with(|_, _| ()).0
    }

    /// Removes the oldest item, blocking while the channel is empty, and runs
    /// `observe` with the item and the new length before the queue lock is
    /// released.
    pub fn take_with<R, F>(&self, observe: F) -> (T, R)
    where
        F: FnOnce(&T, usize) -> R,
    {
        let mut state = self.lock();

        let item = loop {
            if let Some(item) = state.items.pop_front() {
                break item;
            }
            coord_logs::trace!("channel empty, consumer waiting");
            state = match self.not_empty.wait(state) {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
        };

        let observed = observe(&item, state.items.len());

        drop(state);
        self.not_full.notify_one();
        (item, observed)
    }

    /// Number of items currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Largest length the channel has reached since it was created.
    #[must_use]
    pub fn peak_len(&self) -> usize {
        self.lock().peak
    }

    // Every critical section leaves `items` consistent before running caller
    // code, so a poisoned lock still guards valid state.
    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
