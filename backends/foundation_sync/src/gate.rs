//! Reader-preferring access gate over a single shared value.
//!
//! Readers share the value, a writer gets it alone. The writer exclusion is a
//! "room" that is either empty, held by one writer, or held by the group of
//! active readers as a whole. The first reader to arrive takes the room on
//! behalf of everyone reading, the last one to leave hands it back. Both
//! transitions happen under the reader-count lock, so the count and the room
//! never disagree from another reader's point of view.
//!
//! While at least one reader is inside, newly arriving readers only touch the
//! count and walk straight in, even if writers are queued on the room. Writers
//! therefore wait for the reader count to drop to zero and can starve under a
//! steady stream of readers. That is the policy, not an accident.
//!
//! # Examples
//!
//! ```
//! use foundation_sync::gate::SharedReadGate;
//!
//! let gate = SharedReadGate::new(0u64);
//!
//! {
//!     let first = gate.begin_read();
//!     let second = gate.begin_read();
//!     assert_eq!(*first.read(), 0);
//!     assert_eq!(*second, 0);
//! }
//!
//! *gate.write() += 1;
//! assert_eq!(*gate.begin_read(), 1);
//! ```

use core::cell::UnsafeCell;
use core::fmt;
use core::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard};

/// Who currently holds the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// The group of active readers.
    Readers,
    Writer,
}

/// A reader/writer gate with reader preference.
///
/// The read bracket is the [`ReadGuard`] returned by
/// [`begin_read`](Self::begin_read); dropping it ends the read. Brackets are
/// therefore always balanced, including when a reader unwinds.
pub struct SharedReadGate<T: ?Sized> {
    readers: Mutex<usize>,
    room: Room,
    value: UnsafeCell<T>,
}

// SAFETY: the value is only reached through guards. A `WriteGuard` exists only
// while the room is held by a writer, which excludes every other guard. A
// `ReadGuard` exists only while the room is held by the reader group, which
// excludes writers but lets several readers share `&T`, hence `T: Sync`.
unsafe impl<T: ?Sized + Send> Send for SharedReadGate<T> {}
unsafe impl<T: ?Sized + Send + Sync> Sync for SharedReadGate<T> {}

struct Room {
    state: Mutex<RoomState>,
    vacated: Condvar,
}

#[derive(Default)]
struct RoomState {
    occupant: Option<Occupant>,
    waiting_writers: usize,
}

impl Room {
    fn new() -> Self {
        Self {
            state: Mutex::new(RoomState::default()),
            vacated: Condvar::new(),
        }
    }

    fn acquire(&self, occupant: Occupant) {
        let mut state = self.lock();

        if state.occupant.is_some() {
            if occupant == Occupant::Writer {
                state.waiting_writers += 1;
            }
            while state.occupant.is_some() {
                coord_logs::trace!(?occupant, "room taken, waiting");
                state = match self.vacated.wait(state) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
            }
            if occupant == Occupant::Writer {
                state.waiting_writers -= 1;
            }
        }

        state.occupant = Some(occupant);
    }

    fn release(&self) {
        let mut state = self.lock();
        state.occupant = None;
        drop(state);
        self.vacated.notify_one();
    }

    fn lock(&self) -> MutexGuard<'_, RoomState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T> SharedReadGate<T> {
    pub fn new(value: T) -> Self {
        Self {
            readers: Mutex::new(0),
            room: Room::new(),
            value: UnsafeCell::new(value),
        }
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }
}

impl<T: ?Sized> SharedReadGate<T> {
    /// Enters a read bracket, waiting only if a writer currently holds the
    /// room and no other reader is inside.
    pub fn begin_read(&self) -> ReadGuard<'_, T> {
        let mut readers = self.lock_readers();
        *readers += 1;
        if *readers == 1 {
            // Other readers queue on the count lock while we wait here.
            self.room.acquire(Occupant::Readers);
        }
        let admitted_with = *readers;
        drop(readers);

        ReadGuard {
            gate: self,
            admitted_with,
        }
    }

    /// Takes exclusive access, waiting until no reader and no other writer
    /// is inside.
    pub fn write(&self) -> WriteGuard<'_, T> {
        self.room.acquire(Occupant::Writer);
        WriteGuard { gate: self }
    }

    /// Runs `f` inside a read bracket.
    pub fn read_with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let guard = self.begin_read();
        f(guard.read())
    }

    /// Runs `f` with exclusive access.
    pub fn write_with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.write();
        f(&mut guard)
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    /// Readers currently inside, including one that is still waiting for a
    /// writer to leave. Blocks while that first reader waits.
    #[must_use]
    pub fn active_readers(&self) -> usize {
        *self.lock_readers()
    }

    /// Writers blocked on the room.
    #[must_use]
    pub fn waiting_writers(&self) -> usize {
        self.room.lock().waiting_writers
    }

    #[must_use]
    pub fn occupant(&self) -> Option<Occupant> {
        self.room.lock().occupant
    }

    fn end_read(&self) {
        let mut readers = self.lock_readers();
        debug_assert!(*readers > 0, "read bracket closed without being opened");
        *readers -= 1;
        if *readers == 0 {
            self.room.release();
        }
    }

    fn lock_readers(&self) -> MutexGuard<'_, usize> {
        match self.readers.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T: Default> Default for SharedReadGate<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ?Sized> fmt::Debug for SharedReadGate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedReadGate")
            .field("occupant", &self.occupant())
            .field("waiting_writers", &self.waiting_writers())
            .finish_non_exhaustive()
    }
}

/// An open read bracket. Dropping it ends the read, and the last reader out
/// lets writers back in.
#[must_use = "dropping the guard immediately ends the read"]
pub struct ReadGuard<'a, T: ?Sized + 'a> {
    gate: &'a SharedReadGate<T>,
    admitted_with: usize,
}

impl<T: ?Sized> ReadGuard<'_, T> {
    /// Observes the shared value.
    pub fn read(&self) -> &T {
        self
    }

    /// Active readers right after this one was admitted, itself included.
    #[must_use]
    pub const fn admitted_with(&self) -> usize {
        self.admitted_with
    }

    /// Ends the read bracket.
    pub fn end(self) {}
}

impl<T: ?Sized> Deref for ReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the reader group holds the room for as long as any
        // `ReadGuard` is alive, so no `WriteGuard` can exist.
        unsafe { &*self.gate.value.get() }
    }
}

impl<T: ?Sized> Drop for ReadGuard<'_, T> {
    fn drop(&mut self) {
        self.gate.end_read();
    }
}

/// Exclusive access to the shared value. Dropping it lets the next writer or
/// the next group of readers in.
#[must_use = "dropping the guard immediately ends the write"]
pub struct WriteGuard<'a, T: ?Sized + 'a> {
    gate: &'a SharedReadGate<T>,
}

impl<T: ?Sized> Deref for WriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this writer holds the room alone.
        unsafe { &*self.gate.value.get() }
    }
}

impl<T: ?Sized> DerefMut for WriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: this writer holds the room alone.
        unsafe { &mut *self.gate.value.get() }
    }
}

impl<T: ?Sized> Drop for WriteGuard<'_, T> {
    fn drop(&mut self) {
        self.gate.room.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn wait_for(mut condition: impl FnMut() -> bool) {
        while !condition() {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn readers_share_the_room() {
        let gate = SharedReadGate::new(5u64);

        let first = gate.begin_read();
        let second = gate.begin_read();
        assert_eq!(first.admitted_with(), 1);
        assert_eq!(second.admitted_with(), 2);
        assert_eq!(gate.occupant(), Some(Occupant::Readers));
        assert_eq!(*first + *second, 10);

        first.end();
        assert_eq!(gate.occupant(), Some(Occupant::Readers));
        drop(second);
        assert_eq!(gate.occupant(), None);
        assert_eq!(gate.active_readers(), 0);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn writer_waits_for_the_last_reader() {
        let gate = Arc::new(SharedReadGate::new(0u64));
        let reader = gate.begin_read();

        let writer = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                gate.write_with(|value| {
                    *value += 1;
                    *value
                })
            })
        };

        wait_for(|| gate.waiting_writers() == 1);
        assert!(!writer.is_finished());
        assert_eq!(*reader, 0);

        drop(reader);
        assert_eq!(writer.join().unwrap(), 1);
        assert_eq!(gate.waiting_writers(), 0);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn new_reader_overtakes_a_waiting_writer() {
        let gate = Arc::new(SharedReadGate::new(0u64));
        let admissions = Arc::new(Mutex::new(Vec::new()));

        let first = gate.begin_read();
        admissions.lock().unwrap().push("reader-1");

        let writer = {
            let gate = Arc::clone(&gate);
            let admissions = Arc::clone(&admissions);
            thread::spawn(move || {
                let mut guard = gate.write();
                admissions.lock().unwrap().push("writer");
                *guard += 1;
            })
        };
        wait_for(|| gate.waiting_writers() == 1);

        let second = gate.begin_read();
        admissions.lock().unwrap().push("reader-2");
        assert_eq!(second.admitted_with(), 2);
        assert_eq!(gate.waiting_writers(), 1);

        drop(first);
        drop(second);
        writer.join().unwrap();

        assert_eq!(
            *admissions.lock().unwrap(),
            vec!["reader-1", "reader-2", "writer"]
        );
        assert_eq!(gate.read_with(|value| *value), 1);
    }

    #[test]
    #[ntest::timeout(5000)]
    fn reader_waits_for_an_active_writer() {
        let gate = Arc::new(SharedReadGate::new(0u64));
        let mut guard = gate.write();
        assert_eq!(gate.occupant(), Some(Occupant::Writer));

        let reader = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.read_with(|value| *value))
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!reader.is_finished());

        *guard = 42;
        drop(guard);
        assert_eq!(reader.join().unwrap(), 42);
    }

    #[test]
    #[ntest::timeout(10000)]
    fn writers_exclude_each_other() {
        let gate = Arc::new(SharedReadGate::new(0u64));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gate = Arc::clone(&gate);
                thread::spawn(move || {
                    for _ in 0..250 {
                        let mut guard = gate.write();
                        let seen = *guard;
                        thread::yield_now();
                        *guard = seen + 1;
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let gate = Arc::into_inner(gate).unwrap();
        assert_eq!(gate.into_inner(), 1000);
    }

    #[test]
    fn panicking_reader_still_closes_its_bracket() {
        let gate = Arc::new(SharedReadGate::new(0u64));
        let reader = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || {
                let _guard = gate.begin_read();
                panic!("reader failed mid-read");
            })
        };
        assert!(reader.join().is_err());

        assert_eq!(gate.active_readers(), 0);
        *gate.write() += 1;
        assert_eq!(gate.read_with(|value| *value), 1);
    }
}
