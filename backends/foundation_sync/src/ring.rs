//! A ring of exclusive resources where every seat needs both of its
//! neighbours at once.
//!
//! Seat `i` sits between fork `i` (its left) and fork `(i + 1) % n` (its
//! right). If every seat reached for its left fork first, all of them could
//! end up holding one fork and waiting on the next, forever. Seats with an
//! even index reach left then right, odd seats reach right then left. With
//! that split, seat 0 and seat 1 (or seat 2) always want the same fork first
//! for any ring of two or more seats, so the ring can never fill up with
//! one-fork holders and no wait cycle can close.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::errors::{ConfigError, ConfigResult};

const FREE: usize = usize::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    Even,
    Odd,
}

/// Lifecycle of a ring participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhilosopherState {
    Thinking,
    Hungry,
    Eating,
    Done,
}

impl PhilosopherState {
    /// Next state once the current one has run its course. `round` is the
    /// zero-based round being played and `rounds` the total to play.
    #[must_use]
    pub const fn advance(self, round: usize, rounds: usize) -> Self {
        match self {
            PhilosopherState::Thinking => PhilosopherState::Hungry,
            PhilosopherState::Hungry => PhilosopherState::Eating,
            PhilosopherState::Eating if round + 1 < rounds => PhilosopherState::Thinking,
            PhilosopherState::Eating | PhilosopherState::Done => PhilosopherState::Done,
        }
    }
}

/// Forks a seat picks up, in the order it picks them up.
///
/// This is the whole deadlock-avoidance rule. It depends on the seat's parity
/// and nothing else.
#[must_use]
pub const fn acquisition_order(index: usize, ring_size: usize) -> (usize, usize) {
    let left = index;
    let right = (index + 1) % ring_size;
    if index % 2 == 0 {
        (left, right)
    } else {
        (right, left)
    }
}

/// A position at the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seat {
    index: usize,
    ring_size: usize,
}

impl Seat {
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn left(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn right(&self) -> usize {
        (self.index + 1) % self.ring_size
    }

    #[must_use]
    pub const fn parity(&self) -> Parity {
        if self.index % 2 == 0 {
            Parity::Even
        } else {
            Parity::Odd
        }
    }

    #[must_use]
    pub const fn acquisition_order(&self) -> (usize, usize) {
        acquisition_order(self.index, self.ring_size)
    }
}

#[derive(Debug, Default)]
struct ForkSlot {
    uses: u64,
}

struct Fork {
    slot: Mutex<ForkSlot>,
    // Written only by the seat holding `slot`; read by anyone for inspection.
    holder: AtomicUsize,
}

impl Fork {
    fn new() -> Self {
        Self {
            slot: Mutex::new(ForkSlot::default()),
            holder: AtomicUsize::new(FREE),
        }
    }

    fn pick_up(&self, seat: usize) -> HeldFork<'_> {
        let mut slot = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.uses += 1;
        self.holder.store(seat, Ordering::Release);
        HeldFork {
            fork: self,
            _slot: slot,
        }
    }

    fn holder(&self) -> Option<usize> {
        match self.holder.load(Ordering::Acquire) {
            FREE => None,
            seat => Some(seat),
        }
    }
}

struct HeldFork<'a> {
    fork: &'a Fork,
    _slot: MutexGuard<'a, ForkSlot>,
}

impl Drop for HeldFork<'_> {
    fn drop(&mut self) {
        // Runs before `_slot` unlocks, so nobody sees a stale holder.
        self.fork.holder.store(FREE, Ordering::Release);
    }
}

/// `n` independently lockable forks arranged in a cycle.
pub struct ResourceRing {
    forks: Vec<Fork>,
}

impl ResourceRing {
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for rings with fewer than two seats;
    /// a lone seat would need the same fork twice.
    pub fn new(ring_size: usize) -> ConfigResult<Self> {
        if ring_size < 2 {
            return Err(ConfigError::invalid(
                "ring.ring_size",
                format!("needs at least 2 seats, got {ring_size}"),
            ));
        }
        Ok(Self {
            forks: (0..ring_size).map(|_| Fork::new()).collect(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.forks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.forks.is_empty()
    }

    #[must_use]
    pub fn seat(&self, index: usize) -> Option<Seat> {
        (index < self.len()).then_some(Seat {
            index,
            ring_size: self.len(),
        })
    }

    pub fn seats(&self) -> impl Iterator<Item = Seat> + '_ {
        (0..self.len()).filter_map(|index| self.seat(index))
    }

    /// Picks up both forks of `seat` in parity order, blocking on each until
    /// it is free. The forks go back down together when the [`Meal`] drops.
    pub fn pick_up(&self, seat: Seat) -> Meal<'_> {
        debug_assert_eq!(seat.ring_size, self.len(), "seat belongs to another ring");

        let (first, second) = seat.acquisition_order();
        let first = self.forks[first].pick_up(seat.index);
        coord_logs::trace!(seat = seat.index, "first fork in hand");
        let second = self.forks[second].pick_up(seat.index);

        Meal {
            seat,
            first,
            second,
        }
    }

    /// Seat currently holding `fork`, if any.
    #[must_use]
    pub fn holder(&self, fork: usize) -> Option<usize> {
        self.forks.get(fork).and_then(Fork::holder)
    }

    /// Times `fork` has been picked up. Blocks while the fork is held.
    #[must_use]
    pub fn uses(&self, fork: usize) -> Option<u64> {
        self.forks.get(fork).map(|fork| match fork.slot.lock() {
            Ok(slot) => slot.uses,
            Err(poisoned) => poisoned.into_inner().uses,
        })
    }
}

impl fmt::Debug for ResourceRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let holders: Vec<_> = self.forks.iter().map(Fork::holder).collect();
        f.debug_struct("ResourceRing")
            .field("holders", &holders)
            .finish()
    }
}

/// Both forks of one seat, held together.
#[must_use = "dropping the meal puts both forks down"]
pub struct Meal<'a> {
    seat: Seat,
    first: HeldFork<'a>,
    second: HeldFork<'a>,
}

impl Meal<'_> {
    #[must_use]
    pub const fn seat(&self) -> Seat {
        self.seat
    }

    /// `(left, right)` forks of the eating seat.
    #[must_use]
    pub const fn forks(&self) -> (usize, usize) {
        (self.seat.left(), self.seat.right())
    }

    /// Whether both forks are recorded as held by this seat.
    #[must_use]
    pub fn holds_both(&self) -> bool {
        self.first.fork.holder() == Some(self.seat.index)
            && self.second.fork.holder() == Some(self.seat.index)
    }
}

impl fmt::Debug for Meal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meal")
            .field("seat", &self.seat.index)
            .field("forks", &self.forks())
            .finish()
    }
}
