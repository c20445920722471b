//! Exhaustive exploration of the fork-acquisition protocol.
//!
//! Each seat is a three-step program: pick up its first fork, pick up its
//! second fork, put both down. A step that needs a fork someone else holds
//! is blocked. Starting from an empty table, every interleaving of steps is
//! explored breadth first. A reachable state in which no seat can step is a
//! deadlock.
//!
//! Rounds are not modelled: a seat that puts its forks down is back where it
//! started, so the reachable state space already covers every round.

use std::collections::{HashSet, VecDeque};

/// Where a seat is in its acquisition program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Empty,
    HoldsFirst,
    HoldsBoth,
}

/// Which fork a seat reaches for first and second, given
/// `(seat, ring_size)`.
pub type AcquisitionRule = fn(usize, usize) -> (usize, usize);

/// The rule the real ring uses.
pub const PARITY_RULE: AcquisitionRule = foundation_sync::ring::acquisition_order;

/// Everyone reaches left first. Deadlocks on every ring.
pub const NAIVE_RULE: AcquisitionRule = naive_order;

fn naive_order(seat: usize, ring_size: usize) -> (usize, usize) {
    (seat, (seat + 1) % ring_size)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exploration {
    pub ring_size: usize,
    pub states: usize,
    /// Every reachable state where no seat can step.
    pub deadlocks: Vec<Vec<Phase>>,
    /// Most seats ever holding both forks at once.
    pub max_eating: usize,
}

impl Exploration {
    #[must_use]
    pub fn is_deadlock_free(&self) -> bool {
        self.deadlocks.is_empty()
    }
}

/// Explores every interleaving of `ring_size` seats following `rule`.
///
/// # Panics
///
/// Panics if a state gives one fork to two seats, which would mean the
/// model itself is broken.
#[must_use]
pub fn explore(ring_size: usize, rule: AcquisitionRule) -> Exploration {
    let orders: Vec<_> = (0..ring_size).map(|seat| rule(seat, ring_size)).collect();

    let start = vec![Phase::Empty; ring_size];
    let mut seen = HashSet::from([start.clone()]);
    let mut frontier = VecDeque::from([start]);
    let mut deadlocks = Vec::new();
    let mut max_eating = 0;

    while let Some(state) = frontier.pop_front() {
        let holders = fork_holders(&state, &orders);
        let eating = state
            .iter()
            .filter(|phase| **phase == Phase::HoldsBoth)
            .count();
        max_eating = max_eating.max(eating);

        let mut stepped = false;
        for seat in 0..ring_size {
            let (first, second) = orders[seat];
            let next_phase = match state[seat] {
                Phase::Empty if holders[first].is_none() => Phase::HoldsFirst,
                Phase::HoldsFirst if holders[second].is_none() => Phase::HoldsBoth,
                Phase::HoldsBoth => Phase::Empty,
                Phase::Empty | Phase::HoldsFirst => continue,
            };
            stepped = true;

            let mut next = state.clone();
            next[seat] = next_phase;
            if seen.insert(next.clone()) {
                frontier.push_back(next);
            }
        }

        if !stepped {
            deadlocks.push(state);
        }
    }

    Exploration {
        ring_size,
        states: seen.len(),
        deadlocks,
        max_eating,
    }
}

fn fork_holders(state: &[Phase], orders: &[(usize, usize)]) -> Vec<Option<usize>> {
    let mut holders = vec![None; state.len()];
    for (seat, phase) in state.iter().enumerate() {
        let (first, second) = orders[seat];
        let held: &[usize] = match phase {
            Phase::Empty => &[],
            Phase::HoldsFirst => &[first],
            Phase::HoldsBoth => &[first, second],
        };
        for &fork in held {
            assert!(holders[fork].is_none(), "fork {fork} held twice");
            holders[fork] = Some(seat);
        }
    }
    holders
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_seats_have_a_tiny_safe_state_space() {
        let exploration = explore(2, PARITY_RULE);
        assert!(exploration.is_deadlock_free());
        // Empty/empty, one seat holding fork 0, one seat eating.
        assert_eq!(exploration.states, 5);
        assert_eq!(exploration.max_eating, 1);
    }

    #[test]
    fn naive_rule_deadlocks_with_everyone_holding_one_fork() {
        let exploration = explore(3, NAIVE_RULE);
        assert_eq!(exploration.deadlocks, vec![vec![Phase::HoldsFirst; 3]]);
    }

    #[test]
    fn five_seats_let_two_eat_at_once() {
        let exploration = explore(5, PARITY_RULE);
        assert!(exploration.is_deadlock_free());
        assert_eq!(exploration.max_eating, 2);
    }
}
