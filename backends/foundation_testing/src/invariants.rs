//! Checks over a recorded journal.
//!
//! Workers record their events inside the critical section the event
//! describes, so replaying the journal in sequence order reproduces the
//! order in which the protected operations happened. Each checker replays
//! the events of one pattern and reports the first inconsistency it finds.

use std::collections::{BTreeMap, HashMap};

use foundation_sync::journal::Event;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("item {item} was produced {produced} times but consumed {consumed} times")]
    Conservation {
        item: u64,
        produced: usize,
        consumed: usize,
    },

    #[error("take #{position} returned {found}, the channel's head was {expected}")]
    Order {
        position: usize,
        expected: u64,
        found: u64,
    },

    #[error("channel reported {len} items, capacity is {capacity}")]
    Capacity { len: usize, capacity: usize },

    #[error("event #{position} reported length {recorded}, replay expected {expected}")]
    LengthDrift {
        position: usize,
        expected: usize,
        recorded: usize,
    },

    #[error("writer {writer} entered while {readers} readers and {writers} writers were inside")]
    WriterOverlap {
        writer: usize,
        readers: usize,
        writers: usize,
    },

    #[error("reader {reader} entered while writer {writer} was inside")]
    ReaderOverlap { reader: usize, writer: usize },

    #[error("{role} {worker} acted outside a balanced bracket")]
    Unbalanced { role: &'static str, worker: usize },

    #[error("philosopher {seat} ate with forks {found:?}, its forks are {expected:?}")]
    WrongForks {
        seat: usize,
        found: (usize, usize),
        expected: (usize, usize),
    },

    #[error("philosopher {seat} picked up fork {fork} while philosopher {holder} held it")]
    SharedFork {
        seat: usize,
        fork: usize,
        holder: usize,
    },

    #[error("philosopher {seat} ate {meals} times, expected {rounds}")]
    MealCount {
        seat: usize,
        meals: usize,
        rounds: usize,
    },
}

/// Every produced item is consumed exactly once, and takes return items in
/// the exact order they were put.
///
/// # Errors
///
/// The first item whose counts differ, or the first take that did not return
/// the channel's head.
pub fn check_conservation(events: &[Event]) -> Result<(), Violation> {
    let mut produced = Vec::new();
    let mut consumed = Vec::new();
    for event in events {
        match *event {
            Event::Produced { item, .. } => produced.push(item),
            Event::Consumed { item, .. } => consumed.push(item),
            _ => {}
        }
    }

    let mut counts: BTreeMap<u64, (usize, usize)> = BTreeMap::new();
    for item in &produced {
        counts.entry(*item).or_default().0 += 1;
    }
    for item in &consumed {
        counts.entry(*item).or_default().1 += 1;
    }
    if let Some((item, (produced, consumed))) = counts.into_iter().find(|(_, (p, c))| p != c) {
        return Err(Violation::Conservation {
            item,
            produced,
            consumed,
        });
    }

    // Equal multisets; FIFO means equal sequences too.
    for (position, (expected, found)) in produced.into_iter().zip(consumed).enumerate() {
        if expected != found {
            return Err(Violation::Order {
                position,
                expected,
                found,
            });
        }
    }
    Ok(())
}

/// The channel never held more than `capacity` items, and every recorded
/// length agrees with a replay of the puts and takes before it.
///
/// # Errors
///
/// The first over-capacity length or the first drift from the replay.
pub fn check_capacity(events: &[Event], capacity: usize) -> Result<(), Violation> {
    let mut replayed: usize = 0;
    for (position, event) in events.iter().enumerate() {
        let (expected, recorded) = match *event {
            Event::Produced { len, .. } => (replayed + 1, len),
            Event::Consumed { len, .. } => (replayed.saturating_sub(1), len),
            _ => continue,
        };
        if recorded > capacity {
            return Err(Violation::Capacity {
                len: recorded,
                capacity,
            });
        }
        if recorded != expected {
            return Err(Violation::LengthDrift {
                position,
                expected,
                recorded,
            });
        }
        replayed = recorded;
    }
    Ok(())
}

/// No write overlaps another write or any read, and every read and write
/// happens inside its own bracket.
///
/// # Errors
///
/// The first overlap or unbalanced bracket.
pub fn check_gate_exclusion(events: &[Event]) -> Result<(), Violation> {
    let mut readers: Vec<usize> = Vec::new();
    let mut writer: Option<usize> = None;

    for event in events {
        match *event {
            Event::ReadBegin { reader, .. } => {
                if let Some(writer) = writer {
                    return Err(Violation::ReaderOverlap { reader, writer });
                }
                if readers.contains(&reader) {
                    return Err(Violation::Unbalanced {
                        role: "reader",
                        worker: reader,
                    });
                }
                readers.push(reader);
            }
            Event::Read { reader, .. } if !readers.contains(&reader) => {
                return Err(Violation::Unbalanced {
                    role: "reader",
                    worker: reader,
                });
            }
            Event::ReadEnd { reader } => {
                let Some(position) = readers.iter().position(|inside| *inside == reader) else {
                    return Err(Violation::Unbalanced {
                        role: "reader",
                        worker: reader,
                    });
                };
                readers.swap_remove(position);
            }
            Event::WriteBegin { writer: entering } => {
                if !readers.is_empty() || writer.is_some() {
                    return Err(Violation::WriterOverlap {
                        writer: entering,
                        readers: readers.len(),
                        writers: usize::from(writer.is_some()),
                    });
                }
                writer = Some(entering);
            }
            Event::Wrote { writer: acting, .. } if writer != Some(acting) => {
                return Err(Violation::Unbalanced {
                    role: "writer",
                    worker: acting,
                });
            }
            Event::WriteEnd { writer: leaving } => {
                if writer != Some(leaving) {
                    return Err(Violation::Unbalanced {
                        role: "writer",
                        worker: leaving,
                    });
                }
                writer = None;
            }
            _ => {}
        }
    }

    if let Some(&reader) = readers.first() {
        return Err(Violation::Unbalanced {
            role: "reader",
            worker: reader,
        });
    }
    if let Some(writer) = writer {
        return Err(Violation::Unbalanced {
            role: "writer",
            worker: writer,
        });
    }
    Ok(())
}

/// Every meal used exactly the seat's two forks, no fork was held by two
/// seats at once, and every seat ate `rounds` times.
///
/// # Errors
///
/// The first wrong fork pair, shared fork or short meal count.
pub fn check_ring_pairing(
    events: &[Event],
    ring_size: usize,
    rounds: usize,
) -> Result<(), Violation> {
    let mut holders: HashMap<usize, usize> = HashMap::new();
    let mut meals = vec![0usize; ring_size];

    for event in events {
        match *event {
            Event::Eating { seat, forks, .. } => {
                let expected = (seat, (seat + 1) % ring_size);
                if forks != expected {
                    return Err(Violation::WrongForks {
                        seat,
                        found: forks,
                        expected,
                    });
                }
                for fork in [forks.0, forks.1] {
                    if let Some(&holder) = holders.get(&fork) {
                        return Err(Violation::SharedFork { seat, fork, holder });
                    }
                    holders.insert(fork, seat);
                }
                if let Some(count) = meals.get_mut(seat) {
                    *count += 1;
                }
            }
            Event::PutDown { seat, .. } => {
                holders.retain(|_, holder| *holder != seat);
            }
            _ => {}
        }
    }

    for (seat, meals) in meals.into_iter().enumerate() {
        if meals != rounds {
            return Err(Violation::MealCount {
                seat,
                meals,
                rounds,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn produced(producer: usize, item: u64, len: usize) -> Event {
        Event::Produced {
            producer,
            item,
            len,
        }
    }

    fn consumed(consumer: usize, item: u64, len: usize) -> Event {
        Event::Consumed {
            consumer,
            item,
            len,
        }
    }

    #[test]
    fn clean_channel_history_passes() {
        let events = [
            produced(1, 100, 1),
            produced(2, 200, 2),
            consumed(1, 100, 1),
            produced(1, 101, 2),
            consumed(2, 200, 1),
            consumed(1, 101, 0),
        ];
        assert_eq!(check_conservation(&events), Ok(()));
        assert_eq!(check_capacity(&events, 2), Ok(()));
        assert_eq!(
            check_capacity(&events, 1),
            Err(Violation::Capacity {
                len: 2,
                capacity: 1
            })
        );
    }

    #[test]
    fn lost_and_reordered_items_are_caught() {
        let lost = [produced(1, 100, 1), produced(1, 101, 2), consumed(1, 100, 1)];
        assert_eq!(
            check_conservation(&lost),
            Err(Violation::Conservation {
                item: 101,
                produced: 1,
                consumed: 0
            })
        );

        let reordered = [
            produced(1, 100, 1),
            produced(1, 101, 2),
            consumed(1, 101, 1),
            consumed(1, 100, 0),
        ];
        assert_eq!(
            check_conservation(&reordered),
            Err(Violation::Order {
                position: 0,
                expected: 100,
                found: 101
            })
        );
    }

    #[test]
    fn length_drift_is_caught() {
        let events = [produced(1, 100, 1), produced(1, 101, 1)];
        assert_eq!(
            check_capacity(&events, 5),
            Err(Violation::LengthDrift {
                position: 1,
                expected: 2,
                recorded: 1
            })
        );
    }

    #[test]
    fn overlapping_writer_is_caught() {
        let events = [
            Event::ReadBegin {
                reader: 1,
                active: 1,
            },
            Event::WriteBegin { writer: 1 },
        ];
        assert_eq!(
            check_gate_exclusion(&events),
            Err(Violation::WriterOverlap {
                writer: 1,
                readers: 1,
                writers: 0
            })
        );
    }

    #[test]
    fn shared_readers_then_writer_pass() {
        let events = [
            Event::ReadBegin {
                reader: 1,
                active: 1,
            },
            Event::ReadBegin {
                reader: 2,
                active: 2,
            },
            Event::Read {
                reader: 2,
                value: 0,
            },
            Event::ReadEnd { reader: 1 },
            Event::ReadEnd { reader: 2 },
            Event::WriteBegin { writer: 1 },
            Event::Wrote {
                writer: 1,
                value: 1,
            },
            Event::WriteEnd { writer: 1 },
        ];
        assert_eq!(check_gate_exclusion(&events), Ok(()));
        assert!(matches!(
            check_gate_exclusion(&events[..2]),
            Err(Violation::Unbalanced { role: "reader", .. })
        ));
    }

    #[test]
    fn neighbours_cannot_eat_together() {
        let events = [
            Event::Eating {
                seat: 0,
                round: 0,
                forks: (0, 1),
            },
            Event::Eating {
                seat: 1,
                round: 0,
                forks: (1, 2),
            },
        ];
        assert_eq!(
            check_ring_pairing(&events, 3, 1),
            Err(Violation::SharedFork {
                seat: 1,
                fork: 1,
                holder: 0
            })
        );
    }

    #[test]
    fn meal_counts_and_fork_pairs_are_checked() {
        let events = [
            Event::Eating {
                seat: 0,
                round: 0,
                forks: (0, 1),
            },
            Event::PutDown { seat: 0, round: 0 },
            Event::Eating {
                seat: 1,
                round: 0,
                forks: (1, 0),
            },
            Event::PutDown { seat: 1, round: 0 },
        ];
        assert_eq!(check_ring_pairing(&events, 2, 1), Ok(()));
        assert_eq!(
            check_ring_pairing(&events, 2, 2),
            Err(Violation::MealCount {
                seat: 0,
                meals: 1,
                rounds: 2
            })
        );
        assert_eq!(
            check_ring_pairing(&events, 3, 1),
            Err(Violation::WrongForks {
                seat: 1,
                found: (1, 0),
                expected: (1, 2)
            })
        );
    }
}
