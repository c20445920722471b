//! Worker loops. Each one talks to exactly one component, records its events
//! while still inside the matching critical section, and returns the number
//! of operations it completed.

use crate::channel::BoundedChannel;
use crate::config::Pacing;
use crate::gate::SharedReadGate;
use crate::journal::{Event, Journal};
use crate::ring::{PhilosopherState, ResourceRing, Seat};

/// Item number `iteration` of producer `producer` (1-based).
#[must_use]
pub const fn item_for(producer: usize, iteration: usize) -> u64 {
    (producer as u64)
        .wrapping_mul(100)
        .wrapping_add(iteration as u64)
}

pub(crate) fn produce(
    channel: &BoundedChannel<u64>,
    journal: &Journal,
    pacing: &Pacing,
    producer: usize,
    iterations: usize,
) -> u64 {
    for iteration in 0..iterations {
        channel.put_with(item_for(producer, iteration), |item, len| {
            journal.record(Event::Produced {
                producer,
                item: *item,
                len,
            });
        });
        Pacing::pause(pacing.produce_ms);
    }
    iterations as u64
}

pub(crate) fn consume(
    channel: &BoundedChannel<u64>,
    journal: &Journal,
    pacing: &Pacing,
    consumer: usize,
    quota: usize,
) -> u64 {
    for _ in 0..quota {
        channel.take_with(|item, len| {
            journal.record(Event::Consumed {
                consumer,
                item: *item,
                len,
            });
        });
        Pacing::pause(pacing.consume_ms);
    }
    quota as u64
}

pub(crate) fn read(
    gate: &SharedReadGate<u64>,
    journal: &Journal,
    pacing: &Pacing,
    reader: usize,
    iterations: usize,
) -> u64 {
    for _ in 0..iterations {
        let guard = gate.begin_read();
        journal.record(Event::ReadBegin {
            reader,
            active: guard.admitted_with(),
        });
        journal.record(Event::Read {
            reader,
            value: *guard.read(),
        });
        Pacing::pause(pacing.read_ms);
        journal.record(Event::ReadEnd { reader });
        guard.end();

        Pacing::pause(pacing.after_read_ms);
    }
    iterations as u64
}

pub(crate) fn write(
    gate: &SharedReadGate<u64>,
    journal: &Journal,
    pacing: &Pacing,
    writer: usize,
    iterations: usize,
) -> u64 {
    for _ in 0..iterations {
        let mut value = gate.write();
        journal.record(Event::WriteBegin { writer });
        *value += 1;
        journal.record(Event::Wrote {
            writer,
            value: *value,
        });
        Pacing::pause(pacing.write_ms);
        journal.record(Event::WriteEnd { writer });
        drop(value);

        Pacing::pause(pacing.after_write_ms);
    }
    iterations as u64
}

/// Plays `rounds` rounds of think, get hungry, eat at `seat`. Returns the
/// number of meals eaten.
pub(crate) fn dine(
    ring: &ResourceRing,
    journal: &Journal,
    pacing: &Pacing,
    seat: Seat,
    rounds: usize,
) -> u64 {
    let index = seat.index();
    let mut state = PhilosopherState::Thinking;
    let mut round = 0;
    let mut meals = 0;
    // Filled by the Hungry -> Eating transition, so Eating always owns both forks.
    let mut served = None;

    loop {
        match state {
            PhilosopherState::Thinking => {
                journal.record(Event::Thinking { seat: index, round });
                Pacing::pause(pacing.think_ms);
            }
            PhilosopherState::Hungry => {
                journal.record(Event::Hungry { seat: index, round });
                served = Some(ring.pick_up(seat));
            }
            PhilosopherState::Eating => {
                if let Some(meal) = served.take() {
                    journal.record(Event::Eating {
                        seat: index,
                        round,
                        forks: meal.forks(),
                    });
                    Pacing::pause(pacing.eat_ms);
                    journal.record(Event::PutDown { seat: index, round });
                    drop(meal);
                    meals += 1;
                }

                Pacing::pause(pacing.after_eat_ms);
            }
            PhilosopherState::Done => {
                journal.record(Event::Finished { seat: index });
                return meals;
            }
        }

        let next = state.advance(round, rounds);
        if state == PhilosopherState::Eating {
            round += 1;
        }
        state = next;
    }
}
