//! Delay queue for events that take effect on a future tick.
//!
//! Events are keyed by `(maturity_tick, sequence)`. The sequence is a
//! monotonic insertion counter, so events maturing on the same tick come out
//! in the order they were scheduled, never reordered.

use crate::coord::Coord;
use crate::sim::Ticks;
use crate::state::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A value queued for delivery to `target` on `maturity_tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub target: Coord,
    /// Block-local channel, set when a block addressed the event to itself.
    pub channel: Option<String>,
    pub maturity_tick: Ticks,
    pub value: Value,
    /// Position of the scheduling block. Equal to `target` for external
    /// stimuli scheduled through the engine.
    pub source: Coord,
    /// Assigned by the queue on scheduling.
    pub sequence: u64,
}

impl ScheduledEvent {
    pub fn new(target: Coord, maturity_tick: Ticks, value: impl Into<Value>) -> Self {
        Self {
            target,
            channel: None,
            maturity_tick,
            value: value.into(),
            source: target,
            sequence: 0,
        }
    }

    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    pub fn with_source(mut self, source: Coord) -> Self {
        self.source = source;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("event maturing at tick {maturity_tick} is not after current tick {current_tick}")]
    NotInFuture {
        maturity_tick: Ticks,
        current_tick: Ticks,
    },
    #[error("event sequence numbers are exhausted")]
    SequenceExhausted,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelayQueue {
    events: BTreeMap<(Ticks, u64), ScheduledEvent>,
    next_sequence: u64,
}

impl DelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that an event maturing at `maturity_tick` may be scheduled when
    /// the clock reads `clock`.
    pub fn check(maturity_tick: Ticks, clock: Ticks) -> Result<(), ScheduleError> {
        if maturity_tick <= clock {
            return Err(ScheduleError::NotInFuture {
                maturity_tick,
                current_tick: clock,
            });
        }
        Ok(())
    }

    /// Queue `event`, assigning it the next sequence number. Returns that
    /// sequence number.
    pub fn schedule(&mut self, event: ScheduledEvent, clock: Ticks) -> Result<u64, ScheduleError> {
        Self::check(event.maturity_tick, clock)?;
        self.enqueue(event)
    }

    /// Fail unless `count` more events can be numbered.
    pub fn reserve(&self, count: usize) -> Result<(), ScheduleError> {
        u64::try_from(count)
            .ok()
            .and_then(|n| self.next_sequence.checked_add(n))
            .map(|_| ())
            .ok_or(ScheduleError::SequenceExhausted)
    }

    /// Queue an event whose maturity tick has already been checked.
    pub(crate) fn enqueue(&mut self, mut event: ScheduledEvent) -> Result<u64, ScheduleError> {
        let sequence = self.next_sequence;
        self.next_sequence = sequence
            .checked_add(1)
            .ok_or(ScheduleError::SequenceExhausted)?;
        event.sequence = sequence;
        self.events.insert((event.maturity_tick, sequence), event);
        Ok(sequence)
    }

    /// Check a queue that came from outside the engine, such as a snapshot.
    ///
    /// Every key must match its event, nothing may mature before `clock`,
    /// and the counter must be past every sequence in use.
    pub(crate) fn verify(&self, clock: Ticks) -> Result<(), String> {
        for (&(tick, sequence), event) in &self.events {
            if tick != event.maturity_tick || sequence != event.sequence {
                return Err(format!(
                    "event keyed ({tick}, {sequence}) records ({}, {})",
                    event.maturity_tick, event.sequence
                ));
            }
            if tick < clock {
                return Err(format!(
                    "event {sequence} matures on tick {tick}, before clock {clock}"
                ));
            }
            if sequence >= self.next_sequence {
                return Err(format!(
                    "event {sequence} is not below next sequence {}",
                    self.next_sequence
                ));
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn set_next_sequence(&mut self, next_sequence: u64) {
        self.next_sequence = next_sequence;
    }

    /// Remove and return every event maturing exactly on `tick`, in sequence
    /// order.
    pub fn drain(&mut self, tick: Ticks) -> Vec<ScheduledEvent> {
        let keys: Vec<(Ticks, u64)> = self
            .events
            .range((tick, 0)..=(tick, u64::MAX))
            .map(|(k, _)| *k)
            .collect();
        keys.into_iter()
            .filter_map(|k| self.events.remove(&k))
            .collect()
    }

    /// Put drained events back, keeping their original sequence numbers.
    pub fn restore(&mut self, events: Vec<ScheduledEvent>) {
        for event in events {
            self.events
                .insert((event.maturity_tick, event.sequence), event);
        }
    }

    /// Earliest pending maturity tick.
    pub fn next_maturity(&self) -> Option<Ticks> {
        self.events.keys().next().map(|&(tick, _)| tick)
    }

    /// Pending events in `(maturity_tick, sequence)` order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.values()
    }

    /// Pending events addressed to `target`.
    pub fn pending_for(&self, target: Coord) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.values().filter(move |e| e.target == target)
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
