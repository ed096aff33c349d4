//! Discrete-event simulation clock.
//!
//! Time is simulation milliseconds since the start of the session. Events are
//! popped in timestamp order; ties are broken by [`EventKind`] order and then by
//! scheduling order, so a position tick always lands before a proximity check
//! scheduled for the same instant.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

pub const ONE_SEC_MS: u64 = 1000;

/// Event kinds, in tie-break order for events sharing a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// Drift every driver toward its target.
    PositionTick,
    /// Try to match the subject ride to a free driver.
    TryMatch,
    /// Check the subject ride's driver against pickup/dropoff.
    ProximityCheck,
}

/// The entity an event is about. Global events (position ticks) carry none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSubject {
    Ride(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

/// Heap entry; `seq` keeps same-time, same-kind events FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scheduled {
    event: Event,
    seq: u64,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so BinaryHeap behaves as a min-heap.
        other
            .event
            .timestamp
            .cmp(&self.event.timestamp)
            .then_with(|| other.event.kind.cmp(&self.event.kind))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being processed by the schedule.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

#[derive(Debug, Default, Resource)]
pub struct SimulationClock {
    now: u64,
    /// Wall-clock time (Unix ms) that simulation time 0 corresponds to.
    epoch_ms: u64,
    next_seq: u64,
    events: BinaryHeap<Scheduled>,
}

impl SimulationClock {
    pub fn with_epoch(epoch_ms: u64) -> Self {
        Self {
            epoch_ms,
            ..Self::default()
        }
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn epoch_ms(&self) -> u64 {
        self.epoch_ms
    }

    pub fn sim_to_real_ms(&self, sim_ms: u64) -> u64 {
        self.epoch_ms.saturating_add(sim_ms)
    }

    pub fn real_to_sim_ms(&self, real_ms: u64) -> Option<u64> {
        real_ms.checked_sub(self.epoch_ms)
    }

    pub fn schedule(&mut self, event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Scheduled { event, seq });
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule(Event {
            timestamp,
            kind,
            subject,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now.saturating_add(delay_ms), kind, subject);
    }

    pub fn schedule_in_secs(&mut self, secs: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_in(secs.saturating_mul(ONE_SEC_MS), kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let scheduled = self.events.pop()?;
        self.now = scheduled.event.timestamp;
        Some(scheduled.event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|s| s.event.timestamp)
    }

    /// Whether an event of `kind` about `subject` is still pending.
    pub fn has_pending(&self, kind: EventKind, subject: Option<EventSubject>) -> bool {
        self.events
            .iter()
            .any(|s| s.event.kind == kind && s.event.subject == subject)
    }

    /// Drops every pending event about `subject`. Returns how many were removed.
    pub fn cancel_subject(&mut self, subject: EventSubject) -> usize {
        let before = self.events.len();
        self.events.retain(|s| s.event.subject != Some(subject));
        before - self.events.len()
    }

    /// Drops every pending event (simulation teardown).
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn pending_event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_pops_events_in_time_order() {
        let mut clock = SimulationClock::default();
        clock.schedule_at(20, EventKind::ProximityCheck, None);
        clock.schedule_at(5, EventKind::PositionTick, None);
        clock.schedule_at(20, EventKind::PositionTick, None);
        clock.schedule_at(10, EventKind::TryMatch, None);

        let first = clock.pop_next().expect("first event");
        assert_eq!(first.timestamp, 5);
        assert_eq!(clock.now(), 5);

        let second = clock.pop_next().expect("second event");
        assert_eq!(second.timestamp, 10);
        assert_eq!(clock.now(), 10);

        let third = clock.pop_next().expect("third event");
        assert_eq!(third.timestamp, 20);
        assert_eq!(third.kind, EventKind::PositionTick);
        let fourth = clock.pop_next().expect("fourth event");
        assert_eq!(fourth.kind, EventKind::ProximityCheck);

        assert!(clock.pop_next().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn same_kind_same_time_is_fifo() {
        let mut clock = SimulationClock::default();
        let a = EventSubject::Ride(Entity::from_raw(1));
        let b = EventSubject::Ride(Entity::from_raw(2));
        clock.schedule_at(3, EventKind::TryMatch, Some(a));
        clock.schedule_at(3, EventKind::TryMatch, Some(b));

        assert_eq!(clock.pop_next().and_then(|e| e.subject), Some(a));
        assert_eq!(clock.pop_next().and_then(|e| e.subject), Some(b));
    }

    #[test]
    fn cancel_subject_removes_only_that_subject() {
        let mut clock = SimulationClock::default();
        let ride = EventSubject::Ride(Entity::from_raw(9));
        clock.schedule_in(1000, EventKind::PositionTick, None);
        clock.schedule_in(1500, EventKind::TryMatch, Some(ride));
        clock.schedule_in(2000, EventKind::ProximityCheck, Some(ride));

        assert!(clock.has_pending(EventKind::TryMatch, Some(ride)));
        assert_eq!(clock.cancel_subject(ride), 2);
        assert!(!clock.has_pending(EventKind::TryMatch, Some(ride)));
        assert_eq!(clock.pending_event_count(), 1);
        assert_eq!(clock.next_event_time(), Some(1000));

        clock.clear();
        assert!(clock.is_empty());
    }

    #[test]
    fn schedule_in_and_epoch_conversion() {
        let mut clock = SimulationClock::with_epoch(1_700_000_000_000);
        clock.schedule_in_secs(1, EventKind::PositionTick, None);
        let e = clock.pop_next().expect("event");
        assert_eq!(e.timestamp, ONE_SEC_MS);
        assert_eq!(clock.now(), ONE_SEC_MS);
        assert_eq!(clock.sim_to_real_ms(1000), 1_700_000_001_000);
        assert_eq!(clock.real_to_sim_ms(1_700_000_001_000), Some(1000));
        assert_eq!(clock.real_to_sim_ms(1_699_999_999_000), None);
    }
}
