mod support;

use bevy_ecs::prelude::Entity;
use ride_core::clock::{EventKind, EventSubject, SimulationClock, ONE_SEC_MS};

#[test]
fn clock_pops_events_in_time_order() {
    let mut clock = SimulationClock::default();
    let ride = Some(EventSubject::Ride(Entity::from_raw(1)));
    clock.schedule_at(20, EventKind::ProximityCheck, ride);
    clock.schedule_at(5, EventKind::TryMatch, ride);
    clock.schedule_at(20, EventKind::PositionTick, None);
    clock.schedule_at(10, EventKind::PositionTick, None);

    let order: Vec<(u64, EventKind)> = std::iter::from_fn(|| clock.pop_next())
        .map(|event| (event.timestamp, event.kind))
        .collect();
    assert_eq!(
        order,
        vec![
            (5, EventKind::TryMatch),
            (10, EventKind::PositionTick),
            (20, EventKind::PositionTick),
            (20, EventKind::ProximityCheck),
        ]
    );
    assert_eq!(clock.now(), 20);
    assert!(clock.is_empty());
}

#[test]
fn schedule_in_is_relative_to_now() {
    let mut clock = SimulationClock::with_epoch(1_700_000_000_000);
    clock.schedule_at(2 * ONE_SEC_MS, EventKind::PositionTick, None);
    clock.pop_next().expect("tick");

    clock.schedule_in_secs(3, EventKind::PositionTick, None);
    assert_eq!(clock.next_event_time(), Some(5 * ONE_SEC_MS));
    assert_eq!(clock.sim_to_real_ms(clock.now()), 1_700_000_002_000);
    assert_eq!(clock.real_to_sim_ms(1_700_000_002_000), Some(2_000));
    assert_eq!(clock.real_to_sim_ms(0), None);
}

#[test]
fn cancelling_a_subject_leaves_other_events() {
    let mut clock = SimulationClock::default();
    let a = EventSubject::Ride(Entity::from_raw(1));
    let b = EventSubject::Ride(Entity::from_raw(2));
    clock.schedule_at(1_000, EventKind::PositionTick, None);
    clock.schedule_at(1_500, EventKind::TryMatch, Some(a));
    clock.schedule_at(2_000, EventKind::ProximityCheck, Some(a));
    clock.schedule_at(2_500, EventKind::TryMatch, Some(b));

    assert_eq!(clock.cancel_subject(a), 2);
    assert!(!clock.has_pending(EventKind::TryMatch, Some(a)));
    assert!(clock.has_pending(EventKind::TryMatch, Some(b)));
    assert!(clock.has_pending(EventKind::PositionTick, None));
    assert_eq!(clock.pending_event_count(), 2);
}
