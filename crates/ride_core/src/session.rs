//! Rider session: the single active ride and the rider-facing actions on it.
//!
//! `request_ride` and `cancel_ride` are called from outside the schedule (the
//! rider pressing a button), so they take `&mut World` directly. Everything
//! after the request happens through scheduled events.

use std::fmt;

use bevy_ecs::prelude::{Entity, Resource, World};

use crate::clock::{EventKind, EventSubject, SimulationClock};
use crate::ecs::{Ride, RideId, RideStatus, RideTiming};
use crate::geo::{Coordinate, CoordinateError};
use crate::lifecycle::RideStage;
use crate::map::LocationSelection;
use crate::registry::release_driver;
use crate::scenario::DispatchLatency;
use crate::telemetry::{CancelledRideRecord, RideTelemetry};

#[derive(Debug, Clone, Resource)]
pub struct RiderSession {
    pub stage: RideStage,
    /// Current ride. Kept after completion until the next request.
    pub ride: Option<Entity>,
    pub next_ride_seq: u64,
}

impl Default for RiderSession {
    fn default() -> Self {
        Self {
            stage: RideStage::Idle,
            ride: None,
            next_ride_seq: 1,
        }
    }
}

/// Rider-facing failures. None of these are fatal.
#[derive(Debug, Clone, PartialEq)]
pub enum RideError {
    MissingLocations,
    InvalidCoordinate(CoordinateError),
    RideInProgress,
    NoActiveRide,
    RideAlreadyCompleted,
}

impl fmt::Display for RideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideError::MissingLocations => f.write_str("Tap the map to set pickup and dropoff"),
            RideError::InvalidCoordinate(err) => write!(f, "invalid location: {err}"),
            RideError::RideInProgress => f.write_str("a ride is already in progress"),
            RideError::NoActiveRide => f.write_str("there is no ride to cancel"),
            RideError::RideAlreadyCompleted => f.write_str("the ride has already been completed"),
        }
    }
}

impl std::error::Error for RideError {}

impl From<CoordinateError> for RideError {
    fn from(err: CoordinateError) -> Self {
        RideError::InvalidCoordinate(err)
    }
}

/// Requests a ride between the currently selected pickup and dropoff.
pub fn request_ride(world: &mut World) -> Result<RideId, RideError> {
    let (pickup, dropoff) = world
        .get_resource::<LocationSelection>()
        .and_then(|selection| Some((selection.pickup?, selection.dropoff?)))
        .ok_or(RideError::MissingLocations)?;
    request_ride_between(world, pickup, dropoff)
}

/// Spawns a searching ride and schedules its first match attempt after a
/// dispatch latency draw.
pub fn request_ride_between(
    world: &mut World,
    pickup: Coordinate,
    dropoff: Coordinate,
) -> Result<RideId, RideError> {
    let pickup = pickup.validate()?;
    let dropoff = dropoff.validate()?;

    let (stage, previous) = {
        let session = world.get_resource_or_insert_with(RiderSession::default);
        (session.stage, session.ride)
    };
    if stage != RideStage::Idle {
        return Err(RideError::RideInProgress);
    }
    // The previous ride can only be a completed one here.
    if let Some(previous) = previous {
        world.despawn(previous);
    }

    let now = world
        .get_resource_or_insert_with(SimulationClock::default)
        .now();
    let id = {
        let mut session = world.resource_mut::<RiderSession>();
        let id = RideId(session.next_ride_seq);
        session.next_ride_seq += 1;
        id
    };
    let entity = world
        .spawn((
            Ride::new(id, pickup, dropoff, now),
            RideTiming {
                requested_at: now,
                ..Default::default()
            },
        ))
        .id();
    {
        let mut session = world.resource_mut::<RiderSession>();
        session.stage = RideStage::Requested;
        session.ride = Some(entity);
    }

    let delay_ms = world
        .get_resource_or_insert_with(|| DispatchLatency::new(None))
        .sample_ms();
    world.resource_mut::<SimulationClock>().schedule_in(
        delay_ms,
        EventKind::TryMatch,
        Some(EventSubject::Ride(entity)),
    );

    log::info!("{id} requested: {pickup} -> {dropoff}, first match attempt in {delay_ms} ms");
    log::debug!("stage idle -> requested");
    Ok(id)
}

/// Cancels the current ride unless it already completed. Frees the driver,
/// drops the ride's pending events and discards the ride.
pub fn cancel_ride(world: &mut World) -> Result<RideId, RideError> {
    let entity = world
        .get_resource::<RiderSession>()
        .and_then(|session| session.ride)
        .ok_or(RideError::NoActiveRide)?;

    let Some(mut ride) = world.get_mut::<Ride>(entity) else {
        if let Some(mut session) = world.get_resource_mut::<RiderSession>() {
            session.ride = None;
            session.stage = RideStage::Idle;
        }
        return Err(RideError::NoActiveRide);
    };
    let previous = ride.mark_cancelled().ok_or(RideError::RideAlreadyCompleted)?;
    let (ride_id, driver_id) = (ride.id, ride.driver_id);
    let requested_at = world
        .get::<RideTiming>(entity)
        .map(|timing| timing.requested_at)
        .unwrap_or_default();

    if let Some(driver_id) = driver_id {
        release_driver(world, driver_id);
    }
    let (now, dropped) = {
        let mut clock = world.get_resource_or_insert_with(SimulationClock::default);
        (clock.now(), clock.cancel_subject(EventSubject::Ride(entity)))
    };
    world
        .get_resource_or_insert_with(RideTelemetry::default)
        .cancelled_rides
        .push(CancelledRideRecord {
            ride_id,
            driver_id,
            status_at_cancel: previous,
            requested_at,
            cancelled_at: now,
        });

    world.despawn(entity);
    if let Some(mut session) = world.get_resource_mut::<RiderSession>() {
        session.ride = None;
        session.stage = RideStage::Idle;
    }

    log::info!("{ride_id} cancelled while {previous}");
    log::debug!("dropped {dropped} pending events for {ride_id}");
    Ok(ride_id)
}

/// The session's current ride, including a completed one not yet replaced.
pub fn active_ride(world: &World) -> Option<(Entity, &Ride)> {
    let entity = world.get_resource::<RiderSession>()?.ride?;
    world.get::<Ride>(entity).map(|ride| (entity, ride))
}

/// Whether the current ride still needs a driver or is under way.
pub fn has_open_ride(world: &World) -> bool {
    active_ride(world).is_some_and(|(_, ride)| !ride.status.is_terminal())
}

pub fn ride_status(world: &World) -> Option<RideStatus> {
    active_ride(world).map(|(_, ride)| ride.status)
}

/// Drops every pending event. The world keeps its state; nothing advances
/// until something is scheduled again.
pub fn stop_simulation(world: &mut World) {
    if let Some(mut clock) = world.get_resource_mut::<SimulationClock>() {
        let pending = clock.pending_event_count();
        clock.clear();
        log::debug!("simulation stopped, {pending} pending events dropped");
    }
}
