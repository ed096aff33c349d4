//! Match attempt for the searching ride.
//!
//! Candidates are free drivers with a usable position, offered in registry
//! order so the algorithm's tie-break is deterministic. Selection happens when
//! the attempt fires, never at request time, so a driver that became busy in
//! the meantime is never picked.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EventKind, EventSubject, SimulationClock, ONE_SEC_MS};
use crate::ecs::{Driver, Position, Ride, RideStatus, RideTiming};
use crate::lifecycle::RideStage;
use crate::matching::{MatchCandidate, MatchingAlgorithmResource};
use crate::registry::DriverRegistry;
use crate::scenario::DispatchLatency;
use crate::session::RiderSession;
use crate::telemetry::RideTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn matching_system(
    mut clock: ResMut<SimulationClock>,
    event: Res<CurrentEvent>,
    mut session: ResMut<RiderSession>,
    matching_algorithm: Res<MatchingAlgorithmResource>,
    mut latency: ResMut<DispatchLatency>,
    registry: Res<DriverRegistry>,
    mut telemetry: ResMut<RideTelemetry>,
    mut rides: Query<(&mut Ride, &mut RideTiming)>,
    mut drivers: Query<(&mut Driver, &Position)>,
) {
    if event.0.kind != EventKind::TryMatch {
        return;
    }
    let Some(EventSubject::Ride(ride_entity)) = event.0.subject else {
        return;
    };
    if session.stage != RideStage::Requested || session.ride != Some(ride_entity) {
        return;
    }
    let Ok((mut ride, mut timing)) = rides.get_mut(ride_entity) else {
        return;
    };
    if ride.status != RideStatus::Searching {
        return;
    }
    telemetry.match_attempts += 1;

    let candidates: Vec<MatchCandidate> = registry
        .entities()
        .filter_map(|entity| {
            let (driver, position) = drivers.get(entity).ok()?;
            (driver.is_free() && position.0.is_valid()).then_some(MatchCandidate {
                entity,
                driver_id: driver.id,
                position: position.0,
            })
        })
        .collect();

    let chosen = matching_algorithm
        .find_match(ride.pickup, &candidates)
        .and_then(|entity| candidates.iter().find(|c| c.entity == entity).copied());

    let Some(candidate) = chosen else {
        let delay_ms = latency.sample_ms();
        telemetry.match_retries += 1;
        clock.schedule_in(
            delay_ms,
            EventKind::TryMatch,
            Some(EventSubject::Ride(ride_entity)),
        );
        log::debug!(
            "{}: no free driver among {} candidates, retrying in {delay_ms} ms",
            ride.id,
            candidates.len()
        );
        return;
    };

    let Ok((mut driver, _)) = drivers.get_mut(candidate.entity) else {
        return;
    };
    let now = clock.now();
    if !ride.mark_matched(&mut timing, candidate.entity, candidate.driver_id, now) {
        return;
    }
    driver.assign(ride.pickup);
    session.stage = RideStage::Matched;

    clock.schedule_in(
        ONE_SEC_MS,
        EventKind::ProximityCheck,
        Some(EventSubject::Ride(ride_entity)),
    );
    log::info!(
        "{} matched with {} ({}, {})",
        ride.id,
        candidate.driver_id,
        driver.name,
        driver.vehicle
    );
    log::debug!("stage requested -> matched");
}
