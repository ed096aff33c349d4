//! Ride lifecycle: rider stage and ride status transitions.
//!
//! ```text
//! idle ──request──▶ requested ──match──▶ matched ──dropoff──▶ idle
//!                      │                  │  (driver_assigned → picked_up)
//!                      └────cancel────────┴──▶ idle (ride discarded)
//! ```
//!
//! Every transition checks the current status first and returns `false` when it
//! does not apply, so replaying a tick after the transition already fired is a
//! no-op. Systems decide *when* to call these; this module only decides *whether*
//! the ride may move.

use std::fmt;

use bevy_ecs::prelude::Entity;

use crate::ecs::{DriverId, Ride, RideId, RideStatus, RideTiming};
use crate::geo::{distance_meters, Coordinate};

/// Stage of the rider's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RideStage {
    #[default]
    Idle,
    Requested,
    Matched,
}

impl RideStage {
    /// Caption for the rider's primary action button.
    pub fn action_label(&self) -> &'static str {
        match self {
            RideStage::Idle => "Request Ride",
            RideStage::Requested => "Searching...",
            RideStage::Matched => "Driver assigned",
        }
    }
}

impl fmt::Display for RideStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RideStage::Idle => "idle",
            RideStage::Requested => "requested",
            RideStage::Matched => "matched",
        };
        f.write_str(s)
    }
}

/// What a proximity poll found for the ride's current leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityOutcome {
    /// Driver is not close enough yet (or the check does not apply).
    Pending,
    ReachedPickup,
    ReachedDropoff,
}

impl Ride {
    pub fn new(id: RideId, pickup: Coordinate, dropoff: Coordinate, now: u64) -> Self {
        Self {
            id,
            pickup,
            dropoff,
            status: RideStatus::Searching,
            driver: None,
            driver_id: None,
            created_at: now,
        }
    }

    /// `searching → driver_assigned`.
    pub fn mark_matched(
        &mut self,
        timing: &mut RideTiming,
        driver: Entity,
        driver_id: DriverId,
        now: u64,
    ) -> bool {
        if self.status != RideStatus::Searching || self.driver.is_some() {
            return false;
        }
        self.status = RideStatus::DriverAssigned;
        self.driver = Some(driver);
        self.driver_id = Some(driver_id);
        timing.matched_at = Some(now);
        true
    }

    /// `driver_assigned → picked_up`.
    pub fn mark_picked_up(&mut self, timing: &mut RideTiming, now: u64) -> bool {
        if self.status != RideStatus::DriverAssigned {
            return false;
        }
        self.status = RideStatus::PickedUp;
        timing.picked_up_at = Some(now);
        true
    }

    /// `picked_up → completed`.
    pub fn mark_completed(&mut self, timing: &mut RideTiming, now: u64) -> bool {
        if self.status != RideStatus::PickedUp {
            return false;
        }
        self.status = RideStatus::Completed;
        timing.completed_at = Some(now);
        true
    }

    /// Any non-terminal status `→ cancelled`. Returns the status it left.
    pub fn mark_cancelled(&mut self) -> Option<RideStatus> {
        if self.status.is_terminal() {
            return None;
        }
        let previous = self.status;
        self.status = RideStatus::Cancelled;
        Some(previous)
    }

    /// Coordinate the assigned driver should currently be heading to.
    pub fn current_target(&self) -> Option<Coordinate> {
        match self.status {
            RideStatus::DriverAssigned => Some(self.pickup),
            RideStatus::PickedUp => Some(self.dropoff),
            _ => None,
        }
    }

    /// Evaluates one proximity poll; `threshold_m` is exclusive.
    pub fn check_proximity(&self, driver_position: Coordinate, threshold_m: f64) -> ProximityOutcome {
        let (target, outcome) = match self.status {
            RideStatus::DriverAssigned => (self.pickup, ProximityOutcome::ReachedPickup),
            RideStatus::PickedUp => (self.dropoff, ProximityOutcome::ReachedDropoff),
            _ => return ProximityOutcome::Pending,
        };
        // Infinite distance (invalid position) never passes the threshold.
        if distance_meters(driver_position, target) < threshold_m {
            outcome
        } else {
            ProximityOutcome::Pending
        }
    }
}
