use std::fmt;

use bevy_ecs::prelude::{Component, Entity};

use crate::geo::Coordinate;

/// Stable driver identity. The numeric value is the driver's registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DriverId(pub u32);

impl fmt::Display for DriverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "drv-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RideId(pub u64);

impl fmt::Display for RideId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ride-{}", self.0)
    }
}

/// A mock driver. Position lives in its own [`Position`] component.
#[derive(Debug, Clone, PartialEq, Component)]
pub struct Driver {
    pub id: DriverId,
    pub name: String,
    pub vehicle: String,
    pub busy: bool,
    /// Where the driver is heading; `None` means parked.
    pub target: Option<Coordinate>,
}

impl Driver {
    pub fn new(id: DriverId, name: impl Into<String>, vehicle: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            vehicle: vehicle.into(),
            busy: false,
            target: None,
        }
    }

    pub fn assign(&mut self, target: Coordinate) {
        self.busy = true;
        self.target = Some(target);
    }

    /// Points an already-assigned driver at a new target without touching `busy`.
    pub fn retarget(&mut self, target: Coordinate) {
        self.target = Some(target);
    }

    pub fn release(&mut self) {
        self.busy = false;
        self.target = None;
    }

    pub fn is_free(&self) -> bool {
        !self.busy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Coordinate);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RideStatus {
    Searching,
    DriverAssigned,
    PickedUp,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Searching => "searching",
            RideStatus::DriverAssigned => "driver_assigned",
            RideStatus::PickedUp => "picked_up",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rider's ride. Status transitions live in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Ride {
    pub id: RideId,
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub status: RideStatus,
    pub driver: Option<Entity>,
    pub driver_id: Option<DriverId>,
    /// Simulation time (ms) the ride was requested.
    pub created_at: u64,
}

/// Simulation timestamps (ms) for each lifecycle milestone of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Component)]
pub struct RideTiming {
    pub requested_at: u64,
    pub matched_at: Option<u64>,
    pub picked_up_at: Option<u64>,
    pub completed_at: Option<u64>,
}
