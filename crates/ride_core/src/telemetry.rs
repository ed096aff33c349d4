//! Telemetry / KPIs: completed and cancelled rides plus periodic snapshots.

use std::collections::VecDeque;

use bevy_ecs::prelude::Resource;
use h3o::CellIndex;

use crate::ecs::{DriverId, RideId, RideStatus};
use crate::geo::Coordinate;
use crate::lifecycle::RideStage;

/// One completed ride, recorded when the driver reaches dropoff.
/// Timestamps are simulation ms; use the helper methods for derived KPIs.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRideRecord {
    pub ride_id: RideId,
    pub driver_id: DriverId,
    pub pickup: Coordinate,
    pub dropoff: Coordinate,
    pub requested_at: u64,
    pub matched_at: u64,
    pub picked_up_at: u64,
    pub completed_at: u64,
}

impl CompletedRideRecord {
    /// Time from request to driver assignment (dispatch latency incl. retries).
    pub fn time_to_match(&self) -> u64 {
        self.matched_at.saturating_sub(self.requested_at)
    }

    /// Time from assignment until the driver reached pickup.
    pub fn time_to_pickup(&self) -> u64 {
        self.picked_up_at.saturating_sub(self.matched_at)
    }

    /// Time from pickup to dropoff.
    pub fn trip_duration(&self) -> u64 {
        self.completed_at.saturating_sub(self.picked_up_at)
    }
}

/// One ride the rider cancelled.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelledRideRecord {
    pub ride_id: RideId,
    pub driver_id: Option<DriverId>,
    /// Status the ride was in when it was cancelled.
    pub status_at_cancel: RideStatus,
    pub requested_at: u64,
    pub cancelled_at: u64,
}

#[derive(Debug, Default, Resource)]
pub struct RideTelemetry {
    pub completed_rides: Vec<CompletedRideRecord>,
    pub cancelled_rides: Vec<CancelledRideRecord>,
    /// Every `TryMatch` that ran against a searching ride.
    pub match_attempts: u64,
    /// Attempts that found no free driver and were rescheduled.
    pub match_retries: u64,
}

/// Snapshot of one driver for visualization/export.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSnapshot {
    pub driver_id: DriverId,
    pub position: Coordinate,
    pub cell: Option<CellIndex>,
    pub busy: bool,
    pub has_target: bool,
}

/// Snapshot of the active ride.
#[derive(Debug, Clone, PartialEq)]
pub struct RideSnapshot {
    pub ride_id: RideId,
    pub status: RideStatus,
    pub driver_id: Option<DriverId>,
    /// Distance from the assigned driver to its current target, if any.
    pub distance_to_target_m: Option<f64>,
}

/// Aggregated counts at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimCounts {
    pub drivers_free: usize,
    pub drivers_busy: usize,
    pub drivers_moving: usize,
}

impl SimCounts {
    pub fn add_driver(&mut self, busy: bool, has_target: bool) {
        if busy {
            self.drivers_busy += 1;
        } else {
            self.drivers_free += 1;
        }
        if has_target {
            self.drivers_moving += 1;
        }
    }
}

/// Snapshot of simulation state at a specific timestamp (simulation ms).
#[derive(Debug, Clone)]
pub struct SimSnapshot {
    pub timestamp_ms: u64,
    pub stage: RideStage,
    pub counts: SimCounts,
    pub drivers: Vec<DriverSnapshot>,
    pub ride: Option<RideSnapshot>,
}

/// Snapshot capture configuration.
#[derive(Debug, Clone, Copy, Resource)]
pub struct SimSnapshotConfig {
    pub interval_ms: u64,
    pub max_snapshots: usize,
}

impl Default for SimSnapshotConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_snapshots: 10_000,
        }
    }
}

/// Rolling snapshot buffer.
#[derive(Debug, Default, Resource)]
pub struct SimSnapshots {
    pub snapshots: VecDeque<SimSnapshot>,
    pub last_snapshot_at: Option<u64>,
}

impl SimSnapshots {
    pub fn push(&mut self, snapshot: SimSnapshot, max_snapshots: usize) {
        self.last_snapshot_at = Some(snapshot.timestamp_ms);
        self.snapshots.push_back(snapshot);
        while self.snapshots.len() > max_snapshots.max(1) {
            self.snapshots.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&SimSnapshot> {
        self.snapshots.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ts: u64) -> SimSnapshot {
        SimSnapshot {
            timestamp_ms: ts,
            stage: RideStage::Idle,
            counts: SimCounts::default(),
            drivers: Vec::new(),
            ride: None,
        }
    }

    #[test]
    fn completed_record_derives_durations() {
        let record = CompletedRideRecord {
            ride_id: RideId(1),
            driver_id: DriverId(0),
            pickup: Coordinate::new(0.0, 0.0),
            dropoff: Coordinate::new(0.0, 0.0),
            requested_at: 1_000,
            matched_at: 3_500,
            picked_up_at: 60_000,
            completed_at: 200_000,
        };
        assert_eq!(record.time_to_match(), 2_500);
        assert_eq!(record.time_to_pickup(), 56_500);
        assert_eq!(record.trip_duration(), 140_000);
    }

    #[test]
    fn snapshot_buffer_is_bounded() {
        let mut buffer = SimSnapshots::default();
        for ts in 0..5 {
            buffer.push(snapshot(ts * 1000), 3);
        }
        assert_eq!(buffer.snapshots.len(), 3);
        assert_eq!(buffer.snapshots.front().map(|s| s.timestamp_ms), Some(2000));
        assert_eq!(buffer.latest().map(|s| s.timestamp_ms), Some(4000));
        assert_eq!(buffer.last_snapshot_at, Some(4000));
    }

    #[test]
    fn counts_split_free_and_busy() {
        let mut counts = SimCounts::default();
        counts.add_driver(false, false);
        counts.add_driver(true, true);
        counts.add_driver(false, true);
        assert_eq!(
            counts,
            SimCounts {
                drivers_free: 2,
                drivers_busy: 1,
                drivers_moving: 2,
            }
        );
    }
}
