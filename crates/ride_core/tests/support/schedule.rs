#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use ride_core::clock::SimulationClock;
use ride_core::ecs::RideStatus;
use ride_core::runner::{run_next_event, run_until, run_until_empty, simulation_schedule};
use ride_core::session::ride_status;

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default simulation schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule)
    }

    /// Run multiple events up to `max_steps`, returning the number of steps executed.
    pub fn run_until_empty(&mut self, world: &mut World, max_steps: usize) -> usize {
        run_until_empty(world, &mut self.schedule, max_steps)
    }

    /// Run every event before `sim_ms`.
    pub fn run_until_ms(&mut self, world: &mut World, sim_ms: u64) -> usize {
        run_until(world, &mut self.schedule, sim_ms)
    }

    /// Advance simulated time by `secs`.
    pub fn run_for_secs(&mut self, world: &mut World, secs: u64) -> usize {
        let now = world.resource::<SimulationClock>().now();
        self.run_until_ms(world, now + secs * 1000)
    }

    /// Step until the ride reaches `status` or simulated time reaches `limit_ms`.
    /// Returns whether the status was reached.
    pub fn run_until_status(&mut self, world: &mut World, status: RideStatus, limit_ms: u64) -> bool {
        loop {
            if ride_status(world) == Some(status) {
                return true;
            }
            match world.resource::<SimulationClock>().next_event_time() {
                Some(ts) if ts < limit_ms => {}
                _ => return false,
            }
            if !self.run_one(world) {
                return false;
            }
        }
    }
}
