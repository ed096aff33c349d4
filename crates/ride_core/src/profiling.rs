//! Event processing metrics for runs and benchmarks.

use std::collections::HashMap;
use std::time::Instant;

use bevy_ecs::prelude::Resource;

use crate::clock::EventKind;

/// Event processing rate metrics.
#[derive(Debug, Default, Resource)]
pub struct EventMetrics {
    /// Total events processed.
    pub events_processed: u64,
    /// Start time for rate calculation.
    pub start_time: Option<Instant>,
    /// Events per event kind.
    pub events_by_kind: HashMap<EventKind, u64>,
}

impl EventMetrics {
    /// Record an event being processed.
    pub fn record_event(&mut self, kind: EventKind) {
        if self.start_time.is_none() {
            self.start_time = Some(Instant::now());
        }
        self.events_processed += 1;
        *self.events_by_kind.entry(kind).or_insert(0) += 1;
    }

    pub fn count(&self, kind: EventKind) -> u64 {
        self.events_by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Get current event processing rate (events per second, wall clock).
    pub fn events_per_second(&self) -> f64 {
        if let Some(start) = self.start_time {
            let elapsed = start.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                self.events_processed as f64 / elapsed
            } else {
                0.0
            }
        } else {
            0.0
        }
    }

    /// Summary lines, most frequent kind first.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Total events processed: {}", self.events_processed)];
        if self.start_time.is_some() {
            lines.push(format!("Events per second: {:.0}", self.events_per_second()));
        }
        let mut entries: Vec<_> = self.events_by_kind.iter().collect();
        entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in entries {
            lines.push(format!("  {:16} : {}", format!("{kind:?}"), count));
        }
        lines
    }

    /// Print summary statistics.
    pub fn print_summary(&self) {
        println!("\n=== Event Processing Summary ===");
        for line in self.summary_lines() {
            println!("{line}");
        }
    }
}
