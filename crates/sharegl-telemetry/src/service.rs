// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Periodic sampling of registered trackers.

use crate::monitoring::{TrackerMonitorRegistry, TrackerSample};
use std::time::{Duration, Instant};

/// Samples the registered trackers at a fixed interval.
#[derive(Debug)]
pub struct TelemetryService {
    monitors: TrackerMonitorRegistry,
    latest: Vec<TrackerSample>,
    last_update: Instant,
    update_interval: Duration,
}

impl TelemetryService {
    /// Creates a new telemetry service with the given update interval.
    pub fn new(update_interval: Duration) -> Self {
        Self {
            monitors: TrackerMonitorRegistry::new(),
            latest: Vec::new(),
            last_update: Instant::now(),
            update_interval,
        }
    }

    /// Should be called periodically (e.g., once per frame).
    /// Samples every registered tracker if the interval has passed.
    pub fn tick(&mut self) -> bool {
        if self.last_update.elapsed() >= self.update_interval {
            self.sample_now();
            true
        } else {
            false
        }
    }

    /// Samples every registered tracker immediately.
    pub fn sample_now(&mut self) {
        log::trace!("Sampling all tracker monitors...");
        self.latest = self.monitors.sample_all();
        for sample in &self.latest {
            if sample.report.dirty {
                log::debug!(
                    "Tracker '{}' has {} object(s) pending deletion",
                    sample.name,
                    sample.report.total()
                );
            }
        }
        self.last_update = Instant::now();
    }

    /// The samples taken by the last update.
    pub fn latest_samples(&self) -> &[TrackerSample] {
        &self.latest
    }

    /// Total number of ids waiting in dirty trackers, as of the last update.
    pub fn pending_deletions(&self) -> usize {
        self.latest
            .iter()
            .filter(|s| s.report.dirty)
            .map(|s| s.report.total())
            .sum()
    }

    /// Returns a reference to the monitor registry.
    pub fn monitor_registry(&self) -> &TrackerMonitorRegistry {
        &self.monitors
    }
}

impl Default for TelemetryService {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sharegl_core::{ObjectId, ObjectKind, SharedObjectTracker};
    use std::sync::Arc;

    #[test]
    fn tick_waits_for_interval() {
        let mut service = TelemetryService::new(Duration::from_secs(3600));
        assert!(!service.tick());
        assert!(service.latest_samples().is_empty());
    }

    #[test]
    fn tick_counts_pending_deletions() {
        let mut service = TelemetryService::new(Duration::ZERO);
        let pool = Arc::new(SharedObjectTracker::new_pool());
        let live = Arc::new(SharedObjectTracker::new());
        service.monitor_registry().register("pool", &pool);
        service.monitor_registry().register("group", &live);

        live.add_buffers(&[ObjectId(1), ObjectId(2)]);
        let released = SharedObjectTracker::new();
        released.add(ObjectKind::Shader, ObjectId(7));
        pool.transfer_all(&released);

        assert!(service.tick());
        assert_eq!(service.latest_samples().len(), 2);
        assert_eq!(service.pending_deletions(), 1, "live objects are not pending");
    }
}
