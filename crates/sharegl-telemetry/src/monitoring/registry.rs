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
//! Registry for monitored object trackers.

use sharegl_core::{SharedObjectTracker, TrackerReport};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

struct Entry {
    name: String,
    tracker: Weak<SharedObjectTracker>,
}

/// A named snapshot of one tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSample {
    /// The name the tracker was registered under.
    pub name: String,
    /// The tracker state at sampling time.
    pub report: TrackerReport,
}

/// A thread-safe list of trackers to sample.
///
/// Trackers are held weakly; one that was dropped disappears from the
/// registry on the next sampling.
#[derive(Clone, Default)]
pub struct TrackerMonitorRegistry {
    entries: Arc<Mutex<Vec<Entry>>>,
}

impl TrackerMonitorRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `tracker` under `name`.
    pub fn register(&self, name: impl Into<String>, tracker: &Arc<SharedObjectTracker>) {
        let name = name.into();
        log::info!("Registered tracker monitor: {name}");
        self.entries().push(Entry {
            name,
            tracker: Arc::downgrade(tracker),
        });
    }

    /// Snapshots every live tracker and forgets the dropped ones.
    pub fn sample_all(&self) -> Vec<TrackerSample> {
        let mut entries = self.entries();
        entries.retain(|entry| entry.tracker.strong_count() > 0);
        entries
            .iter()
            .filter_map(|entry| {
                let tracker = entry.tracker.upgrade()?;
                Some(TrackerSample {
                    name: entry.name.clone(),
                    report: tracker.report(),
                })
            })
            .collect()
    }

    /// The names of the registered trackers.
    pub fn names(&self) -> Vec<String> {
        self.entries().iter().map(|e| e.name.clone()).collect()
    }

    /// Number of registered trackers, including dropped ones not swept yet.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for TrackerMonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerMonitorRegistry")
            .field("names", &self.names())
            .finish()
    }
}
