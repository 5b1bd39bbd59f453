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

//! The contract between this crate and a rendering-context implementation.
//!
//! A context implementation owns its native handle and its "is created" flag.
//! This crate only observes them through [`GlContext`], and remembers the
//! context's sharing state in a [`ShareSlot`] embedded in the context.

use crate::error::ShareResult;
use crate::group::ShareGroup;
use crate::object::{
    DeletionPool, ObjectDeleter, ObjectId, ObjectKind, ReleaseOutcome, SharedObjectTracker,
};
use crate::utils::lock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A process-unique, comparable identity for a rendering context.
///
/// Holding a `ContextId` never keeps the context alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocates a fresh identity.
    pub fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw value. Mostly useful for diagnostics and tests.
    pub const fn from_raw(raw: u64) -> Self {
        ContextId(raw)
    }

    /// Returns the raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A rendering context as seen by the share-group tracker.
pub trait GlContext: ObjectDeleter + Send + Sync {
    /// The identity of this context.
    fn context_id(&self) -> ContextId;

    /// Returns `true` while a live native context backs this object.
    fn is_created(&self) -> bool;

    /// The sharing state remembered for this context.
    fn share_slot(&self) -> &ShareSlot;
}

#[derive(Default)]
struct SlotState {
    group: Option<Arc<ShareGroup>>,
    tracker: Option<Arc<SharedObjectTracker>>,
    // This context holds one reference on `tracker`.
    retained: bool,
    pool: Option<Arc<DeletionPool>>,
}

/// Per-context memory of its share group, the group's object tracker, and the
/// deletion pool that receives its deferred deletions.
///
/// The slot is the only strong owner of a [`ShareGroup`]: once every member
/// context is gone, the group goes with it.
#[derive(Default)]
pub struct ShareSlot {
    state: Mutex<SlotState>,
}

impl ShareSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// The share group this context belongs to, if any.
    pub fn group(&self) -> Option<Arc<ShareGroup>> {
        lock(&self.state).group.clone()
    }

    pub(crate) fn set_group(&self, group: Arc<ShareGroup>) {
        lock(&self.state).group = Some(group);
    }

    /// The object tracker of this context's share group, if tracking is on.
    pub fn object_tracker(&self) -> Option<Arc<SharedObjectTracker>> {
        lock(&self.state).tracker.clone()
    }

    /// Remembers `tracker` as this context's group tracker.
    ///
    /// A `live` context also takes its reference on `tracker` unless it holds
    /// one already. If a different tracker was replaced while this context
    /// held a reference on it, that tracker is returned and the caller owes it
    /// a [`release`](SharedObjectTracker::release).
    pub(crate) fn adopt_object_tracker(
        &self,
        tracker: Arc<SharedObjectTracker>,
        live: bool,
    ) -> Option<Arc<SharedObjectTracker>> {
        let mut state = lock(&self.state);
        let same = state
            .tracker
            .as_ref()
            .is_some_and(|own| Arc::ptr_eq(own, &tracker));
        let mut replaced = None;
        if !same {
            let previous = state.tracker.replace(tracker.clone());
            if std::mem::take(&mut state.retained) {
                replaced = previous;
            }
        }
        if live && !state.retained {
            tracker.retain();
            state.retained = true;
        }
        replaced
    }

    /// Takes this context's reference on its tracker.
    ///
    /// Returns the new reference count, or `None` when there is no tracker or
    /// the reference is already held.
    pub fn retain_object_tracker(&self) -> Option<usize> {
        let mut state = lock(&self.state);
        if state.retained {
            return None;
        }
        let refs = state.tracker.as_ref()?.retain();
        state.retained = true;
        Some(refs)
    }

    /// Gives back the reference taken by
    /// [`retain_object_tracker`](Self::retain_object_tracker).
    ///
    /// Returns `None` when no reference is held. The tracker stays remembered
    /// so a recreated context can retain it again.
    pub fn release_object_tracker(
        &self,
        pool: &Arc<DeletionPool>,
    ) -> Option<ShareResult<ReleaseOutcome>> {
        let tracker = {
            let mut state = lock(&self.state);
            if !std::mem::take(&mut state.retained) {
                return None;
            }
            state.tracker.clone()?
        };
        Some(tracker.release(pool))
    }

    /// Returns `true` while this context holds a reference on its tracker.
    pub fn holds_tracker_reference(&self) -> bool {
        lock(&self.state).retained
    }

    /// The deletion pool this context drains and defers into.
    pub fn deletion_pool(&self) -> Option<Arc<DeletionPool>> {
        lock(&self.state).pool.clone()
    }

    /// Sets the deletion pool for this context.
    pub fn set_deletion_pool(&self, pool: Arc<DeletionPool>) {
        lock(&self.state).pool = Some(pool);
    }

    /// Returns `true` if `pool` is this context's deletion pool.
    pub fn uses_pool(&self, pool: &Arc<DeletionPool>) -> bool {
        lock(&self.state)
            .pool
            .as_ref()
            .is_some_and(|own| Arc::ptr_eq(own, pool))
    }

    /// Records freshly allocated objects in the group tracker.
    ///
    /// Does nothing when no tracker is remembered.
    pub fn track_created(&self, kind: ObjectKind, ids: &[ObjectId]) {
        if let Some(tracker) = self.object_tracker() {
            tracker.add_all(kind, ids);
        }
    }

    /// Forgets explicitly deleted objects in the group tracker.
    pub fn track_deleted(&self, kind: ObjectKind, ids: &[ObjectId]) {
        if let Some(tracker) = self.object_tracker() {
            tracker.remove_all(kind, ids);
        }
    }
}

impl fmt::Debug for ShareSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ShareSlot")
            .field("has_group", &state.group.is_some())
            .field("has_tracker", &state.tracker.is_some())
            .field("retained", &state.retained)
            .field("has_pool", &state.pool.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_ids_are_unique() {
        let a = ContextId::next();
        let b = ContextId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn slot_routes_notifications_only_with_a_tracker() {
        let slot = ShareSlot::new();
        slot.track_created(ObjectKind::Buffer, &[ObjectId(1)]);
        assert!(slot.object_tracker().is_none());

        let tracker = Arc::new(SharedObjectTracker::new());
        assert!(slot.adopt_object_tracker(tracker.clone(), false).is_none());
        slot.track_created(ObjectKind::Buffer, &[ObjectId(1), ObjectId(2)]);
        slot.track_deleted(ObjectKind::Buffer, &[ObjectId(1)]);
        assert_eq!(tracker.ids(ObjectKind::Buffer), vec![ObjectId(2)]);
    }

    #[test]
    fn tracker_reference_is_taken_and_given_back_once() {
        let slot = ShareSlot::new();
        let pool = Arc::new(SharedObjectTracker::new_pool());
        assert_eq!(slot.retain_object_tracker(), None);

        let tracker = Arc::new(SharedObjectTracker::new());
        slot.adopt_object_tracker(tracker.clone(), false);
        assert_eq!(slot.retain_object_tracker(), Some(1));
        assert_eq!(slot.retain_object_tracker(), None);
        assert_eq!(tracker.ref_count(), 1);

        assert_eq!(
            slot.release_object_tracker(&pool),
            Some(Ok(ReleaseOutcome::Deferred))
        );
        assert!(slot.release_object_tracker(&pool).is_none());
        assert_eq!(tracker.ref_count(), 0);
        assert!(slot.object_tracker().is_some());
    }

    #[test]
    fn live_adoption_retains_once_and_hands_back_the_old_tracker() {
        let slot = ShareSlot::new();
        let first = Arc::new(SharedObjectTracker::new());
        let second = Arc::new(SharedObjectTracker::new());

        assert!(slot.adopt_object_tracker(first.clone(), true).is_none());
        assert!(slot.adopt_object_tracker(first.clone(), true).is_none());
        assert_eq!(first.ref_count(), 1);

        let replaced = slot.adopt_object_tracker(second.clone(), true).unwrap();
        assert!(Arc::ptr_eq(&replaced, &first));
        assert_eq!(second.ref_count(), 1);
        assert!(slot.holds_tracker_reference());
    }

    #[test]
    fn uses_pool_compares_identity() {
        let slot = ShareSlot::new();
        let pool = Arc::new(SharedObjectTracker::new_pool());
        let other = Arc::new(SharedObjectTracker::new_pool());
        assert!(!slot.uses_pool(&pool));
        slot.set_deletion_pool(pool.clone());
        assert!(slot.uses_pool(&pool));
        assert!(!slot.uses_pool(&other));
    }
}
