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

//! The reference-counted set of GPU objects shared by one share group.
//!
//! ## Lifecycle
//!
//! ```text
//!  Active (refs > 0) ──release to 0──► Draining ──ok──► Deleted
//!                                         │
//!                                         └─ no matching context / failures
//!                                                │
//!                                                ▼
//!                              Pending (ids moved into the deletion pool)
//!                                                │
//!                                     pool.clean(ctx) succeeds
//!                                                ▼
//!                                             Deleted
//! ```
//!
//! Counting decisions are taken under the tracker lock. Native deletion calls
//! are only issued afterwards, on sets that were moved out of the tracker.

use super::kind::{ObjectDeleter, ObjectId, ObjectKind, PerKind};
use super::kind_set::{DrainReport, KindSet};
use crate::current::CurrentContext;
use crate::error::{ConsistencyViolation, ShareError, ShareResult};
use crate::utils::lock;
use std::fmt;
use std::sync::{Arc, Mutex};

/// A tracker designated to collect ids whose deletion had to be postponed.
///
/// It is a plain [`SharedObjectTracker`]; the alias documents its role.
pub type DeletionPool = SharedObjectTracker;

/// What [`SharedObjectTracker::release`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Other references remain; carries the new reference count.
    Retained(usize),
    /// The count reached zero and every object was deleted immediately.
    Deleted,
    /// The count reached zero but no suitable context was current; the ids
    /// now belong to the deletion pool.
    Deferred,
}

/// A point-in-time summary of a tracker, for diagnostics and telemetry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerReport {
    /// Current reference count.
    pub ref_count: usize,
    /// Whether ids are waiting for deletion.
    pub dirty: bool,
    /// Number of ids per kind.
    pub counts: PerKind<usize>,
}

impl TrackerReport {
    /// Total number of ids across all kinds.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| *n).sum()
    }
}

#[derive(Default)]
struct TrackerState {
    sets: PerKind<KindSet>,
    ref_count: usize,
    dirty: bool,
}

impl TrackerState {
    fn is_empty(&self) -> bool {
        self.sets.iter().all(|(_, set)| set.is_empty())
    }
}

macro_rules! kind_accessors {
    ($($kind:ident => $add:ident, $remove:ident;)*) => {
        $(
            #[doc = concat!("Records `ids` as live [`ObjectKind::", stringify!($kind), "`] objects.")]
            pub fn $add(&self, ids: &[ObjectId]) {
                self.add_all(ObjectKind::$kind, ids);
            }

            #[doc = concat!("Forgets explicitly deleted [`ObjectKind::", stringify!($kind), "`] objects.")]
            pub fn $remove(&self, ids: &[ObjectId]) {
                self.remove_all(ObjectKind::$kind, ids);
            }
        )*
    };
}

/// The GPU objects shared by one share group, plus a reference count of the
/// contexts still using them.
pub struct SharedObjectTracker {
    state: Mutex<TrackerState>,
}

impl Default for SharedObjectTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedObjectTracker {
    /// Creates an empty tracker with a reference count of zero.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Creates an empty tracker meant to serve as a [`DeletionPool`].
    pub fn new_pool() -> DeletionPool {
        Self::new()
    }

    // --- Object bookkeeping ---

    /// Records one live object.
    pub fn add(&self, kind: ObjectKind, id: ObjectId) {
        lock(&self.state).sets[kind].insert(id);
        log::trace!("Tracking {kind} {id}");
    }

    /// Forgets one explicitly deleted object.
    ///
    /// Returns `false` if the id was not tracked.
    pub fn remove(&self, kind: ObjectKind, id: ObjectId) -> bool {
        let removed = lock(&self.state).sets[kind].remove(id);
        if removed {
            log::trace!("Untracked {kind} {id}");
        }
        removed
    }

    /// Records several live objects of one kind.
    pub fn add_all(&self, kind: ObjectKind, ids: &[ObjectId]) {
        if ids.is_empty() {
            return;
        }
        let mut state = lock(&self.state);
        let set = &mut state.sets[kind];
        for &id in ids {
            set.insert(id);
        }
    }

    /// Forgets several explicitly deleted objects of one kind.
    pub fn remove_all(&self, kind: ObjectKind, ids: &[ObjectId]) {
        if ids.is_empty() {
            return;
        }
        let mut state = lock(&self.state);
        let set = &mut state.sets[kind];
        for &id in ids {
            set.remove(id);
        }
    }

    kind_accessors! {
        Buffer => add_buffers, remove_buffers;
        Texture => add_textures, remove_textures;
        Program => add_programs, remove_programs;
        Shader => add_shaders, remove_shaders;
        Query => add_queries, remove_queries;
        Renderbuffer => add_renderbuffers, remove_renderbuffers;
        Framebuffer => add_framebuffers, remove_framebuffers;
        Fence => add_fences, remove_fences;
        DisplayList => add_display_lists, remove_display_lists;
        VertexArray => add_vertex_arrays, remove_vertex_arrays;
        Sampler => add_samplers, remove_samplers;
        TransformFeedback => add_transform_feedbacks, remove_transform_feedbacks;
        ProgramPipeline => add_program_pipelines, remove_program_pipelines;
    }

    /// Moves every id of `other` into this tracker and marks it dirty.
    ///
    /// `other` is left empty and clean. Transferring a tracker into itself
    /// does nothing. The two locks are never held at the same time.
    pub fn transfer_all(&self, other: &SharedObjectTracker) {
        if std::ptr::eq(self, other) {
            return;
        }
        let mut taken = {
            let mut source = lock(&other.state);
            source.dirty = false;
            std::mem::take(&mut source.sets)
        };
        self.absorb(&mut taken);
    }

    /// Appends `sets` to this tracker, marking it dirty if anything arrived.
    fn absorb(&self, sets: &mut PerKind<KindSet>) {
        let mut state = lock(&self.state);
        let mut moved = 0usize;
        for (kind, set) in sets.iter_mut() {
            moved += set.len();
            state.sets[kind].append(set);
        }
        if moved > 0 {
            state.dirty = true;
            log::trace!("Deletion pool received {moved} object(s)");
        }
    }

    // --- Reference counting ---

    /// Adds one reference.
    pub fn retain(&self) -> usize {
        let mut state = lock(&self.state);
        state.ref_count += 1;
        state.ref_count
    }

    /// Drops one reference.
    ///
    /// When the count reaches zero the tracked objects are deleted right away
    /// if the context current on this thread uses `pool` as its deletion pool.
    /// Otherwise they are moved into `pool` for a later [`clean`](Self::clean).
    ///
    /// # Errors
    ///
    /// - [`ConsistencyViolation::RefCountUnderflow`] if the count is already
    ///   zero. Nothing is changed.
    /// - [`ShareError::Deletion`] if some immediate deletions failed. The count
    ///   stays at zero and the failed ids are in `pool`.
    pub fn release(&self, pool: &Arc<DeletionPool>) -> ShareResult<ReleaseOutcome> {
        let mut sets = {
            let mut state = lock(&self.state);
            if state.ref_count == 0 {
                log::error!("SharedObjectTracker released more often than retained");
                return Err(ConsistencyViolation::RefCountUnderflow.into());
            }
            state.ref_count -= 1;
            if state.ref_count > 0 {
                return Ok(ReleaseOutcome::Retained(state.ref_count));
            }
            state.dirty = false;
            std::mem::take(&mut state.sets)
        };

        let current = CurrentContext::get().filter(|ctx| ctx.share_slot().uses_pool(pool));
        let Some(ctx) = current else {
            log::debug!("No matching context current, deferring tracker contents to the pool");
            pool.absorb(&mut sets);
            return Ok(ReleaseOutcome::Deferred);
        };

        let report = delete_sets(&mut sets, &*ctx);
        if let Some(last) = report.last_error {
            pool.absorb(&mut sets);
            return Err(ShareError::Deletion {
                failed: report.failed,
                last,
            });
        }
        log::debug!(
            "Deleted {} shared object(s) using context {}",
            report.deleted,
            ctx.context_id()
        );
        Ok(ReleaseOutcome::Deleted)
    }

    /// Deletes every pending id through `deleter` if the tracker is dirty.
    ///
    /// Failures are logged and the failed ids kept for another attempt.
    /// Returns `true` if the tracker is clean afterwards.
    pub fn clean(&self, deleter: &dyn ObjectDeleter) -> bool {
        let mut sets = {
            let mut state = lock(&self.state);
            if !state.dirty {
                return true;
            }
            std::mem::take(&mut state.sets)
        };

        let report = delete_sets(&mut sets, deleter);
        if let Some(err) = &report.last_error {
            log::warn!(
                "Deferred deletion left {} object(s) pending: {err}",
                report.failed
            );
        } else if report.deleted > 0 {
            log::debug!("Deferred deletion drained {} object(s)", report.deleted);
        }

        let mut state = lock(&self.state);
        for (kind, set) in sets.iter_mut() {
            state.sets[kind].append(set);
        }
        // Ids added while the lock was released keep the tracker dirty.
        state.dirty = !state.is_empty();
        !state.dirty
    }

    // --- Introspection ---

    /// Current reference count.
    pub fn ref_count(&self) -> usize {
        lock(&self.state).ref_count
    }

    /// Returns `true` while ids are waiting for deletion.
    pub fn is_dirty(&self) -> bool {
        lock(&self.state).dirty
    }

    /// Number of tracked ids of `kind`.
    pub fn len(&self, kind: ObjectKind) -> usize {
        lock(&self.state).sets[kind].len()
    }

    /// Number of tracked ids across all kinds.
    pub fn total_len(&self) -> usize {
        lock(&self.state).sets.iter().map(|(_, set)| set.len()).sum()
    }

    /// Returns `true` if no id of any kind is tracked.
    pub fn is_empty(&self) -> bool {
        lock(&self.state).is_empty()
    }

    /// Returns `true` if `id` is tracked as `kind`.
    pub fn contains(&self, kind: ObjectKind, id: ObjectId) -> bool {
        lock(&self.state).sets[kind].contains(id)
    }

    /// A copy of the tracked ids of `kind`, in insertion order.
    pub fn ids(&self, kind: ObjectKind) -> Vec<ObjectId> {
        lock(&self.state).sets[kind].as_slice().to_vec()
    }

    /// Takes a snapshot for diagnostics.
    pub fn report(&self) -> TrackerReport {
        let state = lock(&self.state);
        TrackerReport {
            ref_count: state.ref_count,
            dirty: state.dirty,
            counts: PerKind::from_fn(|kind| state.sets[kind].len()),
        }
    }
}

impl fmt::Debug for SharedObjectTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report();
        f.debug_struct("SharedObjectTracker")
            .field("ref_count", &report.ref_count)
            .field("dirty", &report.dirty)
            .field("objects", &report.total())
            .finish()
    }
}

/// Drains every set through `deleter`, leaving only failed ids behind.
fn delete_sets(sets: &mut PerKind<KindSet>, deleter: &dyn ObjectDeleter) -> DrainReport {
    let mut report = DrainReport::default();
    for (kind, set) in sets.iter_mut() {
        report.merge(set.delete_all(kind, deleter));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tracker_is_empty_and_clean() {
        let tracker = SharedObjectTracker::new();
        assert_eq!(tracker.ref_count(), 0);
        assert!(!tracker.is_dirty());
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_per_kind_accessors_target_their_kind() {
        let tracker = SharedObjectTracker::new();
        tracker.add_buffers(&[ObjectId(1), ObjectId(2)]);
        tracker.add_vertex_arrays(&[ObjectId(1)]);
        tracker.add_fences(&[ObjectId(0xdead_beef)]);

        assert_eq!(tracker.len(ObjectKind::Buffer), 2);
        assert_eq!(tracker.len(ObjectKind::VertexArray), 1);
        assert!(tracker.contains(ObjectKind::Fence, ObjectId(0xdead_beef)));
        assert_eq!(tracker.total_len(), 4);

        tracker.remove_buffers(&[ObjectId(1)]);
        assert_eq!(tracker.ids(ObjectKind::Buffer), vec![ObjectId(2)]);
        assert!(!tracker.is_dirty(), "live objects are not pending deletion");
    }

    #[test]
    fn test_transfer_all_concatenates_and_marks_dirty() {
        let pool = SharedObjectTracker::new_pool();
        pool.add(ObjectKind::Texture, ObjectId(1));

        let group = SharedObjectTracker::new();
        group.add_textures(&[ObjectId(2), ObjectId(3)]);
        group.add_shaders(&[ObjectId(9)]);

        pool.transfer_all(&group);

        assert!(group.is_empty());
        assert!(pool.is_dirty());
        assert_eq!(
            pool.ids(ObjectKind::Texture),
            vec![ObjectId(1), ObjectId(2), ObjectId(3)]
        );
        assert_eq!(pool.ids(ObjectKind::Shader), vec![ObjectId(9)]);
    }

    #[test]
    fn test_transfer_out_of_dirty_pool_leaves_it_clean() {
        let old_pool = SharedObjectTracker::new_pool();
        old_pool.transfer_all(&{
            let tracker = SharedObjectTracker::new();
            tracker.add_buffers(&[ObjectId(4)]);
            tracker
        });
        assert!(old_pool.is_dirty());

        let new_pool = SharedObjectTracker::new_pool();
        new_pool.transfer_all(&old_pool);

        assert!(old_pool.is_empty());
        assert!(!old_pool.is_dirty());
        assert!(new_pool.is_dirty());
        assert_eq!(new_pool.ids(ObjectKind::Buffer), vec![ObjectId(4)]);
    }

    #[test]
    fn test_transfer_into_self_is_a_noop() {
        let tracker = SharedObjectTracker::new();
        tracker.add_buffers(&[ObjectId(1)]);
        tracker.transfer_all(&tracker);
        assert_eq!(tracker.len(ObjectKind::Buffer), 1);
        assert!(!tracker.is_dirty());
    }

    #[test]
    fn test_transfer_of_empty_tracker_keeps_pool_clean() {
        let pool = SharedObjectTracker::new_pool();
        pool.transfer_all(&SharedObjectTracker::new());
        assert!(!pool.is_dirty());
    }

    #[test]
    fn test_release_underflow_is_reported() {
        let tracker = SharedObjectTracker::new();
        let pool = Arc::new(SharedObjectTracker::new_pool());
        let err = tracker.release(&pool).unwrap_err();
        assert_eq!(
            err,
            ShareError::Consistency(ConsistencyViolation::RefCountUnderflow)
        );
        assert_eq!(tracker.ref_count(), 0);
    }

    #[test]
    fn test_release_with_remaining_refs_deletes_nothing() {
        let tracker = SharedObjectTracker::new();
        let pool = Arc::new(SharedObjectTracker::new_pool());
        tracker.retain();
        tracker.retain();
        tracker.add_programs(&[ObjectId(5)]);

        assert_eq!(tracker.release(&pool), Ok(ReleaseOutcome::Retained(1)));
        assert_eq!(tracker.len(ObjectKind::Program), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_release_without_current_context_defers_to_pool() {
        let tracker = SharedObjectTracker::new();
        let pool = Arc::new(SharedObjectTracker::new_pool());
        tracker.retain();
        tracker.add_buffers(&[ObjectId(1), ObjectId(2)]);
        tracker.add_queries(&[ObjectId(3)]);

        assert_eq!(tracker.release(&pool), Ok(ReleaseOutcome::Deferred));
        assert!(tracker.is_empty());
        assert!(!tracker.is_dirty());
        assert!(pool.is_dirty());
        assert_eq!(pool.ids(ObjectKind::Buffer), vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(pool.ids(ObjectKind::Query), vec![ObjectId(3)]);
    }

    #[test]
    fn test_report_counts_per_kind() {
        let tracker = SharedObjectTracker::new();
        tracker.retain();
        tracker.add_samplers(&[ObjectId(1), ObjectId(2)]);
        let report = tracker.report();
        assert_eq!(report.ref_count, 1);
        assert_eq!(report.counts[ObjectKind::Sampler], 2);
        assert_eq!(report.total(), 2);
    }
}
