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

//! A set of contexts sharing one GPU object namespace.
//!
//! Members are split into a *live* partition (backed by a native context) and
//! a *dead* partition (not created yet, or already destroyed). Every member is
//! in exactly one of them. Members are observed through `Weak` handles, so a
//! group never keeps a context alive.

use crate::context::{ContextId, GlContext};
use crate::error::{ConsistencyViolation, Partition};
use crate::object::SharedObjectTracker;
use crate::utils::lock;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

struct Member {
    id: ContextId,
    handle: Weak<dyn GlContext>,
}

impl Member {
    fn is_gone(&self) -> bool {
        self.handle.strong_count() == 0
    }
}

#[derive(Default)]
struct GroupState {
    live: Vec<Member>,
    dead: Vec<Member>,
    tracker: Option<Arc<SharedObjectTracker>>,
}

impl GroupState {
    fn partition_mut(&mut self, partition: Partition) -> &mut Vec<Member> {
        match partition {
            Partition::Live => &mut self.live,
            Partition::Dead => &mut self.dead,
        }
    }

    fn contains(&self, id: ContextId) -> bool {
        self.live.iter().chain(self.dead.iter()).any(|m| m.id == id)
    }

    fn prune(&mut self) {
        self.live.retain(|m| !m.is_gone());
        self.dead.retain(|m| !m.is_gone());
    }

    fn transfer(
        &mut self,
        id: ContextId,
        from: Partition,
        to: Partition,
    ) -> Result<(), ConsistencyViolation> {
        let source = self.partition_mut(from);
        let Some(pos) = source.iter().position(|m| m.id == id) else {
            log::error!("Context {id} expected in the {from} partition of its share group");
            return Err(ConsistencyViolation::NotInPartition {
                context: id,
                expected: from,
            });
        };
        let member = source.remove(pos);
        self.partition_mut(to).push(member);
        log::debug!("Context {id} moved from {from} to {to} partition");
        Ok(())
    }
}

/// The contexts linked by sharing relationships, and optionally the tracker of
/// the objects they share.
#[derive(Default)]
pub struct ShareGroup {
    state: Mutex<GroupState>,
}

impl ShareGroup {
    /// Creates an empty group without a tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `ctx` if it is not a member yet.
    ///
    /// The context lands in the live or dead partition according to its
    /// current "is created" flag. Returns `false` if it was already a member.
    pub fn add(&self, ctx: &Arc<dyn GlContext>) -> bool {
        let id = ctx.context_id();
        let mut state = lock(&self.state);
        state.prune();
        if state.contains(id) {
            return false;
        }
        let member = Member {
            id,
            handle: Arc::downgrade(ctx),
        };
        if ctx.is_created() {
            state.live.push(member);
        } else {
            state.dead.push(member);
        }
        true
    }

    /// Removes the context with `id` from whichever partition holds it.
    pub(crate) fn remove(&self, id: ContextId) -> bool {
        let mut state = lock(&self.state);
        let before = state.live.len() + state.dead.len();
        state.live.retain(|m| m.id != id);
        state.dead.retain(|m| m.id != id);
        before != state.live.len() + state.dead.len()
    }

    /// Returns `true` if the context with `id` is a member.
    pub fn contains(&self, id: ContextId) -> bool {
        lock(&self.state).contains(id)
    }

    /// Returns any live member other than `ignore`.
    pub fn created_share(&self, ignore: ContextId) -> Option<Arc<dyn GlContext>> {
        let state = lock(&self.state);
        state
            .live
            .iter()
            .filter(|m| m.id != ignore)
            .find_map(|m| m.handle.upgrade())
    }

    /// Moves `id` from the dead to the live partition.
    ///
    /// # Errors
    ///
    /// [`ConsistencyViolation::NotInPartition`] if `id` is not currently dead.
    pub fn context_created(&self, id: ContextId) -> Result<(), ConsistencyViolation> {
        lock(&self.state).transfer(id, Partition::Dead, Partition::Live)
    }

    /// Moves `id` from the live to the dead partition.
    ///
    /// # Errors
    ///
    /// [`ConsistencyViolation::NotInPartition`] if `id` is not currently live.
    pub fn context_destroyed(&self, id: ContextId) -> Result<(), ConsistencyViolation> {
        lock(&self.state).transfer(id, Partition::Live, Partition::Dead)
    }

    /// Returns `true` if the context with `id` is in the live partition.
    pub fn is_live(&self, id: ContextId) -> bool {
        lock(&self.state).live.iter().any(|m| m.id == id)
    }

    /// The ids of the live members.
    pub fn live_members(&self) -> Vec<ContextId> {
        lock(&self.state).live.iter().map(|m| m.id).collect()
    }

    /// The ids of the members that are not created or already destroyed.
    pub fn dead_members(&self) -> Vec<ContextId> {
        lock(&self.state).dead.iter().map(|m| m.id).collect()
    }

    /// Every member context that is still reachable.
    pub fn members(&self) -> Vec<Arc<dyn GlContext>> {
        let state = lock(&self.state);
        state
            .live
            .iter()
            .chain(state.dead.iter())
            .filter_map(|m| m.handle.upgrade())
            .collect()
    }

    /// Number of members, in both partitions.
    pub fn len(&self) -> usize {
        let state = lock(&self.state);
        state.live.len() + state.dead.len()
    }

    /// Returns `true` if the group has no member.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The group's object tracker, or `None` if tracking was never enabled.
    pub fn object_tracker(&self) -> Option<Arc<SharedObjectTracker>> {
        lock(&self.state).tracker.clone()
    }

    /// Returns the group's tracker, creating it on first use.
    pub fn ensure_object_tracker(&self) -> Arc<SharedObjectTracker> {
        let mut state = lock(&self.state);
        state
            .tracker
            .get_or_insert_with(|| {
                log::info!("Object tracking enabled for a share group");
                Arc::new(SharedObjectTracker::new())
            })
            .clone()
    }
}

impl fmt::Debug for ShareGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ShareGroup")
            .field("live", &state.live.iter().map(|m| m.id).collect::<Vec<_>>())
            .field("dead", &state.dead.iter().map(|m| m.id).collect::<Vec<_>>())
            .field("has_tracker", &state.tracker.is_some())
            .finish()
    }
}
