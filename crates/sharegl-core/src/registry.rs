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

//! The entry point for sharing relationships and lifecycle notifications.
//!
//! The registry maps a [`ContextId`] to a `Weak` handle on its [`ShareGroup`].
//! It never owns a group: groups are kept alive by their members' slots, and
//! entries whose group is gone are swept lazily.
//!
//! Lock order is registry, then group, then slot, then tracker.

use crate::config::TrackingConfig;
use crate::context::{ContextId, GlContext};
use crate::error::ConsistencyViolation;
use crate::group::ShareGroup;
use crate::object::SharedObjectTracker;
use crate::utils::lock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, Weak};

static GLOBAL: OnceLock<ShareGroupRegistry> = OnceLock::new();

/// Associates contexts with the share group they belong to.
pub struct ShareGroupRegistry {
    config: TrackingConfig,
    groups: Mutex<HashMap<ContextId, Weak<ShareGroup>>>,
}

impl ShareGroupRegistry {
    /// Creates an empty registry with the given tracking policy.
    pub fn new(config: TrackingConfig) -> Self {
        Self {
            config,
            groups: Mutex::new(HashMap::new()),
        }
    }

    /// The process-wide registry.
    ///
    /// Its configuration is read from the environment on first access.
    pub fn global() -> &'static ShareGroupRegistry {
        GLOBAL.get_or_init(|| {
            let config = TrackingConfig::from_env();
            log::debug!("Global share group registry created ({config:?})");
            ShareGroupRegistry::new(config)
        })
    }

    /// The tracking policy of this registry.
    pub fn config(&self) -> TrackingConfig {
        self.config
    }

    /// Returns `true` if share groups track their objects.
    pub fn is_tracking_enabled(&self) -> bool {
        self.config.is_tracking_enabled()
    }

    /// Records that `ctx` shares its object namespace with `share_with`.
    ///
    /// The group of `ctx` is reused if it has one, else the group of
    /// `share_with`, else a new group is created. Both contexts end up in that
    /// group and remember it in their slots. The group's tracker, created here
    /// when tracking is enabled or already there from an explicit request, is
    /// propagated to both slots as well. A context that is live when it joins
    /// takes its reference on that tracker right away.
    ///
    /// If both contexts already belong to two different groups, the group of
    /// `ctx` wins and `share_with` alone is moved over; its former group-mates
    /// stay in the old group.
    pub fn register_sharing(
        &self,
        ctx: &Arc<dyn GlContext>,
        share_with: Option<&Arc<dyn GlContext>>,
    ) -> Arc<ShareGroup> {
        let mut groups = lock(&self.groups);
        groups.retain(|_, group| group.strong_count() > 0);

        let resolve = |c: &Arc<dyn GlContext>| {
            groups
                .get(&c.context_id())
                .and_then(Weak::upgrade)
        };
        let existing = resolve(ctx).or_else(|| share_with.and_then(resolve));
        let group = existing.unwrap_or_else(|| {
            log::debug!("New share group for context {}", ctx.context_id());
            Arc::new(ShareGroup::new())
        });

        let tracker = self
            .is_tracking_enabled()
            .then(|| group.ensure_object_tracker())
            .or_else(|| group.object_tracker());

        for member in std::iter::once(ctx).chain(share_with) {
            let id = member.context_id();
            if let Some(previous) = groups.get(&id).and_then(Weak::upgrade) {
                if !Arc::ptr_eq(&previous, &group) {
                    log::warn!("Context {id} leaves its share group without its group-mates");
                    previous.remove(id);
                }
            }
            group.add(member);
            groups.insert(id, Arc::downgrade(&group));
            member.share_slot().set_group(group.clone());
            if let Some(tracker) = &tracker {
                hand_over(&**member, tracker, group.is_live(id));
            }
        }

        if let Some(other) = share_with {
            log::debug!(
                "Registered sharing between contexts {} and {}",
                ctx.context_id(),
                other.context_id()
            );
        }
        group
    }

    /// The share group of the context with `id`, if it has one.
    pub fn group_of(&self, id: ContextId) -> Option<Arc<ShareGroup>> {
        lock(&self.groups).get(&id).and_then(Weak::upgrade)
    }

    /// Returns `true` if the context with `id` belongs to a group.
    pub fn is_shared(&self, id: ContextId) -> bool {
        self.group_of(id).is_some()
    }

    /// Returns a live member of `ctx`'s group other than `ctx` itself.
    ///
    /// A new native context is created "shared with" the returned one.
    pub fn shareable_context(&self, ctx: &dyn GlContext) -> Option<Arc<dyn GlContext>> {
        let id = ctx.context_id();
        self.group_of(id)?.created_share(id)
    }

    /// Notifies that the native context behind `ctx` was created.
    ///
    /// A context without a group is ignored.
    ///
    /// # Errors
    ///
    /// [`ConsistencyViolation::NotInPartition`] if `ctx` was already live.
    pub fn context_created(&self, ctx: &dyn GlContext) -> Result<(), ConsistencyViolation> {
        match self.group_of(ctx.context_id()) {
            Some(group) => group.context_created(ctx.context_id()),
            None => Ok(()),
        }
    }

    /// Notifies that the native context behind `ctx` was destroyed.
    ///
    /// A context without a group is ignored.
    ///
    /// # Errors
    ///
    /// [`ConsistencyViolation::NotInPartition`] if `ctx` was not live.
    pub fn context_destroyed(&self, ctx: &dyn GlContext) -> Result<(), ConsistencyViolation> {
        match self.group_of(ctx.context_id()) {
            Some(group) => group.context_destroyed(ctx.context_id()),
            None => Ok(()),
        }
    }

    /// The object tracker of `ctx`'s group, if the group has one.
    pub fn object_tracker(&self, ctx: &dyn GlContext) -> Option<Arc<SharedObjectTracker>> {
        self.group_of(ctx.context_id())?.object_tracker()
    }

    /// Turns on object tracking for `ctx`'s group on demand.
    ///
    /// This works regardless of the configured policy, which only decides
    /// whether [`register_sharing`](Self::register_sharing) does it up front.
    /// The tracker is created if needed and remembered by every reachable
    /// member. Members that are already live take their reference on it, as
    /// [`native_created`](crate::lifecycle::native_created) would have done.
    /// Returns `None` when `ctx` has no group.
    pub fn enable_object_tracking(&self, ctx: &dyn GlContext) -> Option<Arc<SharedObjectTracker>> {
        let groups = lock(&self.groups);
        let group = groups.get(&ctx.context_id()).and_then(Weak::upgrade)?;
        let tracker = group.ensure_object_tracker();
        for member in group.members() {
            hand_over(&*member, &tracker, group.is_live(member.context_id()));
        }
        Some(tracker)
    }

    /// Drops entries whose group no longer exists. Returns how many were removed.
    pub fn purge(&self) -> usize {
        let mut groups = lock(&self.groups);
        let before = groups.len();
        groups.retain(|_, group| group.strong_count() > 0);
        before - groups.len()
    }

    /// Number of contexts with a reachable group.
    pub fn len(&self) -> usize {
        lock(&self.groups)
            .values()
            .filter(|group| group.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no context has a reachable group.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Makes `tracker` the tracker remembered by `member`.
///
/// A reference the member held on a different tracker is given back through
/// its deletion pool.
fn hand_over(member: &dyn GlContext, tracker: &Arc<SharedObjectTracker>, live: bool) {
    let slot = member.share_slot();
    let Some(previous) = slot.adopt_object_tracker(tracker.clone(), live) else {
        return;
    };
    let id = member.context_id();
    match slot.deletion_pool() {
        Some(pool) => {
            if let Err(err) = previous.release(&pool) {
                log::warn!("Context {id} could not release its previous tracker: {err}");
            }
        }
        None => log::warn!("Context {id} keeps a reference on its previous tracker: no deletion pool"),
    }
}

impl Default for ShareGroupRegistry {
    fn default() -> Self {
        Self::new(TrackingConfig::default())
    }
}

impl fmt::Debug for ShareGroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShareGroupRegistry")
            .field("config", &self.config)
            .field("contexts", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_is_a_single_instance() {
        let first = ShareGroupRegistry::global() as *const ShareGroupRegistry;
        let second = ShareGroupRegistry::global() as *const ShareGroupRegistry;
        assert_eq!(first, second);
    }

    #[test]
    fn default_registry_is_empty_and_untracked() {
        let registry = ShareGroupRegistry::default();
        assert!(registry.is_empty());
        assert!(!registry.is_tracking_enabled());
        assert_eq!(registry.purge(), 0);
    }
}
