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

//! Glue for the boundary calls a context implementation makes.
//!
//! ```text
//! construction      attach(registry, ctx, share_with)
//! native create     native_created(registry, ctx)        retain + dead → live
//! make current      make_current(ctx)                    bind + pool clean
//! object alloc      ctx.share_slot().track_created(..)
//! object free       ctx.share_slot().track_deleted(..)
//! native destroy    native_destroyed(registry, ctx, pool) release + live → dead
//! ```

use crate::context::GlContext;
use crate::current::{CurrentContext, CurrentGuard};
use crate::error::{ShareError, ShareResult};
use crate::group::ShareGroup;
use crate::object::{DeletionPool, ReleaseOutcome};
use crate::registry::ShareGroupRegistry;
use std::sync::Arc;

/// Registers `ctx` (optionally sharing with `share_with`) and returns its group.
pub fn attach(
    registry: &ShareGroupRegistry,
    ctx: &Arc<dyn GlContext>,
    share_with: Option<&Arc<dyn GlContext>>,
) -> Arc<ShareGroup> {
    registry.register_sharing(ctx, share_with)
}

/// Handles the creation of the native context behind `ctx`.
///
/// Moves `ctx` into the live partition and takes a reference on its group
/// tracker, if it remembers one and does not hold a reference yet.
///
/// # Errors
///
/// Fails with a consistency violation on a duplicated notification; the
/// tracker is left untouched in that case.
pub fn native_created(registry: &ShareGroupRegistry, ctx: &dyn GlContext) -> ShareResult<()> {
    registry.context_created(ctx)?;
    if let Some(refs) = ctx.share_slot().retain_object_tracker() {
        log::trace!("Context {} retained its group tracker ({refs} refs)", ctx.context_id());
    }
    Ok(())
}

/// Binds `ctx` as current on this thread and drains its deletion pool.
pub fn make_current(ctx: Arc<dyn GlContext>) -> CurrentGuard {
    CurrentContext::bind(ctx)
}

/// Handles the destruction of the native context behind `ctx`.
///
/// Call it while `ctx` is still current so the group's objects can be deleted
/// in place when this was the last reference. The context then moves to the
/// dead partition.
///
/// Deletion failures are reported after the partition move has happened: the
/// teardown itself always completes.
///
/// # Errors
///
/// See [`SharedObjectTracker::release`](crate::object::SharedObjectTracker::release)
/// and [`ShareGroup::context_destroyed`].
pub fn native_destroyed(
    registry: &ShareGroupRegistry,
    ctx: &dyn GlContext,
    pool: &Arc<DeletionPool>,
) -> ShareResult<Option<ReleaseOutcome>> {
    let released = ctx.share_slot().release_object_tracker(pool);
    registry.context_destroyed(ctx)?;

    match released {
        None => Ok(None),
        Some(Ok(outcome)) => Ok(Some(outcome)),
        Some(Err(err @ ShareError::Deletion { .. })) => {
            log::warn!("Context {} teardown: {err}", ctx.context_id());
            Err(err)
        }
        Some(Err(err)) => Err(err),
    }
}
