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

//! Thread-local record of the context that is current on the calling thread.
//!
//! Native APIs keep the current context in thread-local state. The context
//! layer mirrors every successful native "make current" here, which is how a
//! tracker decides whether it may issue deletion calls right now.
//!
//! ```ignore
//! let _guard = CurrentContext::bind(ctx.clone());
//! // ... native calls against `ctx` ...
//! // dropping the guard restores the previous binding
//! ```

use crate::context::{ContextId, GlContext};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

thread_local! {
    static CURRENT: RefCell<Option<Arc<dyn GlContext>>> = const { RefCell::new(None) };
}

/// Access point for the per-thread current context.
pub struct CurrentContext;

impl CurrentContext {
    /// Records `ctx` as current on this thread and drains its deletion pool.
    ///
    /// The previous binding is restored when the returned guard is dropped.
    /// Deletion failures while draining are logged and left in the pool.
    #[must_use = "the binding is undone when the guard is dropped"]
    pub fn bind(ctx: Arc<dyn GlContext>) -> CurrentGuard {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(ctx.clone()));
        log::trace!("Context {} bound as current", ctx.context_id());

        if let Some(pool) = ctx.share_slot().deletion_pool() {
            pool.clean(&*ctx);
        }

        CurrentGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Returns the context current on this thread, if any.
    pub fn get() -> Option<Arc<dyn GlContext>> {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Returns the id of the context current on this thread, if any.
    pub fn id() -> Option<ContextId> {
        CURRENT.with(|current| current.borrow().as_ref().map(|ctx| ctx.context_id()))
    }

    /// Returns `true` if some context is current on this thread.
    pub fn is_bound() -> bool {
        CURRENT.with(|current| current.borrow().is_some())
    }
}

/// Restores the previous binding when dropped.
///
/// The guard is tied to the thread that created it.
pub struct CurrentGuard {
    previous: Option<Arc<dyn GlContext>>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // `try_with` because the guard may outlive the TLS slot during thread teardown.
        let _ = CURRENT.try_with(|current| {
            *current.borrow_mut() = previous;
        });
    }
}
