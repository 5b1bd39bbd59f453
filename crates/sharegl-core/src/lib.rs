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

//! # ShareGL Core
//!
//! Bookkeeping for GPU objects shared between rendering contexts.
//!
//! Several contexts can share one server-side object namespace. This crate
//! records which contexts form a [`ShareGroup`], tracks the objects the group
//! owns in a [`SharedObjectTracker`], and makes sure those objects are deleted
//! exactly once, after the last context using them is gone. When no suitable
//! context is current at that moment, the ids are parked in a deletion pool
//! and deleted the next time a context of the pool is made current.

#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod current;
pub mod error;
pub mod group;
pub mod lifecycle;
pub mod object;
pub mod registry;

mod utils;

pub use config::TrackingConfig;
pub use context::{ContextId, GlContext, ShareSlot};
pub use current::{CurrentContext, CurrentGuard};
pub use error::{ConsistencyViolation, DeletionError, Partition, ShareError, ShareResult};
pub use group::ShareGroup;
pub use object::{
    DeletionPool, ObjectDeleter, ObjectId, ObjectKind, ReleaseOutcome, SharedObjectTracker,
    TrackerReport,
};
pub use registry::ShareGroupRegistry;
