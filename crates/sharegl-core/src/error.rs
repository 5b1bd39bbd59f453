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

//! Defines the error types surfaced by share-group bookkeeping.
//!
//! Three categories exist:
//! - [`ConsistencyViolation`]: the integration broke a calling protocol
//!   (double create/destroy notification, unbalanced release). Nothing is
//!   mutated when one is detected.
//! - [`DeletionError`]: a native deletion call failed. The affected ids are kept
//!   for a later retry.
//! - A context without a share group is not an error at all; group-dependent
//!   operations simply do nothing.

use crate::context::ContextId;
use crate::object::{ObjectId, ObjectKind};
use thiserror::Error;

/// Which partition of a share group a context was expected to occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Contexts backed by a live native context.
    Live,
    /// Contexts that were not created yet, or were already destroyed.
    Dead,
}

impl std::fmt::Display for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partition::Live => write!(f, "live"),
            Partition::Dead => write!(f, "dead"),
        }
    }
}

/// An internal invariant would have been broken by the requested operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyViolation {
    /// A lifecycle notification found the context outside the partition it
    /// must currently occupy.
    #[error("context {context} was not found in the {expected} partition of its share group")]
    NotInPartition {
        /// The context named by the notification.
        context: ContextId,
        /// The partition the context was expected to be found in.
        expected: Partition,
    },
    /// A tracker was released more times than it was retained.
    #[error("shared object tracker released with a reference count of zero")]
    RefCountUnderflow,
}

/// A native deletion call failed for one object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to delete {} {id}: {reason}", kind.label())]
pub struct DeletionError {
    /// The kind of the object that could not be deleted.
    pub kind: ObjectKind,
    /// The name of the object that could not be deleted.
    pub id: ObjectId,
    /// Backend-provided description of the failure.
    pub reason: String,
}

impl DeletionError {
    /// Creates a new deletion error.
    pub fn new(kind: ObjectKind, id: ObjectId, reason: impl Into<String>) -> Self {
        Self {
            kind,
            id,
            reason: reason.into(),
        }
    }

    /// Creates the error reported by backends that cannot delete `kind` at all.
    pub fn unsupported(kind: ObjectKind, id: ObjectId) -> Self {
        Self::new(kind, id, "object kind is not supported by this context")
    }
}

/// The error type returned by tracker and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    /// See [`ConsistencyViolation`].
    #[error(transparent)]
    Consistency(#[from] ConsistencyViolation),
    /// One or more objects could not be deleted. They were handed to the
    /// deletion pool and will be retried by a later clean.
    #[error("{failed} object(s) could not be deleted, last error: {last}")]
    Deletion {
        /// How many ids failed to delete.
        failed: usize,
        /// The last failure encountered while draining.
        last: DeletionError,
    },
}

/// A specialized `Result` type for share-group operations.
pub type ShareResult<T> = Result<T, ShareError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn deletion_error_display_uses_kind_label() {
        let err = DeletionError::new(ObjectKind::Texture, ObjectId(7), "GL_INVALID_VALUE");
        assert_eq!(format!("{err}"), "failed to delete texture 7: GL_INVALID_VALUE");
    }

    #[test]
    fn consistency_violation_display() {
        let err = ConsistencyViolation::NotInPartition {
            context: ContextId::from_raw(3),
            expected: Partition::Dead,
        };
        assert_eq!(
            format!("{err}"),
            "context #3 was not found in the dead partition of its share group"
        );
    }

    #[test]
    fn share_error_wraps_consistency_transparently() {
        let err: ShareError = ConsistencyViolation::RefCountUnderflow.into();
        assert_eq!(
            format!("{err}"),
            "shared object tracker released with a reference count of zero"
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn share_error_deletion_display() {
        let err = ShareError::Deletion {
            failed: 2,
            last: DeletionError::unsupported(ObjectKind::DisplayList, ObjectId(1)),
        };
        assert_eq!(
            format!("{err}"),
            "2 object(s) could not be deleted, last error: failed to delete display list 1: \
             object kind is not supported by this context"
        );
    }
}
