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

#![allow(dead_code)]

use sharegl_core::{
    ContextId, DeletionError, GlContext, ObjectDeleter, ObjectId, ObjectKind, ShareSlot,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// A context without a native backend that records every deletion call.
pub struct MockContext {
    id: ContextId,
    created: AtomicBool,
    slot: ShareSlot,
    deleted: Mutex<Vec<(ObjectKind, ObjectId)>>,
    failing: Mutex<HashSet<(ObjectKind, ObjectId)>>,
}

impl MockContext {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: ContextId::next(),
            created: AtomicBool::new(false),
            slot: ShareSlot::new(),
            deleted: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
        })
    }

    /// A context whose native side already exists.
    pub fn created() -> Arc<Self> {
        let ctx = Self::new();
        ctx.set_created(true);
        ctx
    }

    pub fn set_created(&self, created: bool) {
        self.created.store(created, Ordering::SeqCst);
    }

    /// Makes every future deletion of `(kind, id)` fail.
    pub fn fail_on(&self, kind: ObjectKind, id: ObjectId) {
        self.failing.lock().unwrap().insert((kind, id));
    }

    /// Lets previously failing deletions succeed again.
    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn deleted(&self) -> Vec<(ObjectKind, ObjectId)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }

    fn delete(&self, kind: ObjectKind, id: ObjectId) -> Result<(), DeletionError> {
        if self.failing.lock().unwrap().contains(&(kind, id)) {
            return Err(DeletionError::new(kind, id, "GL_INVALID_OPERATION"));
        }
        self.deleted.lock().unwrap().push((kind, id));
        Ok(())
    }
}

impl ObjectDeleter for MockContext {
    fn delete_buffer(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Buffer, id)
    }
    fn delete_texture(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Texture, id)
    }
    fn delete_program(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Program, id)
    }
    fn delete_shader(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Shader, id)
    }
    fn delete_query(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Query, id)
    }
    fn delete_renderbuffer(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Renderbuffer, id)
    }
    fn delete_framebuffer(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Framebuffer, id)
    }
    fn delete_fence(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Fence, id)
    }
    fn delete_display_list(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::DisplayList, id)
    }
    fn delete_vertex_array(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::VertexArray, id)
    }
    fn delete_sampler(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::Sampler, id)
    }
    fn delete_transform_feedback(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::TransformFeedback, id)
    }
    fn delete_program_pipeline(&self, id: ObjectId) -> Result<(), DeletionError> {
        self.delete(ObjectKind::ProgramPipeline, id)
    }
}

impl GlContext for MockContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn is_created(&self) -> bool {
        self.created.load(Ordering::SeqCst)
    }

    fn share_slot(&self) -> &ShareSlot {
        &self.slot
    }
}

/// Erases the concrete type, as the context layer would.
pub fn as_dyn(ctx: &Arc<MockContext>) -> Arc<dyn GlContext> {
    ctx.clone()
}

pub fn ids(raw: &[u64]) -> Vec<ObjectId> {
    raw.iter().copied().map(ObjectId).collect()
}
