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

//! The closed table of shareable GPU object kinds and their deletion procedures.

use crate::error::DeletionError;
use std::fmt;
use std::ops::{Index, IndexMut};

/// The server-side name of a GPU object.
///
/// GL names are 32-bit, but sync objects are pointer-sized handles, so the id
/// is stored as a `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ObjectId {
    fn from(name: u32) -> Self {
        ObjectId(u64::from(name))
    }
}

/// A category of server-side GPU object that can live in a shared namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Buffer objects (`glGenBuffers`).
    Buffer,
    /// Texture objects.
    Texture,
    /// Linked program objects.
    Program,
    /// Shader objects.
    Shader,
    /// Query objects.
    Query,
    /// Renderbuffer objects.
    Renderbuffer,
    /// Framebuffer objects.
    Framebuffer,
    /// Sync objects (`glFenceSync`).
    Fence,
    /// Legacy display lists.
    DisplayList,
    /// Vertex array objects.
    VertexArray,
    /// Sampler objects.
    Sampler,
    /// Transform feedback objects.
    TransformFeedback,
    /// Separable program pipelines.
    ProgramPipeline,
}

impl ObjectKind {
    /// Number of kinds in the table.
    pub const COUNT: usize = 13;

    /// Every kind, in table order.
    pub const ALL: [ObjectKind; Self::COUNT] = [
        ObjectKind::Buffer,
        ObjectKind::Texture,
        ObjectKind::Program,
        ObjectKind::Shader,
        ObjectKind::Query,
        ObjectKind::Renderbuffer,
        ObjectKind::Framebuffer,
        ObjectKind::Fence,
        ObjectKind::DisplayList,
        ObjectKind::VertexArray,
        ObjectKind::Sampler,
        ObjectKind::TransformFeedback,
        ObjectKind::ProgramPipeline,
    ];

    /// Returns the slot of this kind in [`KIND_TABLE`].
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the table entry for this kind.
    #[inline]
    pub fn entry(self) -> &'static KindEntry {
        &KIND_TABLE[self.index()]
    }

    /// Returns a human-readable label, e.g. `"vertex array"`.
    pub fn label(self) -> &'static str {
        self.entry().label
    }

    /// Deletes one object of this kind through `deleter`.
    pub fn delete(self, deleter: &dyn ObjectDeleter, id: ObjectId) -> Result<(), DeletionError> {
        (self.entry().delete)(deleter, id)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The native deletion procedures of a rendering context.
///
/// Every method is invoked only while the implementing context is current on
/// the calling thread.
pub trait ObjectDeleter {
    /// Deletes a buffer object.
    fn delete_buffer(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a texture object.
    fn delete_texture(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a program object.
    fn delete_program(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a shader object.
    fn delete_shader(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a query object.
    fn delete_query(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a renderbuffer object.
    fn delete_renderbuffer(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a framebuffer object.
    fn delete_framebuffer(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a sync object.
    fn delete_fence(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a display list.
    fn delete_display_list(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a vertex array object.
    fn delete_vertex_array(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a sampler object.
    fn delete_sampler(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a transform feedback object.
    fn delete_transform_feedback(&self, id: ObjectId) -> Result<(), DeletionError>;
    /// Deletes a program pipeline object.
    fn delete_program_pipeline(&self, id: ObjectId) -> Result<(), DeletionError>;
}

/// Signature of a per-kind deletion procedure.
pub type DeleteFn = fn(&dyn ObjectDeleter, ObjectId) -> Result<(), DeletionError>;

/// One row of the kind table.
#[derive(Debug)]
pub struct KindEntry {
    /// The kind this row describes.
    pub kind: ObjectKind,
    /// Human-readable label.
    pub label: &'static str,
    /// The deletion procedure.
    pub delete: DeleteFn,
}

/// The kind table, indexed by [`ObjectKind::index`].
pub static KIND_TABLE: [KindEntry; ObjectKind::COUNT] = [
    KindEntry {
        kind: ObjectKind::Buffer,
        label: "buffer",
        delete: |d, id| d.delete_buffer(id),
    },
    KindEntry {
        kind: ObjectKind::Texture,
        label: "texture",
        delete: |d, id| d.delete_texture(id),
    },
    KindEntry {
        kind: ObjectKind::Program,
        label: "program",
        delete: |d, id| d.delete_program(id),
    },
    KindEntry {
        kind: ObjectKind::Shader,
        label: "shader",
        delete: |d, id| d.delete_shader(id),
    },
    KindEntry {
        kind: ObjectKind::Query,
        label: "query",
        delete: |d, id| d.delete_query(id),
    },
    KindEntry {
        kind: ObjectKind::Renderbuffer,
        label: "renderbuffer",
        delete: |d, id| d.delete_renderbuffer(id),
    },
    KindEntry {
        kind: ObjectKind::Framebuffer,
        label: "framebuffer",
        delete: |d, id| d.delete_framebuffer(id),
    },
    KindEntry {
        kind: ObjectKind::Fence,
        label: "fence",
        delete: |d, id| d.delete_fence(id),
    },
    KindEntry {
        kind: ObjectKind::DisplayList,
        label: "display list",
        delete: |d, id| d.delete_display_list(id),
    },
    KindEntry {
        kind: ObjectKind::VertexArray,
        label: "vertex array",
        delete: |d, id| d.delete_vertex_array(id),
    },
    KindEntry {
        kind: ObjectKind::Sampler,
        label: "sampler",
        delete: |d, id| d.delete_sampler(id),
    },
    KindEntry {
        kind: ObjectKind::TransformFeedback,
        label: "transform feedback",
        delete: |d, id| d.delete_transform_feedback(id),
    },
    KindEntry {
        kind: ObjectKind::ProgramPipeline,
        label: "program pipeline",
        delete: |d, id| d.delete_program_pipeline(id),
    },
];

/// A fixed array holding one `T` per [`ObjectKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerKind<T>([T; ObjectKind::COUNT]);

impl<T: Default> Default for PerKind<T> {
    fn default() -> Self {
        Self(std::array::from_fn(|_| T::default()))
    }
}

impl<T> PerKind<T> {
    /// Builds the array by evaluating `f` for every kind.
    pub fn from_fn(mut f: impl FnMut(ObjectKind) -> T) -> Self {
        Self(std::array::from_fn(|i| f(ObjectKind::ALL[i])))
    }

    /// Iterates `(kind, &value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectKind, &T)> {
        ObjectKind::ALL.iter().copied().zip(self.0.iter())
    }

    /// Iterates `(kind, &mut value)` pairs in table order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ObjectKind, &mut T)> {
        ObjectKind::ALL.iter().copied().zip(self.0.iter_mut())
    }
}

impl<T> Index<ObjectKind> for PerKind<T> {
    type Output = T;

    fn index(&self, kind: ObjectKind) -> &T {
        &self.0[kind.index()]
    }
}

impl<T> IndexMut<ObjectKind> for PerKind<T> {
    fn index_mut(&mut self, kind: ObjectKind) -> &mut T {
        &mut self.0[kind.index()]
    }
}
