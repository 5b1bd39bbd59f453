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

//! A [`GlContext`] over a `glow::Context`.
//!
//! The windowing layer owns the native context and its function table; a
//! `GlowContext` only records whether that native context exists and issues
//! deletion calls through it. Deletions are only ever requested while the
//! context is current on the calling thread.

use anyhow::{ensure, Result};
use glow::HasContext;
use sharegl_core::{
    ContextId, DeletionError, GlContext, ObjectDeleter, ObjectId, ObjectKind, ShareSlot,
};
use std::ffi::c_void;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};

/// A rendering context backed by `glow`.
pub struct GlowContext {
    gl: glow::Context,
    id: ContextId,
    created: AtomicBool,
    slot: ShareSlot,
}

// SAFETY: the function table inside `glow::Context` is immutable after loading.
// GL calls are only issued by the thread the native context is current on,
// which `CurrentContext` enforces for every deletion path.
unsafe impl Send for GlowContext {}
unsafe impl Sync for GlowContext {}

impl GlowContext {
    /// Wraps an already loaded `glow` function table.
    ///
    /// The context starts out as not created; call
    /// [`mark_created`](Self::mark_created) once the native context exists.
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            id: ContextId::next(),
            created: AtomicBool::new(false),
            slot: ShareSlot::new(),
        }
    }

    /// Loads the GL function table through `loader` and wraps it.
    ///
    /// # Safety
    ///
    /// A native context must be current on this thread, and `loader` must
    /// return addresses valid for that context.
    pub unsafe fn from_loader<F>(mut loader: F) -> Result<Self>
    where
        F: FnMut(&str) -> *const c_void,
    {
        ensure!(
            !loader("glGetString").is_null(),
            "GL loader could not resolve glGetString; is a context current?"
        );
        let gl = glow::Context::from_loader_function(loader);
        let version = gl.version();
        log::info!(
            "Loaded GL {}.{}{} function table",
            version.major,
            version.minor,
            if version.is_embedded { " ES" } else { "" }
        );
        Ok(Self::new(gl))
    }

    /// The wrapped function table.
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    /// Records that the native context now exists.
    pub fn mark_created(&self) {
        self.created.store(true, Ordering::Release);
    }

    /// Records that the native context was destroyed.
    pub fn mark_destroyed(&self) {
        self.created.store(false, Ordering::Release);
    }

    /// Discards error codes left behind by earlier GL calls.
    fn clear_errors(&self) {
        // SAFETY: see the module docs; the context is current.
        let stale = drain_errors(|| unsafe { self.gl.get_error() });
        if stale > 0 {
            log::trace!("Context {} discarded {stale} stale GL error(s)", self.id);
        }
    }

    fn check_error(&self, kind: ObjectKind, id: ObjectId) -> Result<(), DeletionError> {
        // SAFETY: see the module docs; the context is current.
        let code = unsafe { self.gl.get_error() };
        if code == glow::NO_ERROR {
            Ok(())
        } else {
            Err(DeletionError::new(kind, id, gl_error_name(code)))
        }
    }
}

/// Converts a tracked id into a GL object name.
///
/// Zero is never a valid name, and GL names are 32-bit.
fn native_name(kind: ObjectKind, id: ObjectId) -> Result<NonZeroU32, DeletionError> {
    u32::try_from(id.0)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| DeletionError::new(kind, id, "not a valid GL object name"))
}

/// Upper bound on error flags read in one drain. A lost context may keep
/// reporting errors, so the drain never loops unbounded.
const MAX_STALE_ERRORS: usize = 16;

/// Reads error codes through `next` until `NO_ERROR`. Returns how many were
/// discarded.
fn drain_errors(mut next: impl FnMut() -> u32) -> usize {
    (0..MAX_STALE_ERRORS)
        .take_while(|_| next() != glow::NO_ERROR)
        .count()
}

fn gl_error_name(code: u32) -> String {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM".to_owned(),
        glow::INVALID_VALUE => "GL_INVALID_VALUE".to_owned(),
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION".to_owned(),
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY".to_owned(),
        other => format!("GL error 0x{other:04x}"),
    }
}

macro_rules! delete_named {
    ($($method:ident => $kind:ident, $native:ident;)*) => {
        $(
            fn $method(&self, id: ObjectId) -> Result<(), DeletionError> {
                let name = native_name(ObjectKind::$kind, id)?;
                self.clear_errors();
                // SAFETY: see the module docs; the context is current.
                unsafe { self.gl.$method(glow::$native(name)) };
                self.check_error(ObjectKind::$kind, id)
            }
        )*
    };
}

impl ObjectDeleter for GlowContext {
    delete_named! {
        delete_buffer => Buffer, NativeBuffer;
        delete_texture => Texture, NativeTexture;
        delete_program => Program, NativeProgram;
        delete_shader => Shader, NativeShader;
        delete_query => Query, NativeQuery;
        delete_renderbuffer => Renderbuffer, NativeRenderbuffer;
        delete_framebuffer => Framebuffer, NativeFramebuffer;
        delete_vertex_array => VertexArray, NativeVertexArray;
        delete_sampler => Sampler, NativeSampler;
        delete_transform_feedback => TransformFeedback, NativeTransformFeedback;
        delete_program_pipeline => ProgramPipeline, NativeProgramPipeline;
    }

    fn delete_fence(&self, id: ObjectId) -> Result<(), DeletionError> {
        if id.0 == 0 {
            return Err(DeletionError::new(ObjectKind::Fence, id, "null sync object"));
        }
        // Fences are tracked by the address of their GLsync handle.
        let sync = glow::NativeFence(id.0 as usize as _);
        self.clear_errors();
        // SAFETY: see the module docs; the context is current.
        unsafe { self.gl.delete_sync(sync) };
        self.check_error(ObjectKind::Fence, id)
    }

    fn delete_display_list(&self, id: ObjectId) -> Result<(), DeletionError> {
        // `glow` targets core profiles, which have no display lists.
        Err(DeletionError::unsupported(ObjectKind::DisplayList, id))
    }
}

impl GlContext for GlowContext {
    fn context_id(&self) -> ContextId {
        self.id
    }

    fn is_created(&self) -> bool {
        self.created.load(Ordering::Acquire)
    }

    fn share_slot(&self) -> &ShareSlot {
        &self.slot
    }
}

impl fmt::Debug for GlowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlowContext")
            .field("id", &self.id)
            .field("created", &self.is_created())
            .field("slot", &self.slot)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_name_rejects_zero_and_wide_ids() {
        assert_eq!(
            native_name(ObjectKind::Buffer, ObjectId(5)).unwrap().get(),
            5
        );
        let zero = native_name(ObjectKind::Buffer, ObjectId(0)).unwrap_err();
        assert_eq!(zero.kind, ObjectKind::Buffer);
        let wide = native_name(ObjectKind::Texture, ObjectId(u64::from(u32::MAX) + 1));
        assert!(wide.is_err());
    }

    #[test]
    fn gl_error_names_are_readable() {
        assert_eq!(gl_error_name(glow::INVALID_OPERATION), "GL_INVALID_OPERATION");
        assert_eq!(gl_error_name(0x1234), "GL error 0x1234");
    }

    #[test]
    fn drain_errors_stops_at_no_error() {
        let mut codes = [
            glow::INVALID_ENUM,
            glow::INVALID_VALUE,
            glow::NO_ERROR,
            glow::OUT_OF_MEMORY,
        ]
        .into_iter();
        let drained = drain_errors(|| codes.next().unwrap_or(glow::NO_ERROR));
        assert_eq!(drained, 2);
        assert_eq!(codes.next(), Some(glow::OUT_OF_MEMORY));
    }

    #[test]
    fn drain_errors_is_bounded() {
        let mut reads = 0;
        let drained = drain_errors(|| {
            reads += 1;
            glow::OUT_OF_MEMORY
        });
        assert_eq!(drained, MAX_STALE_ERRORS);
        assert_eq!(reads, MAX_STALE_ERRORS);
    }

    #[test]
    fn clean_drain_reads_once() {
        let mut reads = 0;
        assert_eq!(
            drain_errors(|| {
                reads += 1;
                glow::NO_ERROR
            }),
            0
        );
        assert_eq!(reads, 1);
    }
}
