use glvk_core::geometry::GeometryLayout;
use glvk_core::objects::{
    FramebufferAttachment, GlObject, GlObjects, ProgramDesc, SamplerDesc, TextureDesc,
    TextureViewDesc,
};
use glvk_core::CoreError;
use parking_lot::{Mutex, MutexGuard};
use tracing::debug;

use crate::backend::GlBackend;
use crate::error::BackendError;

struct ContextState<B> {
    backend: B,
    /// Bound for draws without vertex input.
    empty_vao: Option<u32>,
}

/// A GL context shared between the device, which creates objects on it, and
/// queues, which replay streams on it. Every use goes through the lock.
pub struct GlContext<B> {
    state: Mutex<ContextState<B>>,
}

impl<B: GlBackend> GlContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            state: Mutex::new(ContextState {
                backend,
                empty_vao: None,
            }),
        }
    }

    /// Block until the context is free.
    pub fn lock(&self) -> ContextLock<'_, B> {
        ContextLock {
            guard: self.state.lock(),
            calls: 0,
        }
    }

    pub fn try_lock(&self) -> Option<ContextLock<'_, B>> {
        self.state.try_lock().map(|guard| ContextLock { guard, calls: 0 })
    }

    pub fn into_backend(self) -> B {
        self.state.into_inner().backend
    }
}

/// Exclusive use of the context for the lifetime of the value.
pub struct ContextLock<'a, B> {
    guard: MutexGuard<'a, ContextState<B>>,
    calls: usize,
}

impl<B: GlBackend> ContextLock<'_, B> {
    /// The backend, counting one issued call.
    pub fn gl(&mut self) -> &mut B {
        self.calls += 1;
        &mut self.guard.backend
    }

    pub fn backend(&self) -> &B {
        &self.guard.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.guard.backend
    }

    /// Calls issued through [`gl`](Self::gl) since the lock was taken.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn empty_vertex_array(&mut self) -> Result<u32, BackendError> {
        if let Some(vao) = self.guard.empty_vao {
            return Ok(vao);
        }
        let vao = self.gl().create_vertex_array(&GeometryLayout::default())?;
        debug!(vao, "empty vertex array created");
        self.guard.empty_vao = Some(vao);
        Ok(vao)
    }
}

impl<B: GlBackend + Send> GlObjects for GlContext<B> {
    fn create_buffer(&self, size: u64) -> Result<u32, CoreError> {
        Ok(self.lock().gl().create_buffer(size)?)
    }

    fn create_texture(&self, desc: &TextureDesc) -> Result<u32, CoreError> {
        Ok(self.lock().gl().create_texture(desc)?)
    }

    fn create_texture_view(&self, desc: &TextureViewDesc) -> Result<u32, CoreError> {
        Ok(self.lock().gl().create_texture_view(desc)?)
    }

    fn create_buffer_texture(
        &self,
        buffer: u32,
        internal_format: u32,
        offset: u64,
        size: u64,
    ) -> Result<u32, CoreError> {
        Ok(self
            .lock()
            .gl()
            .create_buffer_texture(buffer, internal_format, offset, size)?)
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> Result<u32, CoreError> {
        Ok(self.lock().gl().create_sampler(desc)?)
    }

    fn create_program(&self, desc: &ProgramDesc) -> Result<u32, CoreError> {
        let mut ctx = self.lock();
        let name = ctx.gl().create_program(desc)?;
        for assignment in &desc.bindings {
            ctx.gl().bind_program_resource(name, assignment);
        }
        Ok(name)
    }

    fn create_framebuffer(&self, attachments: &[FramebufferAttachment]) -> Result<u32, CoreError> {
        Ok(self.lock().gl().create_framebuffer(attachments)?)
    }

    fn create_queries(&self, count: u32) -> Result<Vec<u32>, CoreError> {
        Ok(self.lock().gl().create_queries(count)?)
    }

    fn delete_object(&self, object: GlObject) {
        self.lock().gl().delete_object(object);
    }
}
