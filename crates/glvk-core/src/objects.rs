//! Creation of GL objects backing device resources.
//!
//! Device objects need real GL names when they are created (records carry
//! names, not handles), so the device goes through [`GlObjects`], which the
//! replay context implements by taking its lock.

use std::sync::atomic::{AtomicU32, Ordering};

use ash::vk;
use parking_lot::Mutex;

use crate::binding::BindingAssignment;
use crate::error::CoreError;

/// Immutable texture storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    pub target: u32,
    pub internal_format: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub layers: u32,
    pub levels: u32,
    pub samples: u32,
}

/// A `glTextureView` over an existing texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureViewDesc {
    pub texture: u32,
    pub target: u32,
    pub internal_format: u32,
    pub min_level: u32,
    pub levels: u32,
    pub min_layer: u32,
    pub layers: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub min_filter: u32,
    pub mag_filter: u32,
    pub wrap_s: u32,
    pub wrap_t: u32,
    pub wrap_r: u32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub lod_bias: f32,
    pub max_anisotropy: f32,
    /// Depth compare function, if comparison is enabled.
    pub compare_func: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStage {
    pub stage: vk::ShaderStageFlags,
    pub glsl: String,
}

/// Sources plus the binding assignments to apply after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramDesc {
    pub stages: Vec<ProgramStage>,
    pub bindings: Vec<BindingAssignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferAttachment {
    /// `gl::COLOR_ATTACHMENT0 + i`, `gl::DEPTH_ATTACHMENT`, ...
    pub point: u32,
    pub texture: u32,
    pub level: i32,
    /// Single layer, or `None` to attach every layer.
    pub layer: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlObject {
    Buffer(u32),
    Texture(u32),
    Sampler(u32),
    Program(u32),
    Framebuffer(u32),
    Query(u32),
}

pub trait GlObjects: Send + Sync {
    fn create_buffer(&self, size: u64) -> Result<u32, CoreError>;
    fn create_texture(&self, desc: &TextureDesc) -> Result<u32, CoreError>;
    fn create_texture_view(&self, desc: &TextureViewDesc) -> Result<u32, CoreError>;
    fn create_buffer_texture(
        &self,
        buffer: u32,
        internal_format: u32,
        offset: u64,
        size: u64,
    ) -> Result<u32, CoreError>;
    fn create_sampler(&self, desc: &SamplerDesc) -> Result<u32, CoreError>;
    fn create_program(&self, desc: &ProgramDesc) -> Result<u32, CoreError>;
    fn create_framebuffer(&self, attachments: &[FramebufferAttachment]) -> Result<u32, CoreError>;
    fn create_queries(&self, count: u32) -> Result<Vec<u32>, CoreError>;
    fn delete_object(&self, object: GlObject);
}

/// Hands out increasing names without a GL context. Records what was deleted.
/// Used for recording-only tools and tests.
pub struct SequentialObjects {
    next: AtomicU32,
    programs: Mutex<Vec<ProgramDesc>>,
    deleted: Mutex<Vec<GlObject>>,
}

impl SequentialObjects {
    pub fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
            programs: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
        }
    }

    fn name(&self) -> u32 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn programs(&self) -> Vec<ProgramDesc> {
        self.programs.lock().clone()
    }

    pub fn deleted(&self) -> Vec<GlObject> {
        self.deleted.lock().clone()
    }
}

impl Default for SequentialObjects {
    fn default() -> Self {
        Self::new()
    }
}

impl GlObjects for SequentialObjects {
    fn create_buffer(&self, _size: u64) -> Result<u32, CoreError> {
        Ok(self.name())
    }

    fn create_texture(&self, _desc: &TextureDesc) -> Result<u32, CoreError> {
        Ok(self.name())
    }

    fn create_texture_view(&self, _desc: &TextureViewDesc) -> Result<u32, CoreError> {
        Ok(self.name())
    }

    fn create_buffer_texture(
        &self,
        _buffer: u32,
        _internal_format: u32,
        _offset: u64,
        _size: u64,
    ) -> Result<u32, CoreError> {
        Ok(self.name())
    }

    fn create_sampler(&self, _desc: &SamplerDesc) -> Result<u32, CoreError> {
        Ok(self.name())
    }

    fn create_program(&self, desc: &ProgramDesc) -> Result<u32, CoreError> {
        self.programs.lock().push(desc.clone());
        Ok(self.name())
    }

    fn create_framebuffer(&self, _attachments: &[FramebufferAttachment]) -> Result<u32, CoreError> {
        Ok(self.name())
    }

    fn create_queries(&self, count: u32) -> Result<Vec<u32>, CoreError> {
        Ok((0..count).map(|_| self.name()).collect())
    }

    fn delete_object(&self, object: GlObject) {
        self.deleted.lock().push(object);
    }
}
