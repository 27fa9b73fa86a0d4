//! The GL entry points replay needs.
//!
//! Records already carry GL names and enums, so most methods take the
//! decoded record for the one call it describes. Object creation mirrors
//! [`GlObjects`](glvk_core::objects::GlObjects); the context forwards the
//! device's requests here under its lock.

use glvk_core::binding::BindingAssignment;
use glvk_core::geometry::GeometryLayout;
use glvk_core::objects::{
    FramebufferAttachment, GlObject, ProgramDesc, SamplerDesc, TextureDesc, TextureViewDesc,
};
use glvk_protocol::gl::{BarrierBits, ClearAspects};
use glvk_protocol::records::{
    BindImageTexture, BlitFramebuffer, ClearColor, CopyBuffer, CopyBufferToImage, CopyImage,
    CopyImageToBuffer, Draw, DrawIndexed, DrawIndexedIndirect, DrawIndirect, SetBlendState,
    SetDepthBias, SetDepthState, SetRasterState, SetScissor, SetViewport,
};
use glvk_protocol::UniformType;

use crate::error::BackendError;

/// One level of one layer of a texture, as written by a memory upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureRegion {
    pub texture: u32,
    pub target: u32,
    pub level: u32,
    pub layer: u32,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub format: u32,
    pub ty: u32,
}

pub trait GlBackend {
    // ── Objects ─────────────────────────────────────────────
    fn create_buffer(&mut self, size: u64) -> Result<u32, BackendError>;
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<u32, BackendError>;
    fn create_texture_view(&mut self, desc: &TextureViewDesc) -> Result<u32, BackendError>;
    fn create_buffer_texture(
        &mut self,
        buffer: u32,
        internal_format: u32,
        offset: u64,
        size: u64,
    ) -> Result<u32, BackendError>;
    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<u32, BackendError>;
    /// Compile and link; bindings are applied afterwards, one
    /// [`bind_program_resource`](Self::bind_program_resource) per assignment.
    fn create_program(&mut self, desc: &ProgramDesc) -> Result<u32, BackendError>;
    /// Point a linked program's resource at the GL index it was reworked to.
    fn bind_program_resource(&mut self, program: u32, assignment: &BindingAssignment);
    fn create_framebuffer(
        &mut self,
        attachments: &[FramebufferAttachment],
    ) -> Result<u32, BackendError>;
    fn create_queries(&mut self, count: u32) -> Result<Vec<u32>, BackendError>;
    fn delete_object(&mut self, object: GlObject);

    /// Build a vertex array from a geometry layout. An empty layout yields an
    /// empty vertex array.
    fn create_vertex_array(&mut self, layout: &GeometryLayout) -> Result<u32, BackendError>;
    fn delete_vertex_array(&mut self, vao: u32);

    // ── Data transfer ───────────────────────────────────────
    fn buffer_sub_data(&mut self, buffer: u32, offset: u64, data: &[u8])
        -> Result<(), BackendError>;
    fn texture_sub_image(&mut self, region: &TextureRegion, data: &[u8]);
    fn read_buffer(&mut self, buffer: u32, offset: u64, size: u64) -> Result<Vec<u8>, BackendError>;
    fn copy_buffer_sub_data(&mut self, copy: &CopyBuffer) -> Result<(), BackendError>;
    fn clear_buffer_sub_data(
        &mut self,
        buffer: u32,
        offset: u64,
        size: u64,
        value: u32,
    ) -> Result<(), BackendError>;
    fn copy_image_sub_data(&mut self, copy: &CopyImage);
    fn copy_buffer_to_texture(&mut self, copy: &CopyBufferToImage);
    fn copy_texture_to_buffer(&mut self, copy: &CopyImageToBuffer);

    // ── Pipeline state ──────────────────────────────────────
    fn use_program(&mut self, program: u32);
    fn viewport(&mut self, viewport: &SetViewport);
    fn scissor(&mut self, scissor: &SetScissor);
    fn line_width(&mut self, width: f32);
    fn polygon_offset(&mut self, bias: &SetDepthBias);
    fn blend_color(&mut self, color: [f32; 4]);
    fn raster_state(&mut self, state: &SetRasterState);
    fn depth_state(&mut self, state: &SetDepthState);
    fn blend_state(&mut self, state: &SetBlendState);

    // ── Resource binding ────────────────────────────────────
    fn bind_vertex_array(&mut self, vao: u32);
    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: u32, offset: u64, size: u64);
    fn bind_texture(&mut self, unit: u32, target: u32, texture: u32);
    fn bind_sampler(&mut self, unit: u32, sampler: u32);
    fn bind_image_texture(&mut self, binding: &BindImageTexture);
    fn uniform(&mut self, location: i32, ty: UniformType, data: &[u32]);

    // ── Work ────────────────────────────────────────────────
    fn draw_arrays(&mut self, draw: &Draw);
    fn draw_elements(&mut self, draw: &DrawIndexed);
    fn draw_arrays_indirect(&mut self, draw: &DrawIndirect);
    fn draw_elements_indirect(&mut self, draw: &DrawIndexedIndirect);
    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32);
    fn dispatch_compute_indirect(&mut self, buffer: u32, offset: u64);
    fn memory_barrier(&mut self, bits: BarrierBits);

    // ── Framebuffers ────────────────────────────────────────
    /// Bind the draw framebuffer and enable its first `draw_buffer_count`
    /// color attachments. Framebuffer 0 is the context's default.
    fn bind_draw_framebuffer(&mut self, framebuffer: u32, draw_buffer_count: u32);
    fn clear_color(&mut self, clear: &ClearColor);
    fn clear_depth_stencil(&mut self, depth: f32, stencil: u32, aspects: ClearAspects);
    fn blit_framebuffer(&mut self, blit: &BlitFramebuffer);

    // ── Queries ─────────────────────────────────────────────
    fn begin_query(&mut self, target: u32, query: u32);
    fn end_query(&mut self, target: u32);
    fn query_counter(&mut self, query: u32);
}
