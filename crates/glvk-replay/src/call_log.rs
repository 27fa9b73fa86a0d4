//! A backend that records calls instead of issuing them.
//!
//! Buffer contents are simulated so uploads, copies, fills and readbacks
//! behave as they would on a context; everything else is only logged.

use std::collections::HashMap;

use glvk_core::binding::{BindingAssignment, BindingNamespace};
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

use crate::backend::{GlBackend, TextureRegion};
use crate::error::BackendError;

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    CreateBuffer { name: u32, size: u64 },
    CreateTexture { name: u32, desc: TextureDesc },
    CreateTextureView { name: u32, desc: TextureViewDesc },
    CreateBufferTexture { name: u32, buffer: u32, internal_format: u32 },
    CreateSampler { name: u32, desc: SamplerDesc },
    CreateProgram { name: u32, desc: ProgramDesc },
    ProgramBinding { program: u32, namespace: BindingNamespace, name: String, index: u32 },
    CreateFramebuffer { name: u32, attachments: Vec<FramebufferAttachment> },
    CreateQueries { names: Vec<u32> },
    Delete(GlObject),
    CreateVertexArray { name: u32, layout: GeometryLayout },
    DeleteVertexArray(u32),

    BufferSubData { buffer: u32, offset: u64, len: usize },
    TextureSubImage { region: TextureRegion, len: usize },
    ReadBuffer { buffer: u32, offset: u64, size: u64 },
    CopyBufferSubData(CopyBuffer),
    ClearBufferSubData { buffer: u32, offset: u64, size: u64, value: u32 },
    CopyImageSubData(CopyImage),
    CopyBufferToTexture(CopyBufferToImage),
    CopyTextureToBuffer(CopyImageToBuffer),

    UseProgram(u32),
    Viewport(SetViewport),
    Scissor(SetScissor),
    LineWidth(f32),
    PolygonOffset(SetDepthBias),
    BlendColor([f32; 4]),
    RasterState(SetRasterState),
    DepthState(SetDepthState),
    BlendState(SetBlendState),

    BindVertexArray(u32),
    BindBufferRange { target: u32, index: u32, buffer: u32, offset: u64, size: u64 },
    BindTexture { unit: u32, target: u32, texture: u32 },
    BindSampler { unit: u32, sampler: u32 },
    BindImageTexture(BindImageTexture),
    Uniform { location: i32, ty: UniformType, data: Vec<u32> },

    DrawArrays(Draw),
    DrawElements(DrawIndexed),
    DrawArraysIndirect(DrawIndirect),
    DrawElementsIndirect(DrawIndexedIndirect),
    DispatchCompute { x: u32, y: u32, z: u32 },
    DispatchComputeIndirect { buffer: u32, offset: u64 },
    MemoryBarrier(BarrierBits),

    BindDrawFramebuffer { framebuffer: u32, draw_buffer_count: u32 },
    ClearColor(ClearColor),
    ClearDepthStencil { depth: f32, stencil: u32, aspects: ClearAspects },
    BlitFramebuffer(BlitFramebuffer),

    BeginQuery { target: u32, query: u32 },
    EndQuery { target: u32 },
    QueryCounter(u32),
}

impl GlCall {
    /// True for calls that draw or dispatch.
    pub fn is_work(&self) -> bool {
        matches!(
            self,
            GlCall::DrawArrays(_)
                | GlCall::DrawElements(_)
                | GlCall::DrawArraysIndirect(_)
                | GlCall::DrawElementsIndirect(_)
                | GlCall::DispatchCompute { .. }
                | GlCall::DispatchComputeIndirect { .. }
        )
    }
}

/// Records every call in order. Names start at 1 and never repeat.
#[derive(Debug)]
pub struct CallLog {
    next_name: u32,
    calls: Vec<GlCall>,
    buffers: HashMap<u32, Vec<u8>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self {
            next_name: 1,
            calls: Vec::new(),
            buffers: HashMap::new(),
        }
    }

    pub fn calls(&self) -> &[GlCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<GlCall> {
        std::mem::take(&mut self.calls)
    }

    /// Current contents of a buffer created through this backend.
    pub fn buffer_contents(&self, buffer: u32) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    fn name(&mut self) -> u32 {
        let name = self.next_name;
        self.next_name += 1;
        name
    }

    fn buffer_range(
        &mut self,
        buffer: u32,
        offset: u64,
        size: u64,
    ) -> Result<&mut [u8], BackendError> {
        let storage = self
            .buffers
            .get_mut(&buffer)
            .ok_or(BackendError::UnknownObject {
                kind: "buffer",
                name: buffer,
            })?;
        match offset.checked_add(size) {
            Some(end) if end <= storage.len() as u64 => {
                Ok(&mut storage[offset as usize..end as usize])
            }
            _ => Err(BackendError::OutOfBounds {
                buffer,
                offset,
                size,
            }),
        }
    }
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new()
    }
}

impl GlBackend for CallLog {
    fn create_buffer(&mut self, size: u64) -> Result<u32, BackendError> {
        let name = self.name();
        self.buffers.insert(name, vec![0; size as usize]);
        self.calls.push(GlCall::CreateBuffer { name, size });
        Ok(name)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateTexture {
            name,
            desc: desc.clone(),
        });
        Ok(name)
    }

    fn create_texture_view(&mut self, desc: &TextureViewDesc) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateTextureView {
            name,
            desc: desc.clone(),
        });
        Ok(name)
    }

    fn create_buffer_texture(
        &mut self,
        buffer: u32,
        internal_format: u32,
        _offset: u64,
        _size: u64,
    ) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateBufferTexture {
            name,
            buffer,
            internal_format,
        });
        Ok(name)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateSampler {
            name,
            desc: desc.clone(),
        });
        Ok(name)
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateProgram {
            name,
            desc: desc.clone(),
        });
        Ok(name)
    }

    fn bind_program_resource(&mut self, program: u32, assignment: &BindingAssignment) {
        self.calls.push(GlCall::ProgramBinding {
            program,
            namespace: assignment.namespace,
            name: assignment.name.clone(),
            index: assignment.index,
        });
    }

    fn create_framebuffer(
        &mut self,
        attachments: &[FramebufferAttachment],
    ) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateFramebuffer {
            name,
            attachments: attachments.to_vec(),
        });
        Ok(name)
    }

    fn create_queries(&mut self, count: u32) -> Result<Vec<u32>, BackendError> {
        let names: Vec<u32> = (0..count).map(|_| self.name()).collect();
        self.calls.push(GlCall::CreateQueries {
            names: names.clone(),
        });
        Ok(names)
    }

    fn delete_object(&mut self, object: GlObject) {
        if let GlObject::Buffer(name) = object {
            self.buffers.remove(&name);
        }
        self.calls.push(GlCall::Delete(object));
    }

    fn create_vertex_array(&mut self, layout: &GeometryLayout) -> Result<u32, BackendError> {
        let name = self.name();
        self.calls.push(GlCall::CreateVertexArray {
            name,
            layout: layout.clone(),
        });
        Ok(name)
    }

    fn delete_vertex_array(&mut self, vao: u32) {
        self.calls.push(GlCall::DeleteVertexArray(vao));
    }

    fn buffer_sub_data(
        &mut self,
        buffer: u32,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        self.buffer_range(buffer, offset, data.len() as u64)?
            .copy_from_slice(data);
        self.calls.push(GlCall::BufferSubData {
            buffer,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn texture_sub_image(&mut self, region: &TextureRegion, data: &[u8]) {
        self.calls.push(GlCall::TextureSubImage {
            region: *region,
            len: data.len(),
        });
    }

    fn read_buffer(
        &mut self,
        buffer: u32,
        offset: u64,
        size: u64,
    ) -> Result<Vec<u8>, BackendError> {
        let data = self.buffer_range(buffer, offset, size)?.to_vec();
        self.calls.push(GlCall::ReadBuffer {
            buffer,
            offset,
            size,
        });
        Ok(data)
    }

    fn copy_buffer_sub_data(&mut self, copy: &CopyBuffer) -> Result<(), BackendError> {
        let data = self
            .buffer_range(copy.src, copy.src_offset, copy.size)?
            .to_vec();
        self.buffer_range(copy.dst, copy.dst_offset, copy.size)?
            .copy_from_slice(&data);
        self.calls.push(GlCall::CopyBufferSubData(*copy));
        Ok(())
    }

    fn clear_buffer_sub_data(
        &mut self,
        buffer: u32,
        offset: u64,
        size: u64,
        value: u32,
    ) -> Result<(), BackendError> {
        let pattern = value.to_le_bytes();
        for (i, byte) in self.buffer_range(buffer, offset, size)?.iter_mut().enumerate() {
            *byte = pattern[i % 4];
        }
        self.calls.push(GlCall::ClearBufferSubData {
            buffer,
            offset,
            size,
            value,
        });
        Ok(())
    }

    fn copy_image_sub_data(&mut self, copy: &CopyImage) {
        self.calls.push(GlCall::CopyImageSubData(*copy));
    }

    fn copy_buffer_to_texture(&mut self, copy: &CopyBufferToImage) {
        self.calls.push(GlCall::CopyBufferToTexture(*copy));
    }

    fn copy_texture_to_buffer(&mut self, copy: &CopyImageToBuffer) {
        self.calls.push(GlCall::CopyTextureToBuffer(*copy));
    }

    fn use_program(&mut self, program: u32) {
        self.calls.push(GlCall::UseProgram(program));
    }

    fn viewport(&mut self, viewport: &SetViewport) {
        self.calls.push(GlCall::Viewport(*viewport));
    }

    fn scissor(&mut self, scissor: &SetScissor) {
        self.calls.push(GlCall::Scissor(*scissor));
    }

    fn line_width(&mut self, width: f32) {
        self.calls.push(GlCall::LineWidth(width));
    }

    fn polygon_offset(&mut self, bias: &SetDepthBias) {
        self.calls.push(GlCall::PolygonOffset(*bias));
    }

    fn blend_color(&mut self, color: [f32; 4]) {
        self.calls.push(GlCall::BlendColor(color));
    }

    fn raster_state(&mut self, state: &SetRasterState) {
        self.calls.push(GlCall::RasterState(*state));
    }

    fn depth_state(&mut self, state: &SetDepthState) {
        self.calls.push(GlCall::DepthState(*state));
    }

    fn blend_state(&mut self, state: &SetBlendState) {
        self.calls.push(GlCall::BlendState(*state));
    }

    fn bind_vertex_array(&mut self, vao: u32) {
        self.calls.push(GlCall::BindVertexArray(vao));
    }

    fn bind_buffer_range(&mut self, target: u32, index: u32, buffer: u32, offset: u64, size: u64) {
        self.calls.push(GlCall::BindBufferRange {
            target,
            index,
            buffer,
            offset,
            size,
        });
    }

    fn bind_texture(&mut self, unit: u32, target: u32, texture: u32) {
        self.calls.push(GlCall::BindTexture {
            unit,
            target,
            texture,
        });
    }

    fn bind_sampler(&mut self, unit: u32, sampler: u32) {
        self.calls.push(GlCall::BindSampler { unit, sampler });
    }

    fn bind_image_texture(&mut self, binding: &BindImageTexture) {
        self.calls.push(GlCall::BindImageTexture(*binding));
    }

    fn uniform(&mut self, location: i32, ty: UniformType, data: &[u32]) {
        self.calls.push(GlCall::Uniform {
            location,
            ty,
            data: data.to_vec(),
        });
    }

    fn draw_arrays(&mut self, draw: &Draw) {
        self.calls.push(GlCall::DrawArrays(*draw));
    }

    fn draw_elements(&mut self, draw: &DrawIndexed) {
        self.calls.push(GlCall::DrawElements(*draw));
    }

    fn draw_arrays_indirect(&mut self, draw: &DrawIndirect) {
        self.calls.push(GlCall::DrawArraysIndirect(*draw));
    }

    fn draw_elements_indirect(&mut self, draw: &DrawIndexedIndirect) {
        self.calls.push(GlCall::DrawElementsIndirect(*draw));
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        self.calls.push(GlCall::DispatchCompute { x, y, z });
    }

    fn dispatch_compute_indirect(&mut self, buffer: u32, offset: u64) {
        self.calls
            .push(GlCall::DispatchComputeIndirect { buffer, offset });
    }

    fn memory_barrier(&mut self, bits: BarrierBits) {
        self.calls.push(GlCall::MemoryBarrier(bits));
    }

    fn bind_draw_framebuffer(&mut self, framebuffer: u32, draw_buffer_count: u32) {
        self.calls.push(GlCall::BindDrawFramebuffer {
            framebuffer,
            draw_buffer_count,
        });
    }

    fn clear_color(&mut self, clear: &ClearColor) {
        self.calls.push(GlCall::ClearColor(*clear));
    }

    fn clear_depth_stencil(&mut self, depth: f32, stencil: u32, aspects: ClearAspects) {
        self.calls.push(GlCall::ClearDepthStencil {
            depth,
            stencil,
            aspects,
        });
    }

    fn blit_framebuffer(&mut self, blit: &BlitFramebuffer) {
        self.calls.push(GlCall::BlitFramebuffer(*blit));
    }

    fn begin_query(&mut self, target: u32, query: u32) {
        self.calls.push(GlCall::BeginQuery { target, query });
    }

    fn end_query(&mut self, target: u32) {
        self.calls.push(GlCall::EndQuery { target });
    }

    fn query_counter(&mut self, query: u32) {
        self.calls.push(GlCall::QueryCounter(query));
    }
}
