//! [`GlBackend`] over a current `glow` context.
//!
//! Records carry raw GL names; they are turned back into glow's typed
//! handles at the call site. The context must be current on the thread that
//! holds the [`ContextLock`](crate::ContextLock).

use std::collections::HashMap;
use std::num::NonZeroU32;

use ash::vk;
use glow::HasContext;
use glvk_core::geometry::GeometryLayout;
use glvk_core::objects::{
    FramebufferAttachment, GlObject, ProgramDesc, SamplerDesc, TextureDesc, TextureViewDesc,
};
use glvk_core::binding::{BindingAssignment, BindingNamespace};
use glvk_protocol::gl::{BarrierBits, ClearAspects};
use glvk_protocol::records::{
    BindImageTexture, BlitFramebuffer, ClearColor, CopyBuffer, CopyBufferToImage, CopyImage,
    CopyImageToBuffer, Draw, DrawIndexed, DrawIndexedIndirect, DrawIndirect, SetBlendState,
    SetDepthBias, SetDepthState, SetRasterState, SetScissor, SetViewport, CLEAR_INT, CLEAR_UINT,
};
use glvk_protocol::UniformType;
use tracing::{debug, warn};

use crate::backend::{GlBackend, TextureRegion};
use crate::error::BackendError;

const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;

fn nz(name: u32) -> Option<NonZeroU32> {
    NonZeroU32::new(name)
}

fn buffer(name: u32) -> Option<glow::NativeBuffer> {
    nz(name).map(glow::NativeBuffer)
}

fn texture(name: u32) -> Option<glow::NativeTexture> {
    nz(name).map(glow::NativeTexture)
}

fn sampler(name: u32) -> Option<glow::NativeSampler> {
    nz(name).map(glow::NativeSampler)
}

fn program(name: u32) -> Option<glow::NativeProgram> {
    nz(name).map(glow::NativeProgram)
}

fn framebuffer(name: u32) -> Option<glow::NativeFramebuffer> {
    nz(name).map(glow::NativeFramebuffer)
}

fn query(name: u32) -> Option<glow::NativeQuery> {
    nz(name).map(glow::NativeQuery)
}

fn vertex_array(name: u32) -> Option<glow::NativeVertexArray> {
    nz(name).map(glow::NativeVertexArray)
}

fn gl_size(value: u64) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn creation(kind: &'static str) -> impl FnOnce(String) -> BackendError {
    move |message| BackendError::Creation { kind, message }
}

fn shader_type(stage: vk::ShaderStageFlags) -> Option<u32> {
    Some(match stage {
        vk::ShaderStageFlags::VERTEX => glow::VERTEX_SHADER,
        vk::ShaderStageFlags::FRAGMENT => glow::FRAGMENT_SHADER,
        vk::ShaderStageFlags::COMPUTE => glow::COMPUTE_SHADER,
        vk::ShaderStageFlags::GEOMETRY => glow::GEOMETRY_SHADER,
        vk::ShaderStageFlags::TESSELLATION_CONTROL => glow::TESS_CONTROL_SHADER,
        vk::ShaderStageFlags::TESSELLATION_EVALUATION => glow::TESS_EVALUATION_SHADER,
        _ => return None,
    })
}

/// Bytes per texel of a pixel-transfer `(format, type)` pair.
fn pixel_size(format: u32, ty: u32) -> u32 {
    let components = match format {
        glow::RED | glow::RED_INTEGER | glow::DEPTH_COMPONENT | glow::STENCIL_INDEX => 1,
        glow::RG | glow::RG_INTEGER | glow::DEPTH_STENCIL => 2,
        glow::RGB | glow::RGB_INTEGER | glow::BGR => 3,
        _ => 4,
    };
    match ty {
        glow::UNSIGNED_BYTE | glow::BYTE => components,
        glow::UNSIGNED_SHORT | glow::SHORT | glow::HALF_FLOAT => components * 2,
        glow::UNSIGNED_INT_24_8 => 4,
        glow::FLOAT_32_UNSIGNED_INT_24_8_REV => 8,
        _ => components * 4,
    }
}

fn is_layered(target: u32) -> bool {
    matches!(
        target,
        glow::TEXTURE_3D
            | glow::TEXTURE_1D_ARRAY
            | glow::TEXTURE_2D_ARRAY
            | glow::TEXTURE_CUBE_MAP
            | glow::TEXTURE_CUBE_MAP_ARRAY
            | glow::TEXTURE_2D_MULTISAMPLE_ARRAY
    )
}

#[derive(Debug, Clone, Copy)]
struct TextureInfo {
    target: u32,
    levels: u32,
    layers: u32,
}

pub struct GlowBackend {
    gl: glow::Context,
    textures: HashMap<u32, TextureInfo>,
    /// Views sharing their texture's name, with the number of such views.
    aliases: HashMap<u32, u32>,
    draw_framebuffer: u32,
    scratch_framebuffer: Option<glow::NativeFramebuffer>,
}

impl GlowBackend {
    pub fn new(gl: glow::Context) -> Self {
        Self {
            gl,
            textures: HashMap::new(),
            aliases: HashMap::new(),
            draw_framebuffer: 0,
            scratch_framebuffer: None,
        }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn scratch_framebuffer(&mut self) -> Option<glow::NativeFramebuffer> {
        if self.scratch_framebuffer.is_none() {
            match unsafe { self.gl.create_framebuffer() } {
                Ok(fbo) => self.scratch_framebuffer = Some(fbo),
                Err(message) => warn!("scratch framebuffer: {}", message),
            }
        }
        self.scratch_framebuffer
    }
}

impl GlBackend for GlowBackend {
    // ── Objects ─────────────────────────────────────────────

    fn create_buffer(&mut self, size: u64) -> Result<u32, BackendError> {
        let gl = &self.gl;
        unsafe {
            let name = gl.create_buffer().map_err(creation("buffer"))?;
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(name));
            gl.buffer_data_size(glow::COPY_WRITE_BUFFER, gl_size(size), glow::DYNAMIC_DRAW);
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            Ok(name.0.get())
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<u32, BackendError> {
        let gl = &self.gl;
        let (levels, format) = (desc.levels as i32, desc.internal_format);
        let (w, h, d, layers) = (
            desc.width as i32,
            desc.height as i32,
            desc.depth as i32,
            desc.layers as i32,
        );
        unsafe {
            let name = gl.create_texture().map_err(creation("texture"))?;
            gl.bind_texture(desc.target, Some(name));
            match desc.target {
                glow::TEXTURE_1D => gl.tex_storage_1d(desc.target, levels, format, w),
                glow::TEXTURE_1D_ARRAY => gl.tex_storage_2d(desc.target, levels, format, w, layers),
                glow::TEXTURE_2D | glow::TEXTURE_CUBE_MAP => {
                    gl.tex_storage_2d(desc.target, levels, format, w, h)
                }
                glow::TEXTURE_2D_ARRAY | glow::TEXTURE_CUBE_MAP_ARRAY => {
                    gl.tex_storage_3d(desc.target, levels, format, w, h, layers)
                }
                glow::TEXTURE_3D => gl.tex_storage_3d(desc.target, levels, format, w, h, d),
                glow::TEXTURE_2D_MULTISAMPLE => gl.tex_storage_2d_multisample(
                    desc.target,
                    desc.samples as i32,
                    format,
                    w,
                    h,
                    true,
                ),
                other => {
                    gl.bind_texture(desc.target, None);
                    gl.delete_texture(name);
                    return Err(BackendError::Creation {
                        kind: "texture",
                        message: format!("unsupported target {:#x}", other),
                    });
                }
            }
            gl.bind_texture(desc.target, None);
            self.textures.insert(
                name.0.get(),
                TextureInfo {
                    target: desc.target,
                    levels: desc.levels,
                    layers: desc.layers,
                },
            );
            Ok(name.0.get())
        }
    }

    fn create_texture_view(&mut self, desc: &TextureViewDesc) -> Result<u32, BackendError> {
        // Only views covering the whole texture with its own target are
        // expressible here; they share the texture's name.
        let info = self
            .textures
            .get(&desc.texture)
            .copied()
            .ok_or(BackendError::UnknownObject {
                kind: "texture",
                name: desc.texture,
            })?;
        let whole = desc.target == info.target
            && desc.min_level == 0
            && desc.levels == info.levels
            && desc.min_layer == 0
            && desc.layers == info.layers;
        if !whole {
            return Err(BackendError::Creation {
                kind: "texture view",
                message: "partial texture views are not available through glow".into(),
            });
        }
        *self.aliases.entry(desc.texture).or_insert(0) += 1;
        Ok(desc.texture)
    }

    fn create_buffer_texture(
        &mut self,
        buffer: u32,
        _internal_format: u32,
        _offset: u64,
        _size: u64,
    ) -> Result<u32, BackendError> {
        Err(BackendError::Creation {
            kind: "buffer texture",
            message: format!("texel buffer over buffer {} is not available through glow", buffer),
        })
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<u32, BackendError> {
        let gl = &self.gl;
        unsafe {
            let name = gl.create_sampler().map_err(creation("sampler"))?;
            gl.sampler_parameter_i32(name, glow::TEXTURE_MIN_FILTER, desc.min_filter as i32);
            gl.sampler_parameter_i32(name, glow::TEXTURE_MAG_FILTER, desc.mag_filter as i32);
            gl.sampler_parameter_i32(name, glow::TEXTURE_WRAP_S, desc.wrap_s as i32);
            gl.sampler_parameter_i32(name, glow::TEXTURE_WRAP_T, desc.wrap_t as i32);
            gl.sampler_parameter_i32(name, glow::TEXTURE_WRAP_R, desc.wrap_r as i32);
            gl.sampler_parameter_f32(name, glow::TEXTURE_MIN_LOD, desc.min_lod);
            gl.sampler_parameter_f32(name, glow::TEXTURE_MAX_LOD, desc.max_lod);
            gl.sampler_parameter_f32(name, glow::TEXTURE_LOD_BIAS, desc.lod_bias);
            if desc.max_anisotropy > 1.0 {
                gl.sampler_parameter_f32(name, TEXTURE_MAX_ANISOTROPY, desc.max_anisotropy);
            }
            if let Some(func) = desc.compare_func {
                gl.sampler_parameter_i32(
                    name,
                    glow::TEXTURE_COMPARE_MODE,
                    glow::COMPARE_REF_TO_TEXTURE as i32,
                );
                gl.sampler_parameter_i32(name, glow::TEXTURE_COMPARE_FUNC, func as i32);
            }
            Ok(name.0.get())
        }
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<u32, BackendError> {
        let gl = &self.gl;
        unsafe {
            let name = gl.create_program().map_err(creation("program"))?;
            let mut shaders = Vec::with_capacity(desc.stages.len());
            for stage in &desc.stages {
                let ty = shader_type(stage.stage).ok_or_else(|| BackendError::Creation {
                    kind: "shader",
                    message: format!("unsupported stage {:?}", stage.stage),
                })?;
                let shader = gl.create_shader(ty).map_err(creation("shader"))?;
                gl.shader_source(shader, &stage.glsl);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    let log = gl.get_shader_info_log(shader);
                    gl.delete_shader(shader);
                    for s in shaders {
                        gl.delete_shader(s);
                    }
                    gl.delete_program(name);
                    return Err(BackendError::Link(format!("{:?}: {}", stage.stage, log)));
                }
                gl.attach_shader(name, shader);
                shaders.push(shader);
            }

            gl.link_program(name);
            let linked = gl.get_program_link_status(name);
            for shader in shaders {
                gl.detach_shader(name, shader);
                gl.delete_shader(shader);
            }
            if !linked {
                let log = gl.get_program_info_log(name);
                gl.delete_program(name);
                return Err(BackendError::Link(log));
            }
            debug!(program = name.0.get(), "program linked");
            Ok(name.0.get())
        }
    }

    fn bind_program_resource(&mut self, program_name: u32, assignment: &BindingAssignment) {
        let Some(name) = program(program_name) else {
            return;
        };
        let gl = &self.gl;
        unsafe {
            match assignment.namespace {
                BindingNamespace::UniformBuffer => {
                    if let Some(block) = gl.get_uniform_block_index(name, &assignment.name) {
                        gl.uniform_block_binding(name, block, assignment.index);
                    }
                }
                BindingNamespace::StorageBuffer => {
                    if let Some(block) = gl.get_shader_storage_block_index(name, &assignment.name) {
                        gl.shader_storage_block_binding(name, block, assignment.index);
                    }
                }
                BindingNamespace::TextureUnit | BindingNamespace::ImageUnit => {
                    let units: Vec<i32> = (0..assignment.count.max(1))
                        .map(|i| (assignment.index + i) as i32)
                        .collect();
                    gl.use_program(Some(name));
                    let location = gl.get_uniform_location(name, &assignment.name);
                    gl.uniform_1_i32_slice(location.as_ref(), &units);
                    gl.use_program(None);
                }
            }
        }
    }

    fn create_framebuffer(
        &mut self,
        attachments: &[FramebufferAttachment],
    ) -> Result<u32, BackendError> {
        let gl = &self.gl;
        unsafe {
            let name = gl.create_framebuffer().map_err(creation("framebuffer"))?;
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, Some(name));
            for attachment in attachments {
                match attachment.layer {
                    Some(layer) => gl.framebuffer_texture_layer(
                        glow::DRAW_FRAMEBUFFER,
                        attachment.point,
                        texture(attachment.texture),
                        attachment.level,
                        layer,
                    ),
                    None => gl.framebuffer_texture(
                        glow::DRAW_FRAMEBUFFER,
                        attachment.point,
                        texture(attachment.texture),
                        attachment.level,
                    ),
                }
            }
            let status = gl.check_framebuffer_status(glow::DRAW_FRAMEBUFFER);
            gl.bind_framebuffer(glow::DRAW_FRAMEBUFFER, framebuffer(self.draw_framebuffer));
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(name);
                return Err(BackendError::Creation {
                    kind: "framebuffer",
                    message: format!("incomplete ({:#x})", status),
                });
            }
            Ok(name.0.get())
        }
    }

    fn create_queries(&mut self, count: u32) -> Result<Vec<u32>, BackendError> {
        let gl = &self.gl;
        (0..count)
            .map(|_| unsafe { gl.create_query() }
                .map(|q| q.0.get())
                .map_err(creation("query")))
            .collect()
    }

    fn delete_object(&mut self, object: GlObject) {
        let gl = &self.gl;
        unsafe {
            match object {
                GlObject::Buffer(name) => {
                    if let Some(b) = buffer(name) {
                        gl.delete_buffer(b);
                    }
                }
                GlObject::Texture(name) => {
                    if let Some(count) = self.aliases.get_mut(&name) {
                        *count -= 1;
                        if *count == 0 {
                            self.aliases.remove(&name);
                        }
                        return;
                    }
                    self.textures.remove(&name);
                    if let Some(t) = texture(name) {
                        gl.delete_texture(t);
                    }
                }
                GlObject::Sampler(name) => {
                    if let Some(s) = sampler(name) {
                        gl.delete_sampler(s);
                    }
                }
                GlObject::Program(name) => {
                    if let Some(p) = program(name) {
                        gl.delete_program(p);
                    }
                }
                GlObject::Framebuffer(name) => {
                    if let Some(f) = framebuffer(name) {
                        gl.delete_framebuffer(f);
                    }
                }
                GlObject::Query(name) => {
                    if let Some(q) = query(name) {
                        gl.delete_query(q);
                    }
                }
            }
        }
    }

    fn create_vertex_array(&mut self, layout: &GeometryLayout) -> Result<u32, BackendError> {
        let gl = &self.gl;
        unsafe {
            let vao = gl.create_vertex_array().map_err(creation("vertex array"))?;
            gl.bind_vertex_array(Some(vao));
            for attr in &layout.attributes {
                let Some(slot) = layout.buffers.iter().find(|b| b.binding == attr.binding) else {
                    continue;
                };
                let offset = gl_size(slot.offset + attr.relative_offset as u64);
                gl.bind_buffer(glow::ARRAY_BUFFER, buffer(slot.buffer));
                gl.enable_vertex_attrib_array(attr.location);
                let format = attr.format;
                if format.integer {
                    gl.vertex_attrib_pointer_i32(
                        attr.location,
                        format.components as i32,
                        format.ty,
                        slot.stride as i32,
                        offset,
                    );
                } else {
                    gl.vertex_attrib_pointer_f32(
                        attr.location,
                        format.components as i32,
                        format.ty,
                        format.normalized,
                        slot.stride as i32,
                        offset,
                    );
                }
                gl.vertex_attrib_divisor(attr.location, slot.divisor);
            }
            gl.bind_buffer(
                glow::ELEMENT_ARRAY_BUFFER,
                layout.element_buffer.and_then(buffer),
            );
            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            Ok(vao.0.get())
        }
    }

    fn delete_vertex_array(&mut self, vao: u32) {
        if let Some(v) = vertex_array(vao) {
            unsafe { self.gl.delete_vertex_array(v) };
        }
    }

    // ── Data transfer ───────────────────────────────────────

    fn buffer_sub_data(
        &mut self,
        name: u32,
        offset: u64,
        data: &[u8],
    ) -> Result<(), BackendError> {
        let b = buffer(name).ok_or(BackendError::UnknownObject { kind: "buffer", name })?;
        unsafe {
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(b));
            self.gl
                .buffer_sub_data_u8_slice(glow::COPY_WRITE_BUFFER, gl_size(offset), data);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
        Ok(())
    }

    fn texture_sub_image(&mut self, region: &TextureRegion, data: &[u8]) {
        let gl = &self.gl;
        let pixels = glow::PixelUnpackData::Slice(Some(data));
        unsafe {
            gl.bind_texture(region.target, texture(region.texture));
            if is_layered(region.target) {
                // 3D images have one layer; array images have depth 1
                let z = if region.target == glow::TEXTURE_3D { 0 } else { region.layer };
                gl.tex_sub_image_3d(
                    region.target,
                    region.level as i32,
                    0,
                    0,
                    z as i32,
                    region.width as i32,
                    region.height as i32,
                    region.depth as i32,
                    region.format,
                    region.ty,
                    pixels,
                );
            } else {
                gl.tex_sub_image_2d(
                    region.target,
                    region.level as i32,
                    0,
                    0,
                    region.width as i32,
                    region.height as i32,
                    region.format,
                    region.ty,
                    pixels,
                );
            }
            gl.bind_texture(region.target, None);
        }
    }

    fn read_buffer(&mut self, name: u32, offset: u64, size: u64) -> Result<Vec<u8>, BackendError> {
        let b = buffer(name).ok_or(BackendError::UnknownObject { kind: "buffer", name })?;
        let mut data = vec![0u8; size as usize];
        unsafe {
            self.gl.bind_buffer(glow::COPY_READ_BUFFER, Some(b));
            self.gl
                .get_buffer_sub_data(glow::COPY_READ_BUFFER, gl_size(offset), &mut data);
            self.gl.bind_buffer(glow::COPY_READ_BUFFER, None);
        }
        Ok(data)
    }

    fn copy_buffer_sub_data(&mut self, copy: &CopyBuffer) -> Result<(), BackendError> {
        let gl = &self.gl;
        unsafe {
            gl.bind_buffer(glow::COPY_READ_BUFFER, buffer(copy.src));
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, buffer(copy.dst));
            gl.copy_buffer_sub_data(
                glow::COPY_READ_BUFFER,
                glow::COPY_WRITE_BUFFER,
                gl_size(copy.src_offset),
                gl_size(copy.dst_offset),
                gl_size(copy.size),
            );
            gl.bind_buffer(glow::COPY_READ_BUFFER, None);
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
        Ok(())
    }

    fn clear_buffer_sub_data(
        &mut self,
        name: u32,
        offset: u64,
        size: u64,
        value: u32,
    ) -> Result<(), BackendError> {
        let pattern: Vec<u8> = std::iter::repeat(value.to_le_bytes())
            .take((size / 4) as usize)
            .flatten()
            .collect();
        self.buffer_sub_data(name, offset, &pattern)
    }

    fn copy_image_sub_data(&mut self, copy: &CopyImage) {
        let (Some(src), Some(dst)) = (texture(copy.src_texture), texture(copy.dst_texture)) else {
            return;
        };
        unsafe {
            self.gl.copy_image_sub_data(
                src,
                copy.src_target,
                copy.src_level,
                copy.src_x,
                copy.src_y,
                copy.src_z,
                dst,
                copy.dst_target,
                copy.dst_level,
                copy.dst_x,
                copy.dst_y,
                copy.dst_z,
                copy.width as i32,
                copy.height as i32,
                copy.depth as i32,
            );
        }
    }

    fn copy_buffer_to_texture(&mut self, copy: &CopyBufferToImage) {
        let gl = &self.gl;
        let pixels = glow::PixelUnpackData::BufferOffset(copy.buffer_offset as u32);
        unsafe {
            gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, buffer(copy.buffer));
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, copy.row_length as i32);
            gl.pixel_store_i32(glow::UNPACK_IMAGE_HEIGHT, copy.image_height as i32);
            gl.bind_texture(copy.target, texture(copy.texture));
            if is_layered(copy.target) {
                gl.tex_sub_image_3d(
                    copy.target,
                    copy.level,
                    copy.x,
                    copy.y,
                    copy.z,
                    copy.width as i32,
                    copy.height as i32,
                    copy.depth as i32,
                    copy.format,
                    copy.ty,
                    pixels,
                );
            } else {
                gl.tex_sub_image_2d(
                    copy.target,
                    copy.level,
                    copy.x,
                    copy.y,
                    copy.width as i32,
                    copy.height as i32,
                    copy.format,
                    copy.ty,
                    pixels,
                );
            }
            gl.bind_texture(copy.target, None);
            gl.pixel_store_i32(glow::UNPACK_ROW_LENGTH, 0);
            gl.pixel_store_i32(glow::UNPACK_IMAGE_HEIGHT, 0);
            gl.bind_buffer(glow::PIXEL_UNPACK_BUFFER, None);
        }
    }

    fn copy_texture_to_buffer(&mut self, copy: &CopyImageToBuffer) {
        let Some(fbo) = self.scratch_framebuffer() else {
            return;
        };
        let gl = &self.gl;
        let point = match copy.format {
            glow::DEPTH_COMPONENT => glow::DEPTH_ATTACHMENT,
            glow::DEPTH_STENCIL => glow::DEPTH_STENCIL_ATTACHMENT,
            _ => glow::COLOR_ATTACHMENT0,
        };
        let row = if copy.row_length == 0 { copy.width } else { copy.row_length };
        let rows = if copy.image_height == 0 { copy.height } else { copy.image_height };
        let slice = row as u64 * rows as u64 * pixel_size(copy.format, copy.ty) as u64;
        unsafe {
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, Some(fbo));
            gl.bind_buffer(glow::PIXEL_PACK_BUFFER, buffer(copy.buffer));
            gl.pixel_store_i32(glow::PACK_ROW_LENGTH, copy.row_length as i32);
            for z in 0..copy.depth.max(1) {
                if is_layered(copy.target) {
                    gl.framebuffer_texture_layer(
                        glow::READ_FRAMEBUFFER,
                        point,
                        texture(copy.texture),
                        copy.level,
                        copy.z + z as i32,
                    );
                } else {
                    gl.framebuffer_texture(
                        glow::READ_FRAMEBUFFER,
                        point,
                        texture(copy.texture),
                        copy.level,
                    );
                }
                if point == glow::COLOR_ATTACHMENT0 {
                    gl.read_buffer(glow::COLOR_ATTACHMENT0);
                }
                gl.read_pixels(
                    copy.x,
                    copy.y,
                    copy.width as i32,
                    copy.height as i32,
                    copy.format,
                    copy.ty,
                    glow::PixelPackData::BufferOffset((copy.buffer_offset + z as u64 * slice) as u32),
                );
            }
            gl.framebuffer_texture(glow::READ_FRAMEBUFFER, point, None, 0);
            gl.pixel_store_i32(glow::PACK_ROW_LENGTH, 0);
            gl.bind_buffer(glow::PIXEL_PACK_BUFFER, None);
            gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
        }
    }

    // ── Pipeline state ──────────────────────────────────────

    fn use_program(&mut self, name: u32) {
        unsafe { self.gl.use_program(program(name)) };
    }

    fn viewport(&mut self, v: &SetViewport) {
        unsafe {
            self.gl
                .viewport_f32_slice(v.index, 1, &[[v.x, v.y, v.width, v.height]]);
            self.gl
                .depth_range_f64_slice(v.index, 1, &[[v.min_depth as f64, v.max_depth as f64]]);
        }
    }

    fn scissor(&mut self, s: &SetScissor) {
        unsafe {
            self.gl.enable(glow::SCISSOR_TEST);
            self.gl
                .scissor_slice(s.index, 1, &[[s.x, s.y, s.width as i32, s.height as i32]]);
        }
    }

    fn line_width(&mut self, width: f32) {
        unsafe { self.gl.line_width(width) };
    }

    fn polygon_offset(&mut self, bias: &SetDepthBias) {
        unsafe {
            let enabled = bias.constant_factor != 0.0 || bias.slope_factor != 0.0;
            for cap in [glow::POLYGON_OFFSET_FILL, glow::POLYGON_OFFSET_LINE, glow::POLYGON_OFFSET_POINT] {
                if enabled {
                    self.gl.enable(cap);
                } else {
                    self.gl.disable(cap);
                }
            }
            self.gl.polygon_offset(bias.slope_factor, bias.constant_factor);
        }
    }

    fn blend_color(&mut self, c: [f32; 4]) {
        unsafe { self.gl.blend_color(c[0], c[1], c[2], c[3]) };
    }

    fn raster_state(&mut self, state: &SetRasterState) {
        let gl = &self.gl;
        let toggle = |cap: u32, on: bool| unsafe {
            if on {
                gl.enable(cap);
            } else {
                gl.disable(cap);
            }
        };
        toggle(glow::CULL_FACE, state.cull_face != glow::NONE);
        toggle(glow::DEPTH_CLAMP, state.depth_clamp != 0);
        toggle(glow::RASTERIZER_DISCARD, state.rasterizer_discard != 0);
        toggle(glow::PRIMITIVE_RESTART_FIXED_INDEX, state.primitive_restart != 0);
        unsafe {
            if state.cull_face != glow::NONE {
                gl.cull_face(state.cull_face);
            }
            gl.front_face(state.front_face);
            gl.polygon_mode(glow::FRONT_AND_BACK, state.polygon_mode);
        }
    }

    fn depth_state(&mut self, state: &SetDepthState) {
        unsafe {
            if state.depth_test != 0 {
                self.gl.enable(glow::DEPTH_TEST);
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
            self.gl.depth_mask(state.depth_write != 0);
            self.gl.depth_func(state.depth_func);
        }
    }

    fn blend_state(&mut self, s: &SetBlendState) {
        let gl = &self.gl;
        unsafe {
            if s.enabled != 0 {
                gl.enable_draw_buffer(glow::BLEND, s.draw_buffer);
            } else {
                gl.disable_draw_buffer(glow::BLEND, s.draw_buffer);
            }
            gl.blend_func_separate_draw_buffer(
                s.draw_buffer,
                s.src_rgb,
                s.dst_rgb,
                s.src_alpha,
                s.dst_alpha,
            );
            gl.blend_equation_separate_draw_buffer(s.draw_buffer, s.op_rgb, s.op_alpha);
            gl.color_mask_draw_buffer(
                s.draw_buffer,
                s.write_mask & 1 != 0,
                s.write_mask & 2 != 0,
                s.write_mask & 4 != 0,
                s.write_mask & 8 != 0,
            );
        }
    }

    // ── Resource binding ────────────────────────────────────

    fn bind_vertex_array(&mut self, vao: u32) {
        unsafe { self.gl.bind_vertex_array(vertex_array(vao)) };
    }

    fn bind_buffer_range(&mut self, target: u32, index: u32, name: u32, offset: u64, size: u64) {
        unsafe {
            self.gl
                .bind_buffer_range(target, index, buffer(name), gl_size(offset), gl_size(size))
        };
    }

    fn bind_texture(&mut self, unit: u32, target: u32, name: u32) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(target, texture(name));
        }
    }

    fn bind_sampler(&mut self, unit: u32, name: u32) {
        unsafe { self.gl.bind_sampler(unit, sampler(name)) };
    }

    fn bind_image_texture(&mut self, b: &BindImageTexture) {
        unsafe {
            self.gl.bind_image_texture(
                b.unit,
                texture(b.texture),
                b.level,
                b.layered != 0,
                b.layer,
                b.access,
                b.format,
            )
        };
    }

    fn uniform(&mut self, location: i32, ty: UniformType, data: &[u32]) {
        if location < 0 {
            return;
        }
        let loc = glow::NativeUniformLocation(location as u32);
        let loc = Some(&loc);
        let floats: Vec<f32> = data.iter().map(|w| f32::from_bits(*w)).collect();
        let ints: Vec<i32> = data.iter().map(|w| *w as i32).collect();
        let gl = &self.gl;
        unsafe {
            match ty {
                UniformType::Float => gl.uniform_1_f32_slice(loc, &floats),
                UniformType::Vec2 => gl.uniform_2_f32_slice(loc, &floats),
                UniformType::Vec3 => gl.uniform_3_f32_slice(loc, &floats),
                UniformType::Vec4 => gl.uniform_4_f32_slice(loc, &floats),
                UniformType::Int => gl.uniform_1_i32_slice(loc, &ints),
                UniformType::IVec2 => gl.uniform_2_i32_slice(loc, &ints),
                UniformType::IVec3 => gl.uniform_3_i32_slice(loc, &ints),
                UniformType::IVec4 => gl.uniform_4_i32_slice(loc, &ints),
                UniformType::Uint => gl.uniform_1_u32_slice(loc, data),
                UniformType::UVec2 => gl.uniform_2_u32_slice(loc, data),
                UniformType::UVec3 => gl.uniform_3_u32_slice(loc, data),
                UniformType::UVec4 => gl.uniform_4_u32_slice(loc, data),
                UniformType::Mat2 => gl.uniform_matrix_2_f32_slice(loc, false, &floats),
                UniformType::Mat3 => gl.uniform_matrix_3_f32_slice(loc, false, &floats),
                UniformType::Mat4 => gl.uniform_matrix_4_f32_slice(loc, false, &floats),
            }
        }
    }

    // ── Work ────────────────────────────────────────────────

    fn draw_arrays(&mut self, d: &Draw) {
        unsafe {
            self.gl.draw_arrays_instanced_base_instance(
                d.mode,
                d.first_vertex as i32,
                d.vertex_count as i32,
                d.instance_count as i32,
                d.first_instance,
            )
        };
    }

    fn draw_elements(&mut self, d: &DrawIndexed) {
        unsafe {
            self.gl.draw_elements_instanced_base_vertex_base_instance(
                d.mode,
                d.index_count as i32,
                d.index_type,
                gl_size(d.offset),
                d.instance_count as i32,
                d.base_vertex,
                d.first_instance,
            )
        };
    }

    fn draw_arrays_indirect(&mut self, d: &DrawIndirect) {
        unsafe {
            self.gl.bind_buffer(glow::DRAW_INDIRECT_BUFFER, buffer(d.buffer));
            self.gl.multi_draw_arrays_indirect_offset(
                d.mode,
                gl_size(d.offset),
                d.draw_count as i32,
                d.stride as i32,
            );
            self.gl.bind_buffer(glow::DRAW_INDIRECT_BUFFER, None);
        }
    }

    fn draw_elements_indirect(&mut self, d: &DrawIndexedIndirect) {
        unsafe {
            self.gl.bind_buffer(glow::DRAW_INDIRECT_BUFFER, buffer(d.buffer));
            self.gl.multi_draw_elements_indirect_offset(
                d.mode,
                d.index_type,
                gl_size(d.offset),
                d.draw_count as i32,
                d.stride as i32,
            );
            self.gl.bind_buffer(glow::DRAW_INDIRECT_BUFFER, None);
        }
    }

    fn dispatch_compute(&mut self, x: u32, y: u32, z: u32) {
        unsafe { self.gl.dispatch_compute(x, y, z) };
    }

    fn dispatch_compute_indirect(&mut self, name: u32, offset: u64) {
        unsafe {
            self.gl.bind_buffer(glow::DISPATCH_INDIRECT_BUFFER, buffer(name));
            self.gl.dispatch_compute_indirect(gl_size(offset));
            self.gl.bind_buffer(glow::DISPATCH_INDIRECT_BUFFER, None);
        }
    }

    fn memory_barrier(&mut self, bits: BarrierBits) {
        unsafe { self.gl.memory_barrier(bits.bits()) };
    }

    // ── Framebuffers ────────────────────────────────────────

    fn bind_draw_framebuffer(&mut self, name: u32, draw_buffer_count: u32) {
        self.draw_framebuffer = name;
        unsafe {
            self.gl
                .bind_framebuffer(glow::DRAW_FRAMEBUFFER, framebuffer(name));
            if name != 0 {
                let buffers: Vec<u32> = (0..draw_buffer_count)
                    .map(|i| glow::COLOR_ATTACHMENT0 + i)
                    .collect();
                self.gl.draw_buffers(&buffers);
            }
        }
    }

    fn clear_color(&mut self, c: &ClearColor) {
        unsafe {
            match c.kind {
                CLEAR_INT => {
                    let values = c.value.map(|w| w as i32);
                    self.gl
                        .clear_buffer_i32_slice(glow::COLOR, c.draw_buffer, &values)
                }
                CLEAR_UINT => self
                    .gl
                    .clear_buffer_u32_slice(glow::COLOR, c.draw_buffer, &c.value),
                _ => {
                    let values = c.value.map(f32::from_bits);
                    self.gl
                        .clear_buffer_f32_slice(glow::COLOR, c.draw_buffer, &values)
                }
            }
        }
    }

    fn clear_depth_stencil(&mut self, depth: f32, stencil: u32, aspects: ClearAspects) {
        unsafe {
            if aspects.contains(ClearAspects::DEPTH | ClearAspects::STENCIL) {
                self.gl
                    .clear_buffer_depth_stencil(glow::DEPTH_STENCIL, 0, depth, stencil as i32);
            } else if aspects.contains(ClearAspects::DEPTH) {
                self.gl.clear_buffer_f32_slice(glow::DEPTH, 0, &[depth]);
            } else if aspects.contains(ClearAspects::STENCIL) {
                self.gl
                    .clear_buffer_i32_slice(glow::STENCIL, 0, &[stencil as i32]);
            }
        }
    }

    fn blit_framebuffer(&mut self, b: &BlitFramebuffer) {
        unsafe {
            self.gl
                .bind_framebuffer(glow::READ_FRAMEBUFFER, framebuffer(b.src_framebuffer));
            self.gl
                .bind_framebuffer(glow::DRAW_FRAMEBUFFER, framebuffer(b.dst_framebuffer));
            self.gl.blit_framebuffer(
                b.src[0], b.src[1], b.src[2], b.src[3], b.dst[0], b.dst[1], b.dst[2], b.dst[3],
                b.mask, b.filter,
            );
            self.gl.bind_framebuffer(glow::READ_FRAMEBUFFER, None);
            self.gl.bind_framebuffer(
                glow::DRAW_FRAMEBUFFER,
                framebuffer(self.draw_framebuffer),
            );
        }
    }

    // ── Queries ─────────────────────────────────────────────

    fn begin_query(&mut self, target: u32, name: u32) {
        if let Some(q) = query(name) {
            unsafe { self.gl.begin_query(target, q) };
        }
    }

    fn end_query(&mut self, target: u32) {
        unsafe { self.gl.end_query(target) };
    }

    fn query_counter(&mut self, name: u32) {
        if let Some(q) = query(name) {
            unsafe { self.gl.query_counter(q, glow::TIMESTAMP) };
        }
    }
}
