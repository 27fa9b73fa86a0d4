//! The device: creates and destroys every object a command buffer can refer to.

use std::sync::Arc;

use ash::vk;
use dashmap::DashMap;
use parking_lot::Mutex;
use glvk_protocol::gl;
use glvk_protocol::records::{SetBlendState, SetDepthState, SetRasterState};
use tracing::{debug, info};

use crate::binding::{rework_bindings, BindingAssignment, ShaderBindingTable};
use crate::config::GlvkConfig;
use crate::convert;
use crate::descriptor::{DescriptorSet, DescriptorSetLayout, DescriptorSetLayoutBinding};
use crate::diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
use crate::error::CoreError;
use crate::events::DestructionLog;
use crate::format::{format_info, FormatInfo};
use crate::geometry::GeometryCache;
use crate::handle::{Handle, HandleAllocator, ResourceKind};
use crate::memory::{BindingTarget, DeviceMemory, ImageMemoryLayout, MemoryBinding, PendingUpload};
use crate::objects::{
    FramebufferAttachment, GlObject, GlObjects, ProgramDesc, ProgramStage, SamplerDesc,
    TextureDesc, TextureViewDesc,
};
use crate::pipeline::{
    ComputePipelineDesc, GraphicsPipelineDesc, GraphicsState, Pipeline, PipelineLayout,
    PushConstantLayout, PushConstantRange, ShaderModule, ShaderStage, VertexInputState,
    MAX_PUSH_CONSTANT_SIZE,
};
use crate::reflect::ShaderCompiler;
use crate::renderpass::{
    AttachmentDescription, Framebuffer, RenderPass, ResolveTarget, SubpassDescription,
};
use crate::resource::{
    BoundMemory, Buffer, BufferDesc, BufferView, Event, Image, ImageDesc, ImageView,
    ImageViewDesc, QueryPool, Sampler, SamplerInfo,
};

pub struct Device {
    config: GlvkConfig,
    handles: Arc<HandleAllocator>,
    objects: Arc<dyn GlObjects>,
    compiler: Arc<dyn ShaderCompiler>,
    diagnostics: Arc<dyn Diagnostics>,
    destruction: Arc<DestructionLog>,
    geometry: GeometryCache,
    /// Live allocations, for draining pending uploads.
    memories: DashMap<u64, Arc<DeviceMemory>>,
    /// Uploads handed back after a failed apply, drained before fresh ones.
    requeued: Mutex<Vec<PendingUpload>>,
}

impl Device {
    pub fn new(
        config: GlvkConfig,
        objects: Arc<dyn GlObjects>,
        compiler: Arc<dyn ShaderCompiler>,
    ) -> Self {
        let handles = Arc::new(HandleAllocator::new());
        let destruction = Arc::new(DestructionLog::new());
        let geometry = GeometryCache::new(
            destruction.clone(),
            handles.clone(),
            config.cache.max_geometry_entries,
        );
        info!(
            "device created (geometry cache capacity {}, missing bindings: {:?})",
            config.cache.max_geometry_entries, config.validation.missing_bindings
        );
        Self {
            config,
            handles,
            objects,
            compiler,
            diagnostics: Arc::new(TracingDiagnostics),
            destruction,
            geometry,
            memories: DashMap::new(),
            requeued: Mutex::new(Vec::new()),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn config(&self) -> &GlvkConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.diagnostics
    }

    pub fn destruction_log(&self) -> &Arc<DestructionLog> {
        &self.destruction
    }

    pub fn geometry_cache(&self) -> &GeometryCache {
        &self.geometry
    }

    pub fn alloc_handle(&self, kind: ResourceKind) -> Handle {
        self.handles.alloc(kind)
    }

    fn destroyed(&self, handle: Handle) {
        debug!(?handle, "destroyed");
        self.destruction.publish(handle);
    }

    // ── Memory ──────────────────────────────────────────────

    pub fn allocate_memory(
        &self,
        size: u64,
        properties: vk::MemoryPropertyFlags,
    ) -> Arc<DeviceMemory> {
        let handle = self.handles.alloc(ResourceKind::DeviceMemory);
        let memory = Arc::new(DeviceMemory::new(handle, size, properties));
        self.memories.insert(handle.id, memory.clone());
        debug!(id = handle.id, size, ?properties, "memory allocated");
        memory
    }

    pub fn free_memory(&self, memory: &DeviceMemory) {
        self.memories.remove(&memory.handle().id);
        self.destroyed(memory.handle());
    }

    /// Uploads queued by flushes on every live allocation.
    pub fn take_pending_uploads(&self) -> Vec<PendingUpload> {
        let mut uploads = std::mem::take(&mut *self.requeued.lock());
        for entry in self.memories.iter() {
            uploads.extend(entry.value().take_pending_uploads());
        }
        uploads
    }

    /// Put back uploads that were taken but not applied. They come out
    /// first, in the same order, on the next `take_pending_uploads`.
    pub fn requeue_uploads(&self, uploads: Vec<PendingUpload>) {
        if uploads.is_empty() {
            return;
        }
        debug!(count = uploads.len(), "uploads requeued");
        let mut requeued = self.requeued.lock();
        let later = std::mem::replace(&mut *requeued, uploads);
        requeued.extend(later);
    }

    // ── Buffers ─────────────────────────────────────────────

    pub fn create_buffer(&self, desc: BufferDesc) -> Result<Arc<Buffer>, CoreError> {
        let gl_name = self.objects.create_buffer(desc.size)?;
        let handle = self.handles.alloc(ResourceKind::Buffer);
        debug!(id = handle.id, gl_name, size = desc.size, "buffer created");
        Ok(Arc::new(Buffer {
            handle,
            gl_name,
            size: desc.size,
            usage: desc.usage,
            memory: Default::default(),
        }))
    }

    pub fn bind_buffer_memory(
        &self,
        buffer: &Buffer,
        memory: &Arc<DeviceMemory>,
        offset: u64,
    ) -> Result<(), CoreError> {
        if buffer.memory.get().is_some() {
            return Err(CoreError::AlreadyBound(buffer.handle));
        }
        memory.bind(MemoryBinding {
            resource: buffer.handle,
            offset,
            size: buffer.size,
            target: BindingTarget::Buffer {
                name: buffer.gl_name,
            },
        })?;
        buffer
            .memory
            .set(BoundMemory {
                memory: memory.clone(),
                offset,
            })
            .map_err(|_| CoreError::AlreadyBound(buffer.handle))
    }

    pub fn destroy_buffer(&self, buffer: &Buffer) {
        if let Some(bound) = buffer.memory.get() {
            bound.memory.unbind(buffer.handle);
        }
        self.objects.delete_object(GlObject::Buffer(buffer.gl_name));
        self.destroyed(buffer.handle);
    }

    pub fn create_buffer_view(
        &self,
        buffer: &Arc<Buffer>,
        format: vk::Format,
        offset: u64,
        range: u64,
    ) -> Result<Arc<BufferView>, CoreError> {
        let info = require_format(format)?;
        let range = if range == vk::WHOLE_SIZE {
            buffer.size.saturating_sub(offset)
        } else {
            range
        };
        let gl_name =
            self.objects
                .create_buffer_texture(buffer.gl_name, info.internal_format, offset, range)?;
        Ok(Arc::new(BufferView {
            handle: self.handles.alloc(ResourceKind::BufferView),
            gl_name,
            buffer: buffer.clone(),
            format: info,
            offset,
            range,
        }))
    }

    // ── Images ──────────────────────────────────────────────

    pub fn create_image(&self, desc: ImageDesc) -> Result<Arc<Image>, CoreError> {
        let format = require_format(desc.format)?;
        let gl_target = convert::image_target(desc.image_type, desc.array_layers, desc.samples);
        let gl_name = self.objects.create_texture(&TextureDesc {
            target: gl_target,
            internal_format: format.internal_format,
            width: desc.extent.width,
            height: desc.extent.height,
            depth: desc.extent.depth,
            layers: desc.array_layers,
            levels: desc.mip_levels,
            samples: desc.samples.as_raw(),
        })?;
        let layout = ImageMemoryLayout::new(
            desc.extent,
            desc.mip_levels,
            desc.array_layers,
            format.texel_size,
        );
        let handle = self.handles.alloc(ResourceKind::Image);
        debug!(id = handle.id, gl_name, format = ?desc.format, "image created");
        Ok(Arc::new(Image {
            handle,
            gl_name,
            gl_target,
            desc,
            format,
            layout,
            memory: Default::default(),
        }))
    }

    pub fn bind_image_memory(
        &self,
        image: &Image,
        memory: &Arc<DeviceMemory>,
        offset: u64,
    ) -> Result<(), CoreError> {
        if image.memory.get().is_some() {
            return Err(CoreError::AlreadyBound(image.handle));
        }
        memory.bind(MemoryBinding {
            resource: image.handle,
            offset,
            size: image.layout.total_size(),
            target: BindingTarget::Image {
                texture: image.gl_name,
                target: image.gl_target,
                layout: image.layout.clone(),
                format: image.format.pixel_format,
                ty: image.format.pixel_type,
            },
        })?;
        image
            .memory
            .set(BoundMemory {
                memory: memory.clone(),
                offset,
            })
            .map_err(|_| CoreError::AlreadyBound(image.handle))
    }

    pub fn destroy_image(&self, image: &Image) {
        if let Some(bound) = image.memory.get() {
            bound.memory.unbind(image.handle);
        }
        self.objects.delete_object(GlObject::Texture(image.gl_name));
        self.destroyed(image.handle);
    }

    pub fn create_image_view(
        &self,
        image: &Arc<Image>,
        desc: ImageViewDesc,
    ) -> Result<Arc<ImageView>, CoreError> {
        let format = require_format(desc.format)?;
        let range = desc.subresource_range;
        let levels = if range.level_count == vk::REMAINING_MIP_LEVELS {
            image.desc.mip_levels.saturating_sub(range.base_mip_level)
        } else {
            range.level_count
        };
        let layers = if range.layer_count == vk::REMAINING_ARRAY_LAYERS {
            image.desc.array_layers.saturating_sub(range.base_array_layer)
        } else {
            range.layer_count
        };
        let gl_target = convert::view_target(desc.view_type, image.desc.samples);
        let gl_name = self.objects.create_texture_view(&TextureViewDesc {
            texture: image.gl_name,
            target: gl_target,
            internal_format: format.internal_format,
            min_level: range.base_mip_level,
            levels,
            min_layer: range.base_array_layer,
            layers,
        })?;

        let mut desc = desc;
        desc.subresource_range.level_count = levels;
        desc.subresource_range.layer_count = layers;
        Ok(Arc::new(ImageView {
            handle: self.handles.alloc(ResourceKind::ImageView),
            gl_name,
            gl_target,
            image: image.clone(),
            desc,
            format,
        }))
    }

    pub fn destroy_image_view(&self, view: &ImageView) {
        self.objects.delete_object(GlObject::Texture(view.gl_name));
        self.destroyed(view.handle);
    }

    pub fn create_sampler(&self, info: SamplerInfo) -> Result<Arc<Sampler>, CoreError> {
        let gl_name = self.objects.create_sampler(&SamplerDesc {
            min_filter: convert::min_filter(info.min_filter, info.mipmap_mode, info.max_lod > 0.0),
            mag_filter: convert::mag_filter(info.mag_filter),
            wrap_s: convert::wrap_mode(info.address_mode_u),
            wrap_t: convert::wrap_mode(info.address_mode_v),
            wrap_r: convert::wrap_mode(info.address_mode_w),
            min_lod: info.min_lod,
            max_lod: info.max_lod,
            lod_bias: info.mip_lod_bias,
            max_anisotropy: info.max_anisotropy.unwrap_or(1.0),
            compare_func: info.compare_op.map(convert::compare_func),
        })?;
        Ok(Arc::new(Sampler {
            handle: self.handles.alloc(ResourceKind::Sampler),
            gl_name,
            info,
        }))
    }

    pub fn destroy_sampler(&self, sampler: &Sampler) {
        self.objects.delete_object(GlObject::Sampler(sampler.gl_name));
        self.destroyed(sampler.handle);
    }

    // ── Descriptors ─────────────────────────────────────────

    pub fn create_descriptor_set_layout(
        &self,
        mut bindings: Vec<DescriptorSetLayoutBinding>,
    ) -> Result<Arc<DescriptorSetLayout>, CoreError> {
        bindings.sort_by_key(|b| b.binding);
        if let Some(pair) = bindings.windows(2).find(|w| w[0].binding == w[1].binding) {
            return Err(CoreError::InvalidDescriptor(format!(
                "binding {} declared twice",
                pair[0].binding
            )));
        }
        Ok(Arc::new(DescriptorSetLayout {
            handle: self.handles.alloc(ResourceKind::DescriptorSetLayout),
            bindings,
        }))
    }

    pub fn allocate_descriptor_set(&self, layout: &Arc<DescriptorSetLayout>) -> Arc<DescriptorSet> {
        Arc::new(DescriptorSet::new(
            self.handles.alloc(ResourceKind::DescriptorSet),
            layout.clone(),
        ))
    }

    pub fn create_pipeline_layout(
        &self,
        set_layouts: Vec<Arc<DescriptorSetLayout>>,
        push_constant_ranges: Vec<PushConstantRange>,
    ) -> Result<Arc<PipelineLayout>, CoreError> {
        if let Some(range) = push_constant_ranges
            .iter()
            .find(|r| {
                r.offset
                    .checked_add(r.size)
                    .map_or(true, |end| end > MAX_PUSH_CONSTANT_SIZE)
            })
        {
            return Err(CoreError::InvalidPipeline(format!(
                "push constant range {}+{} exceeds {} bytes",
                range.offset, range.size, MAX_PUSH_CONSTANT_SIZE
            )));
        }
        let binding_table = ShaderBindingTable::build(&set_layouts)?;
        let handle = self.handles.alloc(ResourceKind::PipelineLayout);
        debug!(id = handle.id, sets = set_layouts.len(), "pipeline layout created");
        Ok(Arc::new(PipelineLayout {
            handle,
            set_layouts,
            push_constant_ranges,
            binding_table,
        }))
    }

    // ── Pipelines ───────────────────────────────────────────

    pub fn create_shader_module(&self, spirv: Vec<u32>) -> Arc<ShaderModule> {
        Arc::new(ShaderModule {
            handle: self.handles.alloc(ResourceKind::ShaderModule),
            spirv,
        })
    }

    /// Compile, rework bindings and link every stage into one program.
    fn build_program(
        &self,
        stages: &[ShaderStage],
        layout: &PipelineLayout,
        flags: vk::PipelineCreateFlags,
    ) -> Result<(u32, PushConstantLayout, Vec<BindingAssignment>), CoreError> {
        let policy = self.config.validation.missing_bindings;
        let mut program = ProgramDesc {
            stages: Vec::with_capacity(stages.len()),
            bindings: Vec::new(),
        };
        let mut push_constants = PushConstantLayout::default();

        for stage in stages {
            let mut compiled =
                self.compiler
                    .compile(&stage.module.spirv, stage.stage, &stage.entry_point)?;
            let assignments = rework_bindings(
                &mut compiled,
                &layout.binding_table,
                flags,
                policy,
                self.diagnostics.as_ref(),
            )?;
            for assignment in assignments {
                if !program.bindings.contains(&assignment) {
                    program.bindings.push(assignment);
                }
            }
            for member in &compiled.push_constants {
                if !layout.covers_push_constants(member.offset, member.extent()) {
                    self.diagnostics.report(Diagnostic::PushConstantOutOfRange {
                        name: member.name.clone(),
                        offset: member.offset,
                        size: member.extent(),
                    });
                }
            }
            push_constants.merge(&compiled.push_constants);
            program.stages.push(ProgramStage {
                stage: stage.stage,
                glsl: compiled.glsl,
            });
        }

        let name = self.objects.create_program(&program)?;
        Ok((name, push_constants, program.bindings))
    }

    pub fn create_graphics_pipeline(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<Arc<Pipeline>, CoreError> {
        if !desc
            .stages
            .iter()
            .any(|s| s.stage == vk::ShaderStageFlags::VERTEX)
        {
            return Err(CoreError::InvalidPipeline(
                "graphics pipeline has no vertex stage".into(),
            ));
        }
        for binding in desc.vertex_input.attributes.iter().map(|a| a.binding) {
            if desc.vertex_input.binding(binding).is_none() {
                return Err(CoreError::InvalidPipeline(format!(
                    "vertex attribute uses undeclared binding {}",
                    binding
                )));
            }
        }

        let (program, push_constants, assignments) =
            self.build_program(&desc.stages, &desc.layout, desc.flags)?;
        let graphics = graphics_state(desc);
        let handle = self.handles.alloc(ResourceKind::Pipeline);
        let vertex_input_hash = desc.vertex_input.layout_hash();
        debug!(id = handle.id, program, vertex_input_hash, "graphics pipeline created");

        Ok(Arc::new(Pipeline {
            handle,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            flags: desc.flags,
            program,
            layout: desc.layout.clone(),
            vertex_input: desc.vertex_input.clone(),
            vertex_input_hash,
            graphics: Some(graphics),
            push_constants,
            assignments,
        }))
    }

    pub fn create_compute_pipeline(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<Arc<Pipeline>, CoreError> {
        if desc.stage.stage != vk::ShaderStageFlags::COMPUTE {
            return Err(CoreError::InvalidPipeline(format!(
                "compute pipeline stage is {:?}",
                desc.stage.stage
            )));
        }
        let (program, push_constants, assignments) =
            self.build_program(std::slice::from_ref(&desc.stage), &desc.layout, desc.flags)?;
        let handle = self.handles.alloc(ResourceKind::Pipeline);
        debug!(id = handle.id, program, "compute pipeline created");

        Ok(Arc::new(Pipeline {
            handle,
            bind_point: vk::PipelineBindPoint::COMPUTE,
            flags: desc.flags,
            program,
            layout: desc.layout.clone(),
            vertex_input: VertexInputState::default(),
            vertex_input_hash: 0,
            graphics: None,
            push_constants,
            assignments,
        }))
    }

    pub fn destroy_pipeline(&self, pipeline: &Pipeline) {
        self.objects.delete_object(GlObject::Program(pipeline.program));
        self.destroyed(pipeline.handle);
    }

    // ── Render passes ───────────────────────────────────────

    pub fn create_render_pass(
        &self,
        attachments: Vec<AttachmentDescription>,
        subpasses: Vec<SubpassDescription>,
    ) -> Result<Arc<RenderPass>, CoreError> {
        for attachment in &attachments {
            require_format(attachment.format)?;
        }
        let pass = RenderPass::new(
            self.handles.alloc(ResourceKind::RenderPass),
            attachments,
            subpasses,
        )?;
        Ok(Arc::new(pass))
    }

    pub fn create_framebuffer(
        &self,
        render_pass: &RenderPass,
        attachments: Vec<Arc<ImageView>>,
        width: u32,
        height: u32,
        layers: u32,
    ) -> Result<Arc<Framebuffer>, CoreError> {
        if attachments.len() != render_pass.attachments.len() {
            return Err(CoreError::InvalidRenderPass(format!(
                "framebuffer has {} attachments, render pass expects {}",
                attachments.len(),
                render_pass.attachments.len()
            )));
        }

        let mut created = Vec::new();
        let (subpass_framebuffers, resolves) =
            match self.framebuffer_objects(render_pass, &attachments, &mut created) {
                Ok(objects) => objects,
                Err(err) => {
                    for name in created {
                        self.objects.delete_object(GlObject::Framebuffer(name));
                    }
                    return Err(err);
                }
            };

        let handle = self.handles.alloc(ResourceKind::Framebuffer);
        debug!(id = handle.id, width, height, "framebuffer created");
        Ok(Arc::new(Framebuffer {
            handle,
            attachments,
            width,
            height,
            layers,
            subpass_framebuffers,
            resolves,
        }))
    }

    /// GL framebuffers for every subpass and resolve. Each name is pushed to
    /// `created` as soon as it exists.
    fn framebuffer_objects(
        &self,
        render_pass: &RenderPass,
        attachments: &[Arc<ImageView>],
        created: &mut Vec<u32>,
    ) -> Result<(Vec<u32>, Vec<Vec<ResolveTarget>>), CoreError> {
        let mut track = |name: u32| {
            created.push(name);
            name
        };
        let color_point = |slot: usize| gl::COLOR_ATTACHMENT0 + slot as u32;
        let attach = |point: u32, view: &ImageView| FramebufferAttachment {
            point,
            texture: view.gl_name,
            level: 0,
            layer: None,
        };

        let mut subpass_framebuffers = Vec::with_capacity(render_pass.subpasses.len());
        let mut resolves = Vec::with_capacity(render_pass.subpasses.len());
        for subpass in &render_pass.subpasses {
            let mut list = Vec::new();
            for (slot, index) in subpass.color.iter().enumerate() {
                if let Some(index) = index {
                    list.push(attach(color_point(slot), &attachments[*index as usize]));
                }
            }
            if let Some(index) = subpass.depth_stencil {
                let view = &attachments[index as usize];
                let point = view.format.depth_stencil_point().ok_or_else(|| {
                    CoreError::InvalidRenderPass(format!(
                        "attachment {} is not a depth/stencil format",
                        index
                    ))
                })?;
                list.push(attach(point, view));
            }
            subpass_framebuffers.push(track(self.objects.create_framebuffer(&list)?));

            let mut targets = Vec::new();
            for (slot, resolve) in subpass.resolves() {
                let Some(Some(color)) = subpass.color.get(slot) else {
                    continue;
                };
                let src = track(self.objects.create_framebuffer(&[attach(
                    gl::COLOR_ATTACHMENT0,
                    &attachments[*color as usize],
                )])?);
                let dst = track(self.objects.create_framebuffer(&[attach(
                    gl::COLOR_ATTACHMENT0,
                    &attachments[resolve as usize],
                )])?);
                targets.push(ResolveTarget {
                    src_framebuffer: src,
                    dst_framebuffer: dst,
                });
            }
            resolves.push(targets);
        }
        Ok((subpass_framebuffers, resolves))
    }

    pub fn destroy_framebuffer(&self, framebuffer: &Framebuffer) {
        let names = framebuffer.subpass_framebuffers.iter().copied().chain(
            framebuffer
                .resolves
                .iter()
                .flatten()
                .flat_map(|r| [r.src_framebuffer, r.dst_framebuffer]),
        );
        for name in names {
            self.objects.delete_object(GlObject::Framebuffer(name));
        }
        self.destroyed(framebuffer.handle);
    }

    // ── Queries and events ──────────────────────────────────

    pub fn create_query_pool(
        &self,
        query_type: vk::QueryType,
        count: u32,
    ) -> Result<Arc<QueryPool>, CoreError> {
        let names = self.objects.create_queries(count)?;
        Ok(Arc::new(QueryPool {
            handle: self.handles.alloc(ResourceKind::QueryPool),
            query_type,
            names,
        }))
    }

    pub fn destroy_query_pool(&self, pool: &QueryPool) {
        for name in &pool.names {
            self.objects.delete_object(GlObject::Query(*name));
        }
        self.destroyed(pool.handle);
    }

    pub fn create_event(&self) -> Arc<Event> {
        Arc::new(Event::new(self.handles.alloc(ResourceKind::Event)))
    }
}

fn require_format(format: vk::Format) -> Result<FormatInfo, CoreError> {
    format_info(format).ok_or_else(|| CoreError::UnsupportedFormat(format!("{:?}", format)))
}

fn graphics_state(desc: &GraphicsPipelineDesc) -> GraphicsState {
    let raster = &desc.rasterization;
    let depth = &desc.depth_stencil;
    GraphicsState {
        mode: convert::primitive_mode(desc.topology),
        raster: SetRasterState {
            cull_face: convert::cull_face(raster.cull_mode),
            front_face: convert::front_face(raster.front_face),
            polygon_mode: convert::polygon_mode(raster.polygon_mode),
            depth_clamp: raster.depth_clamp as u32,
            rasterizer_discard: raster.rasterizer_discard as u32,
            primitive_restart: desc.primitive_restart as u32,
        },
        depth: SetDepthState {
            depth_test: depth.depth_test as u32,
            depth_write: depth.depth_write as u32,
            depth_func: convert::compare_func(depth.compare_op),
            ..Default::default()
        },
        blend: desc
            .blend_attachments
            .iter()
            .enumerate()
            .map(|(i, a)| SetBlendState {
                draw_buffer: i as u32,
                enabled: a.blend_enable as u32,
                src_rgb: convert::blend_factor(a.src_color),
                dst_rgb: convert::blend_factor(a.dst_color),
                src_alpha: convert::blend_factor(a.src_alpha),
                dst_alpha: convert::blend_factor(a.dst_alpha),
                op_rgb: convert::blend_op(a.color_op),
                op_alpha: convert::blend_op(a.alpha_op),
                write_mask: a.write_mask.as_raw(),
                ..Default::default()
            })
            .collect(),
        blend_constants: desc.blend_constants,
        line_width: raster.line_width,
        depth_bias: raster.depth_bias,
        viewports: desc.viewports.clone(),
        scissors: desc.scissors.clone(),
        dynamic_states: desc.dynamic_states.clone(),
    }
}
