//! Pipeline binds, dynamic state, vertex input and draw/dispatch recording.

use std::sync::Arc;

use ash::vk;
use glvk_core::format;
use glvk_core::geometry::{GeometryKey, IndexBufferBinding, VertexBufferBinding};
use glvk_core::pipeline::Pipeline;
use glvk_core::resource::Buffer;
use glvk_protocol::records::{
    BindGeometry, BindProgram, Dispatch, DispatchIndirect, Draw, DrawIndexed,
    DrawIndexedIndirect, DrawIndirect, SetBlendConstants, SetDepthBias, SetLineWidth,
    SetScissor, SetViewport, DEFAULT_GEOMETRY,
};
use glvk_protocol::CmdBuffer;
use tracing::debug;

use crate::buffer::{CommandBuffer, IndexBinding};
use crate::error::CommandError;

fn viewport_record(index: u32, v: &vk::Viewport) -> SetViewport {
    SetViewport {
        index,
        x: v.x,
        y: v.y,
        width: v.width,
        height: v.height,
        min_depth: v.min_depth,
        max_depth: v.max_depth,
        ..Default::default()
    }
}

fn scissor_record(index: u32, r: &vk::Rect2D) -> SetScissor {
    SetScissor {
        index,
        x: r.offset.x,
        y: r.offset.y,
        width: r.extent.width,
        height: r.extent.height,
        ..Default::default()
    }
}

impl CommandBuffer {
    // ── Pipelines ───────────────────────────────────────────

    pub fn bind_pipeline(&mut self, pipeline: &Arc<Pipeline>) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if pipeline.is_compute() {
            self.rec.compute = Some(pipeline.clone());
        } else {
            if self.rec.vertex_input_hash != Some(pipeline.vertex_input_hash) {
                self.rec.vertex_input_hash = Some(pipeline.vertex_input_hash);
                self.rec.geometry_dirty = true;
            }
            self.rec.graphics = Some(pipeline.clone());
        }

        let mut out = CmdBuffer::new();
        self.apply_pipeline(&mut out, pipeline);
        self.main.push(out);
        Ok(())
    }

    /// Emit the program bind, static fixed-function state and push constants.
    pub(crate) fn apply_pipeline(&mut self, out: &mut CmdBuffer, pipeline: &Arc<Pipeline>) {
        out.push(BindProgram {
            program: pipeline.program,
            bind_point: pipeline.bind_point_raw(),
        });

        if let Some(state) = &pipeline.graphics {
            out.push(state.raster);
            out.push(state.depth);
            for blend in &state.blend {
                out.push(*blend);
            }
            if !state.is_dynamic(vk::DynamicState::VIEWPORT) {
                for (i, v) in state.viewports.iter().enumerate() {
                    out.push(viewport_record(i as u32, v));
                }
            }
            if !state.is_dynamic(vk::DynamicState::SCISSOR) {
                for (i, r) in state.scissors.iter().enumerate() {
                    out.push(scissor_record(i as u32, r));
                }
            }
            if !state.is_dynamic(vk::DynamicState::LINE_WIDTH) {
                out.push(SetLineWidth {
                    width: state.line_width,
                    ..Default::default()
                });
            }
            if !state.is_dynamic(vk::DynamicState::DEPTH_BIAS) {
                if let Some((constant_factor, slope_factor, clamp)) = state.depth_bias {
                    out.push(SetDepthBias {
                        constant_factor,
                        slope_factor,
                        clamp,
                        ..Default::default()
                    });
                }
            }
            if !state.is_dynamic(vk::DynamicState::BLEND_CONSTANTS) {
                out.push(SetBlendConstants {
                    color: state.blend_constants,
                });
            }
        }

        self.apply_push_constants(out, pipeline);
        self.rec.active = Some(pipeline.clone());
    }

    fn is_active(&self, pipeline: &Arc<Pipeline>) -> bool {
        self.rec
            .active
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, pipeline))
    }

    // ── Dynamic state ───────────────────────────────────────

    pub fn set_viewport(&mut self, first: u32, viewports: &[vk::Viewport]) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let mut out = CmdBuffer::new();
        for (i, v) in viewports.iter().enumerate() {
            out.push(viewport_record(slot_index(first, i)?, v));
        }
        self.main.push(out);
        Ok(())
    }

    pub fn set_scissor(&mut self, first: u32, scissors: &[vk::Rect2D]) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let mut out = CmdBuffer::new();
        for (i, r) in scissors.iter().enumerate() {
            out.push(scissor_record(slot_index(first, i)?, r));
        }
        self.main.push(out);
        Ok(())
    }

    pub fn set_line_width(&mut self, width: f32) -> Result<(), CommandError> {
        self.ensure_recording()?;
        self.main.push_record(SetLineWidth {
            width,
            ..Default::default()
        });
        Ok(())
    }

    pub fn set_depth_bias(
        &mut self,
        constant_factor: f32,
        clamp: f32,
        slope_factor: f32,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        self.main.push_record(SetDepthBias {
            constant_factor,
            slope_factor,
            clamp,
            ..Default::default()
        });
        Ok(())
    }

    pub fn set_blend_constants(&mut self, color: [f32; 4]) -> Result<(), CommandError> {
        self.ensure_recording()?;
        self.main.push_record(SetBlendConstants { color });
        Ok(())
    }

    // ── Vertex input ────────────────────────────────────────

    /// Records nothing; the next draw resolves the geometry.
    pub fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[(Arc<Buffer>, u64)],
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        for (i, (buffer, offset)) in buffers.iter().enumerate() {
            if *offset > buffer.size {
                return Err(CommandError::InvalidArgument(format!(
                    "vertex buffer offset {} exceeds size {}",
                    offset, buffer.size
                )));
            }
            self.rec
                .vertex_buffers
                .insert(first_binding + i as u32, (buffer.clone(), *offset));
        }
        self.rec.geometry_dirty = true;
        Ok(())
    }

    pub fn bind_index_buffer(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        index_type: vk::IndexType,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let (gl_type, size) = format::index_type(index_type).ok_or_else(|| {
            CommandError::InvalidArgument(format!("unsupported index type {:?}", index_type))
        })?;
        if offset % size as u64 != 0 {
            return Err(CommandError::InvalidArgument(format!(
                "index offset {} is not a multiple of {}",
                offset, size
            )));
        }
        self.rec.index_buffer = Some(IndexBinding {
            buffer: buffer.clone(),
            offset,
            gl_type,
            size,
        });
        self.rec.geometry_dirty = true;
        Ok(())
    }

    /// Bring the bound geometry in line with the bindings and `pipeline`.
    fn resolve_geometry(
        &mut self,
        pipeline: &Pipeline,
        out: &mut CmdBuffer,
    ) -> Result<(), CommandError> {
        if !self.rec.geometry_dirty && self.rec.bound_geometry.is_some() {
            return Ok(());
        }

        let id = if pipeline.vertex_input.is_empty() && self.rec.index_buffer.is_none() {
            DEFAULT_GEOMETRY
        } else {
            let mut dependencies = Vec::new();
            let mut vertex_buffers = Vec::new();
            for desc in &pipeline.vertex_input.bindings {
                if let Some((buffer, offset)) = self.rec.vertex_buffers.get(&desc.binding) {
                    vertex_buffers.push(VertexBufferBinding {
                        slot: desc.binding,
                        buffer: buffer.handle,
                        gl_name: buffer.gl_name,
                        offset: *offset,
                    });
                    dependencies.extend(buffer.dependencies());
                }
            }
            vertex_buffers.sort_by_key(|b| b.slot);

            let index_buffer = self.rec.index_buffer.as_ref().map(|ib| {
                dependencies.extend(ib.buffer.dependencies());
                IndexBufferBinding {
                    buffer: ib.buffer.handle,
                    gl_name: ib.buffer.gl_name,
                }
            });
            dependencies.sort();
            dependencies.dedup();

            let key = GeometryKey {
                vertex_buffers,
                index_buffer,
                vertex_input_hash: pipeline.vertex_input_hash,
            };
            let (geometry, created) = self.device.geometry_cache().find_or_create(
                key,
                &pipeline.vertex_input,
                dependencies,
            )?;
            if created {
                debug!(id = geometry.id(), cached = geometry.is_cached(), "geometry buffer resolved");
            }
            self.resources.add_geometry(geometry)
        };

        self.rec.geometry_dirty = false;
        if self.rec.bound_geometry != Some(id) {
            out.push(BindGeometry { geometry: id });
            self.rec.bound_geometry = Some(id);
        }
        Ok(())
    }

    /// Records that must precede a draw: program and geometry.
    fn prepare_draw(&mut self) -> Result<(Arc<Pipeline>, CmdBuffer), CommandError> {
        self.ensure_recording()?;
        if self.rec.render_pass.is_none() {
            return Err(CommandError::NoRenderPass);
        }
        let pipeline = self
            .rec
            .graphics
            .clone()
            .ok_or(CommandError::NoPipeline("graphics"))?;

        let mut geometry = CmdBuffer::new();
        self.resolve_geometry(&pipeline, &mut geometry)?;

        let mut out = CmdBuffer::new();
        if !self.is_active(&pipeline) {
            self.apply_pipeline(&mut out, &pipeline);
        }
        out.append(&geometry);
        Ok((pipeline, out))
    }

    fn draw_mode(pipeline: &Pipeline) -> u32 {
        pipeline.graphics.as_ref().map(|g| g.mode).unwrap_or_default()
    }

    fn bound_index(&self) -> Result<IndexBinding, CommandError> {
        self.rec.index_buffer.clone().ok_or(CommandError::NoIndexBuffer)
    }

    // ── Draws ───────────────────────────────────────────────

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) -> Result<(), CommandError> {
        let (pipeline, mut out) = self.prepare_draw()?;
        out.push(Draw {
            mode: Self::draw_mode(&pipeline),
            first_vertex,
            vertex_count,
            instance_count,
            first_instance,
            ..Default::default()
        });
        self.main.push(out);
        Ok(())
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let index = self.bound_index()?;
        let offset = index
            .offset
            .checked_add(first_index as u64 * index.size as u64)
            .ok_or_else(|| {
                CommandError::InvalidArgument(format!("first index {} overflows", first_index))
            })?;
        let (pipeline, mut out) = self.prepare_draw()?;
        out.push(DrawIndexed {
            offset,
            mode: Self::draw_mode(&pipeline),
            index_type: index.gl_type,
            index_count,
            instance_count,
            base_vertex: vertex_offset,
            first_instance,
        });
        self.main.push(out);
        Ok(())
    }

    pub fn draw_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<(), CommandError> {
        let (pipeline, mut out) = self.prepare_draw()?;
        out.push(DrawIndirect {
            offset,
            buffer: buffer.gl_name,
            mode: Self::draw_mode(&pipeline),
            draw_count,
            stride,
        });
        self.main.push(out);
        Ok(())
    }

    /// The bound index buffer must start at offset 0: indirect first indices
    /// are relative to the start of the element buffer.
    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &Arc<Buffer>,
        offset: u64,
        draw_count: u32,
        stride: u32,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let index = self.bound_index()?;
        if index.offset != 0 {
            return Err(CommandError::InvalidArgument(format!(
                "indexed indirect draw with index buffer offset {}",
                index.offset
            )));
        }
        let (pipeline, mut out) = self.prepare_draw()?;
        out.push(DrawIndexedIndirect {
            offset,
            buffer: buffer.gl_name,
            mode: Self::draw_mode(&pipeline),
            index_type: index.gl_type,
            draw_count,
            stride,
            ..Default::default()
        });
        self.main.push(out);
        Ok(())
    }

    // ── Compute ─────────────────────────────────────────────

    fn prepare_dispatch(&mut self) -> Result<CmdBuffer, CommandError> {
        self.ensure_recording()?;
        if self.rec.render_pass.is_some() {
            return Err(CommandError::RenderPassActive);
        }
        let pipeline = self
            .rec
            .compute
            .clone()
            .ok_or(CommandError::NoPipeline("compute"))?;
        let mut out = CmdBuffer::new();
        if !self.is_active(&pipeline) {
            self.apply_pipeline(&mut out, &pipeline);
        }
        Ok(out)
    }

    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), CommandError> {
        let mut out = self.prepare_dispatch()?;
        out.push(Dispatch {
            x,
            y,
            z,
            ..Default::default()
        });
        self.main.push(out);
        Ok(())
    }

    pub fn dispatch_indirect(&mut self, buffer: &Arc<Buffer>, offset: u64) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if offset % 4 != 0 {
            return Err(CommandError::InvalidArgument(format!(
                "dispatch indirect offset {} is not 4-byte aligned",
                offset
            )));
        }
        let mut out = self.prepare_dispatch()?;
        out.push(DispatchIndirect {
            offset,
            buffer: buffer.gl_name,
            ..Default::default()
        });
        self.main.push(out);
        Ok(())
    }
}

/// Index of the `i`th viewport or scissor after `first`.
fn slot_index(first: u32, i: usize) -> Result<u32, CommandError> {
    u32::try_from(i)
        .ok()
        .and_then(|i| first.checked_add(i))
        .ok_or_else(|| CommandError::InvalidArgument(format!("viewport index {}+{} overflows", first, i)))
}
