//! Replays a finished command stream on a locked context.
//!
//! The stream is validated as a whole first; an invalid stream executes
//! nothing. Each record then maps to exactly one handler, in stream order.

use std::ops::AddAssign;

use glvk_core::config::ReplayConfig;
use glvk_core::ResourceTable;
use glvk_protocol::gl::{BarrierBits, ClearAspects};
use glvk_protocol::records::DEFAULT_GEOMETRY;
use glvk_protocol::{CmdBuffer, Command, UniformType};
use tracing::trace;

use crate::backend::GlBackend;
use crate::context::ContextLock;
use crate::error::ReplayError;

/// What one replay (or one submission) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records: usize,
    pub calls: usize,
    pub vaos_created: usize,
    pub vaos_deleted: usize,
    pub uploads: usize,
}

impl AddAssign for ReplayStats {
    fn add_assign(&mut self, other: Self) {
        self.records += other.records;
        self.calls += other.calls;
        self.vaos_created += other.vaos_created;
        self.vaos_deleted += other.vaos_deleted;
        self.uploads += other.uploads;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    trace_records: bool,
}

impl ReplayEngine {
    pub fn new(config: &ReplayConfig) -> Self {
        Self {
            trace_records: config.trace_records,
        }
    }

    pub fn replay<B: GlBackend>(
        &self,
        stream: &CmdBuffer,
        resources: &ResourceTable,
        ctx: &mut ContextLock<'_, B>,
    ) -> Result<ReplayStats, ReplayError> {
        stream.validate()?;

        let calls_before = ctx.calls();
        let mut stats = ReplayStats::default();
        for command in stream.decoder() {
            let command = command?;
            if self.trace_records {
                trace!(record = stats.records, ?command, "replay");
            }
            self.execute(&command, resources, ctx, &mut stats)?;
            stats.records += 1;
        }
        stats.calls = ctx.calls() - calls_before;
        Ok(stats)
    }

    fn execute<B: GlBackend>(
        &self,
        command: &Command,
        resources: &ResourceTable,
        ctx: &mut ContextLock<'_, B>,
        stats: &mut ReplayStats,
    ) -> Result<(), ReplayError> {
        match command {
            // ── Pipeline state ──────────────────────────────────
            Command::BindProgram(r) => ctx.gl().use_program(r.program),
            Command::SetViewport(r) => ctx.gl().viewport(r),
            Command::SetScissor(r) => ctx.gl().scissor(r),
            Command::SetLineWidth(r) => ctx.gl().line_width(r.width),
            Command::SetDepthBias(r) => ctx.gl().polygon_offset(r),
            Command::SetBlendConstants(r) => ctx.gl().blend_color(r.color),
            Command::SetRasterState(r) => ctx.gl().raster_state(r),
            Command::SetDepthState(r) => ctx.gl().depth_state(r),
            Command::SetBlendState(r) => ctx.gl().blend_state(r),

            // ── Resource binding ────────────────────────────────
            Command::BindGeometry(r) => {
                let vao = if r.geometry == DEFAULT_GEOMETRY {
                    ctx.empty_vertex_array()?
                } else {
                    let geometry = resources
                        .geometry(r.geometry)
                        .ok_or(ReplayError::UnknownGeometry(r.geometry))?;
                    match geometry.vao() {
                        Some(vao) => vao,
                        None => {
                            let vao = ctx.gl().create_vertex_array(geometry.layout())?;
                            geometry.set_vao(vao);
                            stats.vaos_created += 1;
                            vao
                        }
                    }
                };
                ctx.gl().bind_vertex_array(vao);
            }
            Command::BindBufferRange(r) => {
                ctx.gl()
                    .bind_buffer_range(r.target, r.index, r.buffer, r.offset, r.size)
            }
            Command::BindTexture(r) => {
                ctx.gl().bind_texture(r.unit, r.target, r.texture);
                ctx.gl().bind_sampler(r.unit, r.sampler);
            }
            Command::BindSampler(r) => ctx.gl().bind_sampler(r.unit, r.sampler),
            Command::BindImageTexture(r) => ctx.gl().bind_image_texture(r),
            Command::PushConstant(r) => {
                let ty = UniformType::from_raw(r.ty).ok_or_else(|| ReplayError::InvalidOperand {
                    kind: "PushConstant",
                    message: format!("uniform type {}", r.ty),
                })?;
                let count = r.count as usize;
                if count == 0 || count > r.data.len() {
                    return Err(ReplayError::InvalidOperand {
                        kind: "PushConstant",
                        message: format!("{} words", r.count),
                    });
                }
                ctx.gl().uniform(r.location, ty, &r.data[..count]);
            }

            // ── Draw / dispatch ─────────────────────────────────
            Command::Draw(r) => ctx.gl().draw_arrays(r),
            Command::DrawIndexed(r) => ctx.gl().draw_elements(r),
            Command::DrawIndirect(r) => ctx.gl().draw_arrays_indirect(r),
            Command::DrawIndexedIndirect(r) => ctx.gl().draw_elements_indirect(r),
            Command::Dispatch(r) => ctx.gl().dispatch_compute(r.x, r.y, r.z),
            Command::DispatchIndirect(r) => ctx.gl().dispatch_compute_indirect(r.buffer, r.offset),

            // ── Transfer ────────────────────────────────────────
            Command::CopyBuffer(r) => ctx.gl().copy_buffer_sub_data(r)?,
            Command::CopyImage(r) => ctx.gl().copy_image_sub_data(r),
            Command::CopyBufferToImage(r) => ctx.gl().copy_buffer_to_texture(r),
            Command::CopyImageToBuffer(r) => ctx.gl().copy_texture_to_buffer(r),
            Command::FillBuffer(r) => {
                ctx.gl()
                    .clear_buffer_sub_data(r.buffer, r.offset, r.size, r.data)?
            }
            Command::MemoryBarrier(r) => {
                ctx.gl().memory_barrier(BarrierBits::from_bits_retain(r.bits))
            }

            // ── Framebuffers ────────────────────────────────────
            Command::BindFramebuffer(r) => ctx
                .gl()
                .bind_draw_framebuffer(r.framebuffer, r.draw_buffer_count),
            Command::ClearColor(r) => ctx.gl().clear_color(r),
            Command::ClearDepthStencil(r) => ctx.gl().clear_depth_stencil(
                r.depth,
                r.stencil,
                ClearAspects::from_bits_truncate(r.aspects),
            ),
            Command::BlitFramebuffer(r) => ctx.gl().blit_framebuffer(r),

            // ── Queries ─────────────────────────────────────────
            // GL queries restart on begin; there is nothing to reset.
            Command::ResetQuery(_) => {}
            Command::BeginQuery(r) => ctx.gl().begin_query(r.target, r.query),
            Command::EndQuery(r) => ctx.gl().end_query(r.target),
            Command::WriteTimestamp(r) => ctx.gl().query_counter(r.query),

            // ── Events ──────────────────────────────────────────
            Command::SetEvent(r) => resources
                .event(r.event)
                .ok_or(ReplayError::UnknownEvent(r.event))?
                .set(),
            Command::ResetEvent(r) => resources
                .event(r.event)
                .ok_or(ReplayError::UnknownEvent(r.event))?
                .reset(),

            // ── After submit ────────────────────────────────────
            Command::ReadbackBuffer(r) => {
                let memory = resources
                    .memory(r.memory)
                    .ok_or(ReplayError::UnknownMemory(r.memory))?;
                let data = ctx.gl().read_buffer(r.buffer, r.buffer_offset, r.size)?;
                memory.write_device(r.memory_offset, &data)?;
            }
            Command::RestoreDefaults(r) => {
                ctx.gl().use_program(0);
                ctx.gl().bind_vertex_array(0);
                ctx.gl().bind_draw_framebuffer(r.framebuffer, 1);
            }
        }
        Ok(())
    }
}
