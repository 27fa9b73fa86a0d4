//! Render pass translation: framebuffer binds, load-op clears and resolves.

use std::sync::Arc;

use ash::vk;
use glvk_core::renderpass::{Framebuffer, RenderPass};
use glvk_protocol::gl::{self, ClearAspects};
use glvk_protocol::records::{
    BindFramebuffer, BlitFramebuffer, ClearColor, ClearDepthStencil, RestoreDefaults, SetScissor,
    CLEAR_FLOAT, CLEAR_INT, CLEAR_UINT,
};
use glvk_protocol::CmdBuffer;
use tracing::debug;

use crate::buffer::{ActivePass, CommandBuffer, CommandBufferLevel};
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    ColorInt([i32; 4]),
    ColorUint([u32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

#[derive(Debug, Clone)]
pub struct RenderPassBegin {
    pub render_pass: Arc<RenderPass>,
    pub framebuffer: Arc<Framebuffer>,
    pub render_area: vk::Rect2D,
    /// Indexed by attachment.
    pub clear_values: Vec<ClearValue>,
}

impl CommandBuffer {
    pub fn begin_render_pass(&mut self, begin: &RenderPassBegin) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if self.level() != CommandBufferLevel::Primary {
            return Err(CommandError::InvalidArgument(
                "render passes begin on primary command buffers".into(),
            ));
        }
        if self.rec.render_pass.is_some() {
            return Err(CommandError::RenderPassActive);
        }
        if !begin.framebuffer.is_compatible(&begin.render_pass) {
            return Err(CommandError::IncompatibleFramebuffer {
                framebuffer: begin.framebuffer.handle,
                render_pass: begin.render_pass.handle,
            });
        }
        let expected = begin.render_pass.clear_value_count();
        if begin.clear_values.len() < expected {
            return Err(CommandError::ClearValueCount {
                expected,
                got: begin.clear_values.len(),
            });
        }

        let pass = ActivePass {
            pass: begin.render_pass.clone(),
            framebuffer: Some(begin.framebuffer.clone()),
            subpass: 0,
            render_area: begin.render_area,
            clear_values: begin.clear_values.clone(),
            owned: true,
        };
        let mut out = CmdBuffer::new();
        enter_subpass(&mut out, &pass);
        debug!(
            render_pass = begin.render_pass.handle.id,
            framebuffer = begin.framebuffer.handle.id,
            "render pass begin"
        );
        self.rec.render_pass = Some(pass);
        self.main.push(out);
        Ok(())
    }

    pub fn next_subpass(&mut self) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let pass = self.owned_pass()?;
        let next = pass.subpass + 1;
        if next as usize >= pass.pass.subpasses.len() {
            return Err(CommandError::NoMoreSubpasses(pass.subpass));
        }

        let mut out = CmdBuffer::new();
        blit_resolves(&mut out, &pass);
        let pass = ActivePass {
            subpass: next,
            ..pass
        };
        enter_subpass(&mut out, &pass);
        self.rec.render_pass = Some(pass);
        self.main.push(out);
        Ok(())
    }

    pub fn end_render_pass(&mut self) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let pass = self.owned_pass()?;
        if pass.subpass as usize + 1 != pass.pass.subpasses.len() {
            return Err(CommandError::InvalidArgument(format!(
                "render pass ended in subpass {} of {}",
                pass.subpass,
                pass.pass.subpasses.len()
            )));
        }

        let mut out = CmdBuffer::new();
        blit_resolves(&mut out, &pass);
        self.main.push(out);
        self.rec.render_pass = None;

        if self.device.config().replay.restore_defaults && !self.rec.restore_recorded {
            self.after.push_record(RestoreDefaults {
                framebuffer: 0,
                ..Default::default()
            });
            self.rec.restore_recorded = true;
        }
        Ok(())
    }

    fn owned_pass(&self) -> Result<ActivePass, CommandError> {
        match &self.rec.render_pass {
            Some(pass) if pass.owned => Ok(pass.clone()),
            _ => Err(CommandError::NoRenderPass),
        }
    }
}

/// Bind the subpass framebuffer, clip to the render area and clear the
/// attachments first used here with the values given at begin.
fn enter_subpass(out: &mut CmdBuffer, pass: &ActivePass) {
    let Some(framebuffer) = &pass.framebuffer else {
        return;
    };
    let subpass = &pass.pass.subpasses[pass.subpass as usize];
    out.push(BindFramebuffer {
        framebuffer: framebuffer.subpass_framebuffer(pass.subpass).unwrap_or(0),
        draw_buffer_count: subpass.color.len() as u32,
    });
    out.push(SetScissor {
        index: 0,
        x: pass.render_area.offset.x,
        y: pass.render_area.offset.y,
        width: pass.render_area.extent.width,
        height: pass.render_area.extent.height,
        ..Default::default()
    });

    for attachment in pass.pass.clears_in(pass.subpass) {
        let Some(value) = pass.clear_values.get(attachment as usize) else {
            continue;
        };
        let desc = &pass.pass.attachments[attachment as usize];
        if let Some(slot) = subpass.color.iter().position(|c| *c == Some(attachment)) {
            if desc.load_op != vk::AttachmentLoadOp::CLEAR {
                continue;
            }
            let (kind, value) = match *value {
                ClearValue::Color(c) => (CLEAR_FLOAT, c.map(f32::to_bits)),
                ClearValue::ColorInt(c) => (CLEAR_INT, c.map(|v| v as u32)),
                ClearValue::ColorUint(c) => (CLEAR_UINT, c),
                ClearValue::DepthStencil { .. } => continue,
            };
            out.push(ClearColor {
                draw_buffer: slot as u32,
                kind,
                value,
            });
        } else if subpass.depth_stencil == Some(attachment) {
            let ClearValue::DepthStencil { depth, stencil } = *value else {
                continue;
            };
            let format = framebuffer
                .attachments
                .get(attachment as usize)
                .map(|view| view.format);
            let mut aspects = ClearAspects::empty();
            if desc.load_op == vk::AttachmentLoadOp::CLEAR
                && format.is_some_and(|f| f.has_depth())
            {
                aspects |= ClearAspects::DEPTH;
            }
            if desc.stencil_load_op == vk::AttachmentLoadOp::CLEAR
                && format.is_some_and(|f| f.has_stencil())
            {
                aspects |= ClearAspects::STENCIL;
            }
            if !aspects.is_empty() {
                out.push(ClearDepthStencil {
                    depth,
                    stencil,
                    aspects: aspects.bits(),
                    ..Default::default()
                });
            }
        }
    }
}

fn blit_resolves(out: &mut CmdBuffer, pass: &ActivePass) {
    let Some(framebuffer) = &pass.framebuffer else {
        return;
    };
    let area = pass.render_area;
    let rect = [
        area.offset.x,
        area.offset.y,
        area.offset.x + area.extent.width as i32,
        area.offset.y + area.extent.height as i32,
    ];
    for target in framebuffer.resolves_of(pass.subpass) {
        out.push(BlitFramebuffer {
            src_framebuffer: target.src_framebuffer,
            dst_framebuffer: target.dst_framebuffer,
            src: rect,
            dst: rect,
            mask: gl::COLOR_BUFFER_BIT,
            filter: gl::NEAREST,
        });
    }
}
