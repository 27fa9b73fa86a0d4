//! Render passes and framebuffers.
//!
//! GL has no render pass object. A render pass here is the bookkeeping the
//! recorder needs to translate begin/next/end: which subpass first touches
//! each attachment (it gets cleared there), and which attachments resolve at
//! the end of a subpass. A framebuffer owns one GL framebuffer per subpass
//! plus a read/draw framebuffer pair per resolve.

use std::sync::Arc;

use ash::vk;

use crate::error::CoreError;
use crate::format::format_info;
use crate::handle::Handle;
use crate::resource::ImageView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDescription {
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
}

impl AttachmentDescription {
    pub fn is_depth_stencil(&self) -> bool {
        format_info(self.format)
            .map(|f| f.depth_stencil_point().is_some())
            .unwrap_or(false)
    }

    /// Whether beginning the pass clears any aspect of this attachment.
    pub fn clears(&self) -> bool {
        self.load_op == vk::AttachmentLoadOp::CLEAR
            || (self.stencil_load_op == vk::AttachmentLoadOp::CLEAR && self.is_depth_stencil())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubpassDescription {
    /// Color attachment indices; `None` leaves the draw buffer unused.
    pub color: Vec<Option<u32>>,
    /// Same length as `color` when present.
    pub resolve: Vec<Option<u32>>,
    pub depth_stencil: Option<u32>,
    pub input: Vec<Option<u32>>,
}

impl SubpassDescription {
    fn references(&self) -> impl Iterator<Item = u32> + '_ {
        self.color
            .iter()
            .chain(&self.resolve)
            .chain(&self.input)
            .chain(std::iter::once(&self.depth_stencil))
            .filter_map(|a| *a)
    }

    /// `(color slot, resolve attachment)` pairs.
    pub fn resolves(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.resolve
            .iter()
            .enumerate()
            .filter_map(|(slot, r)| r.map(|r| (slot, r)))
    }
}

#[derive(Debug)]
pub struct RenderPass {
    pub handle: Handle,
    pub attachments: Vec<AttachmentDescription>,
    pub subpasses: Vec<SubpassDescription>,
    /// Subpass of each attachment's first use.
    first_use: Vec<Option<u32>>,
}

impl RenderPass {
    pub fn new(
        handle: Handle,
        attachments: Vec<AttachmentDescription>,
        subpasses: Vec<SubpassDescription>,
    ) -> Result<Self, CoreError> {
        if subpasses.is_empty() {
            return Err(CoreError::InvalidRenderPass(
                "render pass has no subpasses".into(),
            ));
        }
        let mut first_use = vec![None; attachments.len()];
        for (index, subpass) in subpasses.iter().enumerate() {
            if !subpass.resolve.is_empty() && subpass.resolve.len() != subpass.color.len() {
                return Err(CoreError::InvalidRenderPass(format!(
                    "subpass {} has {} resolve attachments for {} color attachments",
                    index,
                    subpass.resolve.len(),
                    subpass.color.len()
                )));
            }
            for attachment in subpass.references() {
                let slot = first_use.get_mut(attachment as usize).ok_or_else(|| {
                    CoreError::InvalidRenderPass(format!(
                        "subpass {} references attachment {} of {}",
                        index,
                        attachment,
                        attachments.len()
                    ))
                })?;
                slot.get_or_insert(index as u32);
            }
        }
        Ok(Self {
            handle,
            attachments,
            subpasses,
            first_use,
        })
    }

    pub fn first_use(&self, attachment: u32) -> Option<u32> {
        self.first_use.get(attachment as usize).copied().flatten()
    }

    /// Attachments that are first used in `subpass` and cleared on load.
    pub fn clears_in(&self, subpass: u32) -> impl Iterator<Item = u32> + '_ {
        self.attachments
            .iter()
            .enumerate()
            .filter(move |(i, a)| a.clears() && self.first_use(*i as u32) == Some(subpass))
            .map(|(i, _)| i as u32)
    }

    /// Number of clear values `begin` must be given.
    pub fn clear_value_count(&self) -> usize {
        self.attachments
            .iter()
            .rposition(|a| a.clears())
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

/// Read framebuffer holding the multisampled color, draw framebuffer holding
/// the resolve target, both at `COLOR_ATTACHMENT0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveTarget {
    pub src_framebuffer: u32,
    pub dst_framebuffer: u32,
}

#[derive(Debug)]
pub struct Framebuffer {
    pub handle: Handle,
    pub attachments: Vec<Arc<ImageView>>,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    /// GL framebuffer per subpass.
    pub subpass_framebuffers: Vec<u32>,
    /// Per subpass, one entry per resolving color slot.
    pub resolves: Vec<Vec<ResolveTarget>>,
}

impl Framebuffer {
    /// Same attachment count and formats as the render pass.
    pub fn is_compatible(&self, render_pass: &RenderPass) -> bool {
        self.attachments.len() == render_pass.attachments.len()
            && self
                .attachments
                .iter()
                .zip(&render_pass.attachments)
                .all(|(view, desc)| view.desc.format == desc.format)
    }

    pub fn subpass_framebuffer(&self, subpass: u32) -> Option<u32> {
        self.subpass_framebuffers.get(subpass as usize).copied()
    }

    pub fn resolves_of(&self, subpass: u32) -> &[ResolveTarget] {
        self.resolves
            .get(subpass as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
