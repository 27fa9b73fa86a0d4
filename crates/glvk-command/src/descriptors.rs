//! Descriptor set binds, resolved through the layout's binding table.

use std::sync::Arc;

use ash::vk;
use glvk_core::binding::{BindingSlot, DescriptorClass};
use glvk_core::descriptor::{DescriptorInfo, DescriptorSet};
use glvk_core::pipeline::PipelineLayout;
use glvk_protocol::gl;
use glvk_protocol::records::{BindBufferRange, BindImageTexture, BindSampler, BindTexture};
use glvk_protocol::CmdBuffer;
use tracing::{debug, trace};

use crate::buffer::CommandBuffer;
use crate::error::CommandError;

impl CommandBuffer {
    /// Bind `sets` starting at set index `first_set` of `layout`.
    ///
    /// `dynamic_offsets` holds one entry per dynamic buffer element of the
    /// bound sets, in `(set, binding, element)` order.
    pub fn bind_descriptor_sets(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        layout: &PipelineLayout,
        first_set: u32,
        sets: &[Arc<DescriptorSet>],
        dynamic_offsets: &[u32],
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let end_set = u32::try_from(sets.len())
            .ok()
            .and_then(|count| first_set.checked_add(count))
            .filter(|end| *end as usize <= layout.set_layouts.len())
            .ok_or_else(|| {
                CommandError::InvalidArgument(format!(
                    "{} sets from set {} exceed the layout's {} sets",
                    sets.len(),
                    first_set,
                    layout.set_layouts.len()
                ))
            })?;

        let table = &layout.binding_table;
        let expected: u32 = table
            .iter()
            .filter(|((set, _), slot)| {
                (first_set..end_set).contains(set) && slot.class.is_dynamic()
            })
            .map(|(_, slot)| slot.count)
            .sum();
        if expected as usize != dynamic_offsets.len() {
            return Err(CommandError::DynamicOffsetCount {
                expected: expected as usize,
                got: dynamic_offsets.len(),
            });
        }
        let dynamic_base = table.dynamic_offsets_before(first_set);

        let mut out = CmdBuffer::new();
        for (set_index, set) in (first_set..).zip(sets) {
            for ((binding, element), info) in set.snapshot() {
                let Some(slot) = table.lookup(set_index, binding) else {
                    trace!(set = set_index, binding, "binding not in pipeline layout");
                    continue;
                };
                if element >= slot.count {
                    continue;
                }
                let dynamic_offset = slot
                    .dynamic_index
                    .and_then(|i| dynamic_offsets.get((i - dynamic_base + element) as usize))
                    .copied()
                    .unwrap_or(0);
                emit_descriptor(&mut out, slot, element, &info, dynamic_offset);
            }
        }

        debug!(
            ?bind_point,
            first_set,
            sets = sets.len(),
            words = out.len(),
            "descriptor sets bound"
        );
        self.main.push(out);
        Ok(())
    }
}

fn emit_descriptor(
    out: &mut CmdBuffer,
    slot: &BindingSlot,
    element: u32,
    info: &DescriptorInfo,
    dynamic_offset: u32,
) {
    use DescriptorClass::*;

    let unit = slot.base + element;
    match (slot.class, info) {
        (
            UniformBuffer | UniformBufferDynamic | StorageBuffer | StorageBufferDynamic,
            DescriptorInfo::Buffer {
                buffer,
                offset,
                range,
            },
        ) => {
            let target = if matches!(slot.class, UniformBuffer | UniformBufferDynamic) {
                gl::UNIFORM_BUFFER
            } else {
                gl::SHADER_STORAGE_BUFFER
            };
            out.push(BindBufferRange {
                offset: offset.saturating_add(dynamic_offset as u64),
                size: *range,
                target,
                index: unit,
                buffer: buffer.gl_name,
                ..Default::default()
            });
        }
        (
            CombinedImageSampler | SampledImage | InputAttachment,
            DescriptorInfo::Image {
                view: Some(view),
                sampler,
            },
        ) => {
            out.push(BindTexture {
                unit,
                target: view.gl_target,
                texture: view.gl_name,
                sampler: sampler.as_ref().map(|s| s.gl_name).unwrap_or(0),
            });
        }
        (
            Sampler,
            DescriptorInfo::Image {
                sampler: Some(sampler),
                ..
            },
        ) => {
            out.push(BindSampler {
                unit,
                sampler: sampler.gl_name,
            });
        }
        (StorageImage, DescriptorInfo::Image { view: Some(view), .. }) => {
            out.push(BindImageTexture {
                unit,
                texture: view.gl_name,
                level: view.base_level() as i32,
                layered: u32::from(view.layer_count() > 1),
                layer: view.base_layer() as i32,
                access: gl::READ_WRITE,
                format: view.format.internal_format,
                ..Default::default()
            });
        }
        (UniformTexelBuffer, DescriptorInfo::TexelBuffer { view }) => {
            out.push(BindTexture {
                unit,
                target: gl::TEXTURE_BUFFER,
                texture: view.gl_name,
                sampler: 0,
            });
        }
        (StorageTexelBuffer, DescriptorInfo::TexelBuffer { view }) => {
            out.push(BindImageTexture {
                unit,
                texture: view.gl_name,
                level: 0,
                layered: 0,
                layer: 0,
                access: gl::READ_WRITE,
                format: view.format.internal_format,
                ..Default::default()
            });
        }
        (class, _) => {
            trace!(?class, unit, "descriptor does not match its binding class");
        }
    }
}
