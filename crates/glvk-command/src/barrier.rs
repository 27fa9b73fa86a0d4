//! Pipeline barriers and event waits, reduced to `glMemoryBarrier`.
//!
//! GL orders commands on one context implicitly. The only thing left to
//! express is which incoherent writes must become visible, and that depends
//! solely on the destination access mask.

use ash::vk;
use glvk_core::resource::Event;
use glvk_protocol::gl::BarrierBits;
use glvk_protocol::records::MemoryBarrier;
use tracing::trace;

use crate::buffer::CommandBuffer;
use crate::error::CommandError;

/// One global, buffer or image memory barrier; only the access masks matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessBarrier {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
}

impl AccessBarrier {
    pub fn new(src_access: vk::AccessFlags, dst_access: vk::AccessFlags) -> Self {
        Self {
            src_access,
            dst_access,
        }
    }
}

/// GL barrier bits needed before accesses of kind `dst_access`.
pub fn barrier_bits(dst_access: vk::AccessFlags) -> BarrierBits {
    if dst_access.intersects(vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE) {
        return BarrierBits::ALL;
    }

    let table = [
        (vk::AccessFlags::INDIRECT_COMMAND_READ, BarrierBits::COMMAND),
        (vk::AccessFlags::INDEX_READ, BarrierBits::ELEMENT_ARRAY),
        (
            vk::AccessFlags::VERTEX_ATTRIBUTE_READ,
            BarrierBits::VERTEX_ATTRIB_ARRAY,
        ),
        (vk::AccessFlags::UNIFORM_READ, BarrierBits::UNIFORM),
        (
            vk::AccessFlags::INPUT_ATTACHMENT_READ,
            BarrierBits::TEXTURE_FETCH,
        ),
        (
            vk::AccessFlags::SHADER_READ,
            BarrierBits::TEXTURE_FETCH
                .union(BarrierBits::SHADER_IMAGE_ACCESS)
                .union(BarrierBits::SHADER_STORAGE),
        ),
        (
            vk::AccessFlags::SHADER_WRITE,
            BarrierBits::SHADER_IMAGE_ACCESS.union(BarrierBits::SHADER_STORAGE),
        ),
        (
            vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
            BarrierBits::FRAMEBUFFER,
        ),
        (
            vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            BarrierBits::FRAMEBUFFER,
        ),
        (
            vk::AccessFlags::TRANSFER_READ | vk::AccessFlags::TRANSFER_WRITE,
            BarrierBits::BUFFER_UPDATE
                .union(BarrierBits::TEXTURE_UPDATE)
                .union(BarrierBits::PIXEL_BUFFER),
        ),
        (
            vk::AccessFlags::HOST_READ | vk::AccessFlags::HOST_WRITE,
            BarrierBits::CLIENT_MAPPED_BUFFER,
        ),
    ];

    table
        .iter()
        .filter(|(access, _)| dst_access.intersects(*access))
        .fold(BarrierBits::empty(), |bits, (_, gl)| bits | *gl)
}

impl CommandBuffer {
    fn emit_barrier(&mut self, barriers: &[AccessBarrier]) {
        let bits = barriers
            .iter()
            .fold(BarrierBits::empty(), |bits, b| bits | barrier_bits(b.dst_access));
        if bits.is_empty() {
            trace!("barrier needs no GL bits");
            return;
        }
        self.main.push_record(MemoryBarrier {
            bits: bits.bits(),
            ..Default::default()
        });
    }

    /// Stage masks carry no meaning on a single in-order GL context.
    pub fn pipeline_barrier(
        &mut self,
        _src_stages: vk::PipelineStageFlags,
        _dst_stages: vk::PipelineStageFlags,
        barriers: &[AccessBarrier],
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        self.emit_barrier(barriers);
        Ok(())
    }

    /// Events are set by earlier records of the same queue, so waiting
    /// reduces to the barrier.
    pub fn wait_events(
        &mut self,
        events: &[std::sync::Arc<Event>],
        barriers: &[AccessBarrier],
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        trace!(events = events.len(), "wait events");
        self.emit_barrier(barriers);
        Ok(())
    }
}
