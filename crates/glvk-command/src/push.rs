//! Push constants, shadowed in a fixed block and resolved to uniform writes.

use std::sync::Arc;

use ash::vk;
use glvk_core::pipeline::{Pipeline, PipelineLayout, MAX_PUSH_CONSTANT_SIZE};
use glvk_protocol::CmdBuffer;
use tracing::debug;

use crate::buffer::CommandBuffer;
use crate::error::CommandError;

impl CommandBuffer {
    /// Write `data` at `offset` of the push-constant block.
    ///
    /// Before the first pipeline bind the range is queued; that bind
    /// resolves it. Afterwards it resolves against the active program.
    pub fn push_constants(
        &mut self,
        layout: &PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let exceeds = || {
            CommandError::InvalidArgument(format!(
                "push constant range {}+{} exceeds {} bytes",
                offset,
                data.len(),
                MAX_PUSH_CONSTANT_SIZE
            ))
        };
        let size = u32::try_from(data.len()).map_err(|_| exceeds())?;
        if size == 0 || offset % 4 != 0 || size % 4 != 0 {
            return Err(CommandError::InvalidArgument(format!(
                "push constant range {}+{} is not 4-byte aligned",
                offset, size
            )));
        }
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= MAX_PUSH_CONSTANT_SIZE)
            .ok_or_else(exceeds)?;
        if !layout.covers_push_constants(offset, size) {
            return Err(CommandError::InvalidArgument(format!(
                "push constant range {}+{} is outside the layout's ranges",
                offset, size
            )));
        }

        let push = &mut self.rec.push;
        push.block[offset as usize..end as usize].copy_from_slice(data);
        push.written = Some(match push.written {
            Some((start, written_end)) => (start.min(offset), written_end.max(end)),
            None => (offset, end),
        });

        match self.rec.active.clone() {
            Some(pipeline) => {
                let mut out = CmdBuffer::new();
                for record in pipeline
                    .push_constants
                    .resolve(offset, size, &self.rec.push.block)
                {
                    out.push(record);
                }
                self.main.push(out);
            }
            None => {
                debug!(offset, size, ?stages, "push constants queued");
                self.rec.push.queue.push((offset, size));
            }
        }
        Ok(())
    }

    /// Resolve pending or previously written push constants for a newly
    /// applied program.
    pub(crate) fn apply_push_constants(&mut self, out: &mut CmdBuffer, pipeline: &Arc<Pipeline>) {
        let push = &mut self.rec.push;
        let ranges: Vec<(u32, u32)> = if push.queue.is_empty() {
            push.written
                .map(|(start, end)| vec![(start, end - start)])
                .unwrap_or_default()
        } else {
            std::mem::take(&mut push.queue)
        };
        for (offset, size) in ranges {
            for record in pipeline.push_constants.resolve(offset, size, &push.block) {
                out.push(record);
            }
        }
    }
}
