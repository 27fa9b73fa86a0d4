//! Buffer and image transfers.
//!
//! Transfers whose destination buffer lives in host-visible memory also
//! record an after-submit readback so the host sees the result after the
//! next invalidate.

use std::sync::Arc;

use ash::vk;
use glvk_core::resource::{Buffer, Image};
use glvk_protocol::records::{
    CopyBuffer, CopyBufferToImage, CopyImage, CopyImageToBuffer, FillBuffer, ReadbackBuffer,
};
use glvk_protocol::CmdBuffer;
use tracing::trace;

use crate::buffer::CommandBuffer;
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCopy {
    pub src_subresource: vk::ImageSubresourceLayers,
    pub src_offset: vk::Offset3D,
    pub dst_subresource: vk::ImageSubresourceLayers,
    pub dst_offset: vk::Offset3D,
    pub extent: vk::Extent3D,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BufferImageCopy {
    pub buffer_offset: u64,
    /// Texels per row in the buffer; 0 means tightly packed.
    pub buffer_row_length: u32,
    /// Rows per image in the buffer; 0 means tightly packed.
    pub buffer_image_height: u32,
    pub image_subresource: vk::ImageSubresourceLayers,
    pub image_offset: vk::Offset3D,
    pub image_extent: vk::Extent3D,
}

fn check_buffer_range(buffer: &Buffer, offset: u64, size: u64) -> Result<(), CommandError> {
    match offset.checked_add(size) {
        Some(end) if end <= buffer.size => Ok(()),
        _ => Err(CommandError::InvalidArgument(format!(
            "range {}+{} exceeds buffer of {} bytes",
            offset, size, buffer.size
        ))),
    }
}

/// GL coordinates of one region: `(z, depth)`. Array layers of non-3D
/// images are addressed as the z axis.
fn image_region(
    image: &Image,
    subresource: &vk::ImageSubresourceLayers,
    offset: vk::Offset3D,
    extent: vk::Extent3D,
) -> Result<(i32, u32), CommandError> {
    if subresource.mip_level >= image.desc.mip_levels {
        return Err(CommandError::InvalidArgument(format!(
            "mip level {} of an image with {} levels",
            subresource.mip_level, image.desc.mip_levels
        )));
    }
    let level = image.level_extent(subresource.mip_level);
    let fits = |o: i32, e: u32, limit: u32| o >= 0 && o as u64 + e as u64 <= limit as u64;
    if !fits(offset.x, extent.width, level.width) || !fits(offset.y, extent.height, level.height) {
        return Err(CommandError::InvalidArgument(format!(
            "region {:?}+{:?} exceeds level {} extent {:?}",
            offset, extent, subresource.mip_level, level
        )));
    }

    if image.desc.image_type == vk::ImageType::TYPE_3D {
        if !fits(offset.z, extent.depth, level.depth) {
            return Err(CommandError::InvalidArgument(format!(
                "depth {}+{} exceeds {}",
                offset.z, extent.depth, level.depth
            )));
        }
        Ok((offset.z, extent.depth))
    } else {
        let layers = if subresource.layer_count == vk::REMAINING_ARRAY_LAYERS {
            image.desc.array_layers.saturating_sub(subresource.base_array_layer)
        } else {
            subresource.layer_count
        };
        if subresource.base_array_layer as u64 + layers as u64 > image.desc.array_layers as u64 {
            return Err(CommandError::InvalidArgument(format!(
                "layers {}+{} exceed {}",
                subresource.base_array_layer, layers, image.desc.array_layers
            )));
        }
        Ok((subresource.base_array_layer as i32, layers))
    }
}

/// Bytes a buffer-image region spans in the buffer.
fn buffer_footprint(region: &BufferImageCopy, depth: u32, texel_size: u32) -> u64 {
    let extent = region.image_extent;
    let row = if region.buffer_row_length == 0 {
        extent.width
    } else {
        region.buffer_row_length
    } as u64;
    let rows = if region.buffer_image_height == 0 {
        extent.height
    } else {
        region.buffer_image_height
    } as u64;
    if extent.width == 0 || extent.height == 0 || depth == 0 {
        return 0;
    }
    let texels = (depth as u64 - 1)
        .saturating_mul(rows)
        .saturating_mul(row)
        .saturating_add((extent.height as u64 - 1).saturating_mul(row))
        .saturating_add(extent.width as u64);
    texels.saturating_mul(texel_size as u64)
}

impl CommandBuffer {
    fn ensure_outside_pass(&mut self) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if self.rec.render_pass.is_some() {
            return Err(CommandError::RenderPassActive);
        }
        Ok(())
    }

    /// Queue a copy of `dst[offset..offset + size]` back into host memory.
    fn readback(&mut self, dst: &Buffer, offset: u64, size: u64) {
        if !dst.is_host_visible() || size == 0 {
            return;
        }
        let Some(bound) = dst.memory() else {
            return;
        };
        let memory = self.resources.add_memory(bound.memory.clone());
        trace!(buffer = dst.gl_name, memory, offset, size, "readback recorded");
        self.after.push_record(ReadbackBuffer {
            buffer_offset: offset,
            memory_offset: bound.offset + offset,
            size,
            memory,
            buffer: dst.gl_name,
            ..Default::default()
        });
    }

    pub fn copy_buffer(
        &mut self,
        src: &Arc<Buffer>,
        dst: &Arc<Buffer>,
        regions: &[BufferCopy],
    ) -> Result<(), CommandError> {
        self.ensure_outside_pass()?;
        for region in regions {
            check_buffer_range(src, region.src_offset, region.size)?;
            check_buffer_range(dst, region.dst_offset, region.size)?;
        }

        let mut out = CmdBuffer::new();
        for region in regions {
            out.push(CopyBuffer {
                src_offset: region.src_offset,
                dst_offset: region.dst_offset,
                size: region.size,
                src: src.gl_name,
                dst: dst.gl_name,
            });
        }
        self.main.push(out);
        for region in regions {
            self.readback(dst, region.dst_offset, region.size);
        }
        Ok(())
    }

    pub fn copy_image(
        &mut self,
        src: &Arc<Image>,
        dst: &Arc<Image>,
        regions: &[ImageCopy],
    ) -> Result<(), CommandError> {
        self.ensure_outside_pass()?;
        let mut out = CmdBuffer::new();
        for region in regions {
            let (src_z, depth) =
                image_region(src, &region.src_subresource, region.src_offset, region.extent)?;
            let (dst_z, dst_depth) =
                image_region(dst, &region.dst_subresource, region.dst_offset, region.extent)?;
            if depth != dst_depth {
                return Err(CommandError::InvalidArgument(format!(
                    "image copy spans {} source and {} destination layers",
                    depth, dst_depth
                )));
            }
            out.push(CopyImage {
                src_texture: src.gl_name,
                src_target: src.gl_target,
                src_level: region.src_subresource.mip_level as i32,
                src_x: region.src_offset.x,
                src_y: region.src_offset.y,
                src_z,
                dst_texture: dst.gl_name,
                dst_target: dst.gl_target,
                dst_level: region.dst_subresource.mip_level as i32,
                dst_x: region.dst_offset.x,
                dst_y: region.dst_offset.y,
                dst_z,
                width: region.extent.width,
                height: region.extent.height,
                depth,
                ..Default::default()
            });
        }
        self.main.push(out);
        Ok(())
    }

    pub fn copy_buffer_to_image(
        &mut self,
        src: &Arc<Buffer>,
        dst: &Arc<Image>,
        regions: &[BufferImageCopy],
    ) -> Result<(), CommandError> {
        self.ensure_outside_pass()?;
        let mut out = CmdBuffer::new();
        for region in regions {
            let (z, depth) = image_region(
                dst,
                &region.image_subresource,
                region.image_offset,
                region.image_extent,
            )?;
            let size = buffer_footprint(region, depth, dst.format.texel_size);
            check_buffer_range(src, region.buffer_offset, size)?;
            out.push(CopyBufferToImage {
                buffer_offset: region.buffer_offset,
                buffer: src.gl_name,
                texture: dst.gl_name,
                target: dst.gl_target,
                level: region.image_subresource.mip_level as i32,
                x: region.image_offset.x,
                y: region.image_offset.y,
                z,
                width: region.image_extent.width,
                height: region.image_extent.height,
                depth,
                row_length: region.buffer_row_length,
                image_height: region.buffer_image_height,
                format: dst.format.pixel_format,
                ty: dst.format.pixel_type,
            });
        }
        self.main.push(out);
        Ok(())
    }

    pub fn copy_image_to_buffer(
        &mut self,
        src: &Arc<Image>,
        dst: &Arc<Buffer>,
        regions: &[BufferImageCopy],
    ) -> Result<(), CommandError> {
        self.ensure_outside_pass()?;
        let mut out = CmdBuffer::new();
        let mut readbacks = Vec::with_capacity(regions.len());
        for region in regions {
            let (z, depth) = image_region(
                src,
                &region.image_subresource,
                region.image_offset,
                region.image_extent,
            )?;
            let size = buffer_footprint(region, depth, src.format.texel_size);
            check_buffer_range(dst, region.buffer_offset, size)?;
            out.push(CopyImageToBuffer {
                buffer_offset: region.buffer_offset,
                buffer: dst.gl_name,
                texture: src.gl_name,
                target: src.gl_target,
                level: region.image_subresource.mip_level as i32,
                x: region.image_offset.x,
                y: region.image_offset.y,
                z,
                width: region.image_extent.width,
                height: region.image_extent.height,
                depth,
                row_length: region.buffer_row_length,
                image_height: region.buffer_image_height,
                format: src.format.pixel_format,
                ty: src.format.pixel_type,
            });
            readbacks.push((region.buffer_offset, size));
        }
        self.main.push(out);
        for (offset, size) in readbacks {
            self.readback(dst, offset, size);
        }
        Ok(())
    }

    /// `size` may be `vk::WHOLE_SIZE`: the rest of the buffer, rounded down
    /// to whole words.
    pub fn fill_buffer(
        &mut self,
        dst: &Arc<Buffer>,
        offset: u64,
        size: u64,
        data: u32,
    ) -> Result<(), CommandError> {
        self.ensure_outside_pass()?;
        let size = if size == vk::WHOLE_SIZE {
            dst.size.saturating_sub(offset) & !3
        } else {
            size
        };
        if offset % 4 != 0 || size % 4 != 0 {
            return Err(CommandError::InvalidArgument(format!(
                "fill range {}+{} is not 4-byte aligned",
                offset, size
            )));
        }
        check_buffer_range(dst, offset, size)?;
        self.main.push_record(FillBuffer {
            offset,
            size,
            buffer: dst.gl_name,
            data,
        });
        self.readback(dst, offset, size);
        Ok(())
    }
}
