//! Buffers, images, views, samplers, query pools and events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use ash::vk;

use crate::convert;
use crate::format::FormatInfo;
use crate::handle::Handle;
use crate::memory::{DeviceMemory, ImageMemoryLayout};

/// Memory a buffer or image was bound to.
#[derive(Debug, Clone)]
pub struct BoundMemory {
    pub memory: Arc<DeviceMemory>,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDesc {
    pub size: u64,
    pub usage: vk::BufferUsageFlags,
}

#[derive(Debug)]
pub struct Buffer {
    pub handle: Handle,
    pub gl_name: u32,
    pub size: u64,
    pub usage: vk::BufferUsageFlags,
    pub(crate) memory: OnceLock<BoundMemory>,
}

impl Buffer {
    pub fn memory(&self) -> Option<&BoundMemory> {
        self.memory.get()
    }

    /// Copies written into this buffer must be read back into host memory.
    pub fn is_host_visible(&self) -> bool {
        self.memory
            .get()
            .map(|m| m.memory.is_host_visible())
            .unwrap_or(false)
    }

    /// Handles whose destruction invalidates anything derived from this buffer.
    pub fn dependencies(&self) -> impl Iterator<Item = Handle> + '_ {
        std::iter::once(self.handle).chain(self.memory.get().map(|m| m.memory.handle()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageDesc {
    pub image_type: vk::ImageType,
    pub format: vk::Format,
    pub extent: vk::Extent3D,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: vk::SampleCountFlags,
    pub usage: vk::ImageUsageFlags,
}

#[derive(Debug)]
pub struct Image {
    pub handle: Handle,
    pub gl_name: u32,
    pub gl_target: u32,
    pub desc: ImageDesc,
    pub format: FormatInfo,
    pub layout: ImageMemoryLayout,
    pub(crate) memory: OnceLock<BoundMemory>,
}

impl Image {
    pub fn memory(&self) -> Option<&BoundMemory> {
        self.memory.get()
    }

    pub fn level_extent(&self, level: u32) -> vk::Extent3D {
        let e = self.desc.extent;
        vk::Extent3D {
            width: (e.width >> level).max(1),
            height: (e.height >> level).max(1),
            depth: (e.depth >> level).max(1),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ImageViewDesc {
    pub view_type: vk::ImageViewType,
    pub format: vk::Format,
    pub subresource_range: vk::ImageSubresourceRange,
}

#[derive(Debug)]
pub struct ImageView {
    pub handle: Handle,
    pub gl_name: u32,
    pub gl_target: u32,
    pub image: Arc<Image>,
    pub desc: ImageViewDesc,
    pub format: FormatInfo,
}

impl ImageView {
    pub fn base_level(&self) -> u32 {
        self.desc.subresource_range.base_mip_level
    }

    pub fn base_layer(&self) -> u32 {
        self.desc.subresource_range.base_array_layer
    }

    pub fn layer_count(&self) -> u32 {
        self.desc.subresource_range.layer_count
    }
}

#[derive(Debug)]
pub struct BufferView {
    pub handle: Handle,
    /// Buffer texture name.
    pub gl_name: u32,
    pub buffer: Arc<Buffer>,
    pub format: FormatInfo,
    pub offset: u64,
    pub range: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerInfo {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub mipmap_mode: vk::SamplerMipmapMode,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: Option<f32>,
    pub compare_op: Option<vk::CompareOp>,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerInfo {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            mip_lod_bias: 0.0,
            max_anisotropy: None,
            compare_op: None,
            min_lod: 0.0,
            max_lod: vk::LOD_CLAMP_NONE,
        }
    }
}

#[derive(Debug)]
pub struct Sampler {
    pub handle: Handle,
    pub gl_name: u32,
    pub info: SamplerInfo,
}

#[derive(Debug)]
pub struct QueryPool {
    pub handle: Handle,
    pub query_type: vk::QueryType,
    pub names: Vec<u32>,
}

impl QueryPool {
    pub fn name(&self, query: u32) -> Option<u32> {
        self.names.get(query as usize).copied()
    }

    /// Query target used by `BeginQuery`.
    pub fn target(&self, precise: bool) -> u32 {
        convert::query_target(self.query_type, precise)
    }
}

/// Host/device synchronization flag. Set and reset by replayed records.
#[derive(Debug)]
pub struct Event {
    pub handle: Handle,
    signaled: AtomicBool,
}

impl Event {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            signaled: AtomicBool::new(false),
        }
    }

    pub fn set(&self) {
        self.signaled.store(true, Ordering::Release);
    }

    pub fn reset(&self) {
        self.signaled.store(false, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.signaled.load(Ordering::Acquire)
    }
}
