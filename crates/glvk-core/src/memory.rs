//! Device memory: a host shadow the application maps, device storage the GL
//! objects are filled from, and the lock/flush/invalidate/unlock contract
//! between the two.
//!
//! Flushing pushes a byte range from the shadow into device storage and
//! queues a [`PendingUpload`] for every buffer or image subresource bound to
//! that range. The replay engine drains those uploads under the context lock
//! before it replays a stream.

use ash::vk;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::trace;

use crate::error::CoreError;
use crate::handle::Handle;

/// Data that has to reach a GL object before the next replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingUpload {
    Buffer {
        buffer: u32,
        offset: u64,
        data: Vec<u8>,
    },
    Image {
        texture: u32,
        target: u32,
        level: u32,
        layer: u32,
        width: u32,
        height: u32,
        depth: u32,
        format: u32,
        ty: u32,
        data: Vec<u8>,
    },
}

/// Placement of one `(layer, level)` subresource inside an image's memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubresourceLayout {
    pub layer: u32,
    pub level: u32,
    pub offset: u64,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

/// Tightly packed, layer-major layout of an image's subresources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMemoryLayout {
    subresources: Vec<SubresourceLayout>,
    total: u64,
}

impl ImageMemoryLayout {
    pub fn new(extent: vk::Extent3D, levels: u32, layers: u32, texel_size: u32) -> Self {
        let mut subresources = Vec::with_capacity((levels * layers) as usize);
        let mut offset = 0u64;
        for layer in 0..layers {
            for level in 0..levels {
                let width = (extent.width >> level).max(1);
                let height = (extent.height >> level).max(1);
                let depth = (extent.depth >> level).max(1);
                let size = width as u64 * height as u64 * depth as u64 * texel_size as u64;
                subresources.push(SubresourceLayout {
                    layer,
                    level,
                    offset,
                    size,
                    width,
                    height,
                    depth,
                });
                offset += size;
            }
        }
        Self {
            subresources,
            total: offset,
        }
    }

    pub fn total_size(&self) -> u64 {
        self.total
    }

    pub fn subresources(&self) -> &[SubresourceLayout] {
        &self.subresources
    }

    /// Subresources overlapping `[offset, offset + size)`, relative to the image start.
    pub fn touched(&self, offset: u64, size: u64) -> impl Iterator<Item = &SubresourceLayout> {
        let end = offset.saturating_add(size);
        self.subresources
            .iter()
            .filter(move |s| s.size > 0 && s.offset < end && offset < s.offset + s.size)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum BindingTarget {
    Buffer {
        name: u32,
    },
    Image {
        texture: u32,
        target: u32,
        layout: ImageMemoryLayout,
        format: u32,
        ty: u32,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct MemoryBinding {
    pub resource: Handle,
    pub offset: u64,
    pub size: u64,
    pub target: BindingTarget,
}

pub struct DeviceMemory {
    handle: Handle,
    size: u64,
    properties: vk::MemoryPropertyFlags,
    /// Host-visible shadow. Held locked for the lifetime of a [`MappedRange`].
    shadow: Mutex<Vec<u8>>,
    /// What the GL objects bound to this memory are filled from.
    storage: Mutex<Vec<u8>>,
    bindings: RwLock<Vec<MemoryBinding>>,
    pending: Mutex<Vec<PendingUpload>>,
}

impl DeviceMemory {
    pub fn new(handle: Handle, size: u64, properties: vk::MemoryPropertyFlags) -> Self {
        let host_visible = properties.contains(vk::MemoryPropertyFlags::HOST_VISIBLE);
        Self {
            handle,
            size,
            properties,
            shadow: Mutex::new(if host_visible {
                vec![0; size as usize]
            } else {
                Vec::new()
            }),
            storage: Mutex::new(vec![0; size as usize]),
            bindings: RwLock::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn properties(&self) -> vk::MemoryPropertyFlags {
        self.properties
    }

    pub fn is_host_visible(&self) -> bool {
        self.properties
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE)
    }

    pub fn is_host_coherent(&self) -> bool {
        self.properties
            .contains(vk::MemoryPropertyFlags::HOST_COHERENT)
    }

    /// Resolve `vk::WHOLE_SIZE` and bounds-check a range of this allocation.
    fn resolve_range(&self, offset: u64, size: u64) -> Result<(u64, u64), CoreError> {
        let size = if size == vk::WHOLE_SIZE {
            self.size.saturating_sub(offset)
        } else {
            size
        };
        match offset.checked_add(size) {
            Some(end) if end <= self.size => Ok((offset, size)),
            _ => Err(CoreError::OutOfRange {
                offset,
                size,
                limit: self.size,
            }),
        }
    }

    /// Map `[offset, offset + size)` for host access. Only one range may be
    /// mapped at a time.
    pub fn lock(&self, offset: u64, size: u64) -> Result<MappedRange<'_>, CoreError> {
        if !self.is_host_visible() {
            return Err(CoreError::NotHostVisible(self.handle));
        }
        let (offset, size) = self.resolve_range(offset, size)?;
        let shadow = self
            .shadow
            .try_lock()
            .ok_or(CoreError::AlreadyLocked {
                memory: self.handle,
            })?;

        let mut mapped = MappedRange {
            memory: self,
            shadow,
            offset,
            size,
        };
        if self.is_host_coherent() {
            mapped.pull(offset, size);
        }
        trace!(memory = self.handle.id, offset, size, "memory locked");
        Ok(mapped)
    }

    pub fn is_locked(&self) -> bool {
        self.shadow.is_locked()
    }

    /// Copy of the device storage; what the GL objects see after uploads.
    pub fn read_device(&self, offset: u64, size: u64) -> Result<Vec<u8>, CoreError> {
        let (offset, size) = self.resolve_range(offset, size)?;
        let storage = self.storage.lock();
        Ok(storage[offset as usize..(offset + size) as usize].to_vec())
    }

    /// Write device storage directly, as a GPU-side copy into this memory does.
    pub fn write_device(&self, offset: u64, data: &[u8]) -> Result<(), CoreError> {
        let (offset, size) = self.resolve_range(offset, data.len() as u64)?;
        let mut storage = self.storage.lock();
        storage[offset as usize..(offset + size) as usize].copy_from_slice(data);
        Ok(())
    }

    pub(crate) fn bind(&self, binding: MemoryBinding) -> Result<(), CoreError> {
        self.resolve_range(binding.offset, binding.size)?;
        self.bindings.write().push(binding);
        Ok(())
    }

    pub(crate) fn unbind(&self, resource: Handle) {
        self.bindings.write().retain(|b| b.resource != resource);
    }

    pub fn binding_count(&self) -> usize {
        self.bindings.read().len()
    }

    /// Take the uploads queued by flushes since the previous call.
    pub fn take_pending_uploads(&self) -> Vec<PendingUpload> {
        std::mem::take(&mut *self.pending.lock())
    }

    pub fn has_pending_uploads(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    fn queue_uploads(&self, offset: u64, size: u64, storage: &[u8]) {
        let end = offset + size;
        let bindings = self.bindings.read();
        let mut pending = self.pending.lock();

        for binding in bindings.iter() {
            let bind_end = binding.offset + binding.size;
            if binding.offset >= end || offset >= bind_end {
                continue;
            }
            match &binding.target {
                BindingTarget::Buffer { name } => {
                    let start = offset.max(binding.offset);
                    let stop = end.min(bind_end);
                    pending.push(PendingUpload::Buffer {
                        buffer: *name,
                        offset: start - binding.offset,
                        data: storage[start as usize..stop as usize].to_vec(),
                    });
                }
                BindingTarget::Image {
                    texture,
                    target,
                    layout,
                    format,
                    ty,
                } => {
                    let relative = offset.saturating_sub(binding.offset);
                    let relative_end = end.min(bind_end) - binding.offset;
                    for sub in layout.touched(relative, relative_end - relative) {
                        let start = (binding.offset + sub.offset) as usize;
                        pending.push(PendingUpload::Image {
                            texture: *texture,
                            target: *target,
                            level: sub.level,
                            layer: sub.layer,
                            width: sub.width,
                            height: sub.height,
                            depth: sub.depth,
                            format: *format,
                            ty: *ty,
                            data: storage[start..start + sub.size as usize].to_vec(),
                        });
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for DeviceMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("handle", &self.handle)
            .field("size", &self.size)
            .field("properties", &self.properties)
            .finish()
    }
}

/// An active host mapping. Dropping it unlocks the memory.
pub struct MappedRange<'a> {
    memory: &'a DeviceMemory,
    shadow: MutexGuard<'a, Vec<u8>>,
    offset: u64,
    size: u64,
}

impl MappedRange<'_> {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// The mapped bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.shadow[self.offset as usize..(self.offset + self.size) as usize]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        let (start, end) = (self.offset as usize, (self.offset + self.size) as usize);
        &mut self.shadow[start..end]
    }

    /// Resolve an absolute memory range that must lie inside the mapping.
    fn check(&self, offset: u64, size: u64) -> Result<(u64, u64), CoreError> {
        let map_end = self.offset + self.size;
        let size = if size == vk::WHOLE_SIZE {
            map_end.saturating_sub(offset)
        } else {
            size
        };
        match offset.checked_add(size) {
            Some(end) if offset >= self.offset && end <= map_end => Ok((offset, size)),
            _ => Err(CoreError::OutOfRange {
                offset,
                size,
                limit: map_end,
            }),
        }
    }

    /// Make host writes to `[offset, offset + size)` (memory offsets) visible to the device.
    pub fn flush(&mut self, offset: u64, size: u64) -> Result<(), CoreError> {
        let (offset, size) = self.check(offset, size)?;
        self.push(offset, size);
        Ok(())
    }

    /// Make device writes to `[offset, offset + size)` visible to the host.
    pub fn invalidate(&mut self, offset: u64, size: u64) -> Result<(), CoreError> {
        let (offset, size) = self.check(offset, size)?;
        self.pull(offset, size);
        Ok(())
    }

    pub fn unlock(self) {}

    fn push(&mut self, offset: u64, size: u64) {
        let range = offset as usize..(offset + size) as usize;
        let mut storage = self.memory.storage.lock();
        storage[range.clone()].copy_from_slice(&self.shadow[range]);
        self.memory.queue_uploads(offset, size, &storage);
        trace!(memory = self.memory.handle.id, offset, size, "flushed");
    }

    fn pull(&mut self, offset: u64, size: u64) {
        let range = offset as usize..(offset + size) as usize;
        let storage = self.memory.storage.lock();
        self.shadow[range.clone()].copy_from_slice(&storage[range]);
    }
}

impl Drop for MappedRange<'_> {
    fn drop(&mut self) {
        if self.memory.is_host_coherent() {
            self.push(self.offset, self.size);
        }
        trace!(memory = self.memory.handle.id, "memory unlocked");
    }
}
