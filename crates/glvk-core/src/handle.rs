use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifies a device object. Ids are unique per device and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Handle {
    /// Unique object identifier within the device
    pub id: u64,
    /// Type tag for debugging and validation
    pub kind: ResourceKind,
}

impl Handle {
    /// Create a null/invalid handle.
    pub fn null() -> Self {
        Self {
            id: 0,
            kind: ResourceKind::None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind == ResourceKind::None && self.id == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    None,
    DeviceMemory,
    Buffer,
    BufferView,
    Image,
    ImageView,
    Sampler,
    DescriptorSetLayout,
    DescriptorSet,
    PipelineLayout,
    ShaderModule,
    Pipeline,
    RenderPass,
    Framebuffer,
    QueryPool,
    Event,
    GeometryBuffer,
    CommandBuffer,
}

/// Device-wide handle allocator.
pub struct HandleAllocator {
    next_id: AtomicU64,
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            // Start from 1: id 0 is the null handle and the default geometry
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a new handle with the given resource kind.
    pub fn alloc(&self, kind: ResourceKind) -> Handle {
        Handle {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
        }
    }
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}
