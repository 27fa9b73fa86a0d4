use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use glvk_core::Device;
use tracing::debug;

use crate::buffer::{CommandBuffer, CommandBufferLevel};

/// Hands out command buffers for one device and resets them together.
///
/// A reset bumps the pool epoch; each buffer notices the new epoch the next
/// time it is used and drops its contents then.
pub struct CommandPool {
    device: Arc<Device>,
    epoch: Arc<AtomicU64>,
    allocated: AtomicUsize,
}

impl CommandPool {
    pub fn new(device: Arc<Device>) -> Self {
        Self {
            device,
            epoch: Arc::new(AtomicU64::new(0)),
            allocated: AtomicUsize::new(0),
        }
    }

    pub fn allocate(&self, level: CommandBufferLevel) -> CommandBuffer {
        self.allocated.fetch_add(1, Ordering::Relaxed);
        CommandBuffer::new(self.device.clone(), level).with_pool(self.epoch.clone())
    }

    pub fn allocate_many(&self, level: CommandBufferLevel, count: usize) -> Vec<CommandBuffer> {
        (0..count).map(|_| self.allocate(level)).collect()
    }

    /// Return every buffer allocated from this pool to the initial state.
    pub fn reset(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(epoch, "command pool reset");
    }

    /// Number of buffers handed out so far.
    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }
}
