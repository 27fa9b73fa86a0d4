//! The recording object and its lifecycle.
//!
//! Builders append typed records to the main [`CmdList`] or the after-submit
//! list, or only update recording-time state. `end()` flattens both lists
//! into the streams the replay engine walks.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use ash::vk;
use glvk_core::pipeline::{Pipeline, MAX_PUSH_CONSTANT_SIZE};
use glvk_core::renderpass::{Framebuffer, RenderPass};
use glvk_core::resource::Buffer;
use glvk_core::{Device, Handle, ResourceKind, ResourceTable};
use glvk_protocol::{CmdBuffer, CmdList};
use tracing::debug;

use crate::error::CommandError;
use crate::render_pass::ClearValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferLevel {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    Initial,
    Recording,
    Executable,
    /// A one-time-submit buffer after its submission.
    Invalid,
}

/// Render pass state a secondary buffer continues.
#[derive(Debug, Clone, Default)]
pub struct InheritanceInfo {
    pub render_pass: Option<Arc<RenderPass>>,
    pub subpass: u32,
    pub framebuffer: Option<Arc<Framebuffer>>,
}

#[derive(Debug, Clone, Default)]
pub struct BeginInfo {
    pub flags: vk::CommandBufferUsageFlags,
    pub inheritance: Option<InheritanceInfo>,
}

impl BeginInfo {
    pub fn one_time() -> Self {
        Self {
            flags: vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT,
            inheritance: None,
        }
    }

    /// Secondary buffer recorded inside `subpass` of `render_pass`.
    pub fn continue_pass(
        render_pass: Arc<RenderPass>,
        subpass: u32,
        framebuffer: Option<Arc<Framebuffer>>,
    ) -> Self {
        Self {
            flags: vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE,
            inheritance: Some(InheritanceInfo {
                render_pass: Some(render_pass),
                subpass,
                framebuffer,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ActivePass {
    pub pass: Arc<RenderPass>,
    /// Absent for secondaries that inherit a pass without naming the framebuffer.
    pub framebuffer: Option<Arc<Framebuffer>>,
    pub subpass: u32,
    pub render_area: vk::Rect2D,
    /// Clear values given to `begin_render_pass`, indexed by attachment.
    pub clear_values: Vec<ClearValue>,
    /// Set by `begin_render_pass`; inherited passes cannot advance or end.
    pub owned: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct IndexBinding {
    pub buffer: Arc<Buffer>,
    pub offset: u64,
    pub gl_type: u32,
    pub size: u32,
}

/// Push-constant shadow block and the ranges waiting for a pipeline.
#[derive(Debug, Clone)]
pub(crate) struct PushConstantState {
    pub block: Vec<u8>,
    /// Union of every range written since begin.
    pub written: Option<(u32, u32)>,
    /// Ranges written before any pipeline was bound.
    pub queue: Vec<(u32, u32)>,
}

impl Default for PushConstantState {
    fn default() -> Self {
        Self {
            block: vec![0; MAX_PUSH_CONSTANT_SIZE as usize],
            written: None,
            queue: Vec::new(),
        }
    }
}

/// State that exists only while recording; none of it is replayed.
#[derive(Debug, Default)]
pub(crate) struct Recording {
    pub graphics: Option<Arc<Pipeline>>,
    pub compute: Option<Arc<Pipeline>>,
    /// Pipeline whose program the stream last bound. `None` when unknown.
    pub active: Option<Arc<Pipeline>>,
    pub render_pass: Option<ActivePass>,
    pub vertex_buffers: BTreeMap<u32, (Arc<Buffer>, u64)>,
    pub index_buffer: Option<IndexBinding>,
    pub vertex_input_hash: Option<u64>,
    pub geometry_dirty: bool,
    /// Geometry id of the last `BindGeometry`.
    pub bound_geometry: Option<u64>,
    pub push: PushConstantState,
    /// `(pool id, query)` -> target of the open query.
    pub queries: HashMap<(u64, u32), u32>,
    pub restore_recorded: bool,
}

pub struct CommandBuffer {
    handle: Handle,
    level: CommandBufferLevel,
    pub(crate) device: Arc<Device>,
    state: CommandBufferState,
    flags: vk::CommandBufferUsageFlags,
    inheritance: Option<InheritanceInfo>,
    pub(crate) main: CmdList,
    pub(crate) after: CmdList,
    pub(crate) resources: ResourceTable,
    pub(crate) rec: Recording,
    stream: CmdBuffer,
    after_stream: CmdBuffer,
    submitted: AtomicBool,
    /// Reset epoch of the owning pool and the epoch this buffer last saw.
    pool: Option<(Arc<AtomicU64>, u64)>,
}

impl CommandBuffer {
    pub fn new(device: Arc<Device>, level: CommandBufferLevel) -> Self {
        let handle = device.alloc_handle(ResourceKind::CommandBuffer);
        Self {
            handle,
            level,
            device,
            state: CommandBufferState::Initial,
            flags: vk::CommandBufferUsageFlags::empty(),
            inheritance: None,
            main: CmdList::new(),
            after: CmdList::new(),
            resources: ResourceTable::new(),
            rec: Recording::default(),
            stream: CmdBuffer::new(),
            after_stream: CmdBuffer::new(),
            submitted: AtomicBool::new(false),
            pool: None,
        }
    }

    pub(crate) fn with_pool(mut self, epoch: Arc<AtomicU64>) -> Self {
        let seen = epoch.load(Ordering::Acquire);
        self.pool = Some((epoch, seen));
        self
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn level(&self) -> CommandBufferLevel {
        self.level
    }

    pub fn device(&self) -> &Arc<Device> {
        &self.device
    }

    pub fn flags(&self) -> vk::CommandBufferUsageFlags {
        self.flags
    }

    pub fn state(&self) -> CommandBufferState {
        if self.pool_was_reset() {
            return CommandBufferState::Initial;
        }
        if self.state == CommandBufferState::Executable
            && self.is_one_time()
            && self.submitted.load(Ordering::Acquire)
        {
            return CommandBufferState::Invalid;
        }
        self.state
    }

    pub fn is_one_time(&self) -> bool {
        self.flags
            .contains(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT)
    }

    /// The finalised main stream.
    pub fn stream(&self) -> &CmdBuffer {
        &self.stream
    }

    /// Records replayed after the main stream of every submission.
    pub fn after_stream(&self) -> &CmdBuffer {
        &self.after_stream
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Words recorded so far, not yet flattened.
    pub fn recorded_words(&self) -> usize {
        self.main.total_words()
    }

    fn pool_was_reset(&self) -> bool {
        self.pool
            .as_ref()
            .is_some_and(|(epoch, seen)| epoch.load(Ordering::Acquire) != *seen)
    }

    /// Apply a pool reset this buffer has not observed yet.
    fn sync_pool(&mut self) {
        if let Some((epoch, seen)) = &mut self.pool {
            let current = epoch.load(Ordering::Acquire);
            if current != *seen {
                *seen = current;
                self.clear();
                self.state = CommandBufferState::Initial;
            }
        }
    }

    pub(crate) fn ensure_recording(&mut self) -> Result<(), CommandError> {
        self.sync_pool();
        match self.state {
            CommandBufferState::Recording => Ok(()),
            other => Err(CommandError::NotRecording(other)),
        }
    }

    fn clear(&mut self) {
        self.main.clear();
        self.after.clear();
        self.resources.clear();
        self.rec = Recording::default();
        self.stream.clear();
        self.after_stream.clear();
        self.submitted.store(false, Ordering::Release);
    }

    pub fn begin(&mut self, info: BeginInfo) -> Result<(), CommandError> {
        self.sync_pool();
        if self.state == CommandBufferState::Recording {
            return Err(CommandError::AlreadyRecording);
        }
        self.clear();
        self.flags = info.flags;
        self.inheritance = if self.level == CommandBufferLevel::Secondary
            && info
                .flags
                .contains(vk::CommandBufferUsageFlags::RENDER_PASS_CONTINUE)
        {
            info.inheritance
        } else {
            None
        };
        self.rec.render_pass = self.inherited_pass();

        self.state = CommandBufferState::Recording;
        debug!(id = self.handle.id, flags = ?self.flags, "command buffer begin");
        Ok(())
    }

    /// Flatten both lists into their exact-size streams.
    pub fn end(&mut self) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if self.rec.render_pass.as_ref().is_some_and(|p| p.owned) {
            return Err(CommandError::RenderPassActive);
        }
        self.stream = self.main.flatten();
        self.after_stream = self.after.flatten();
        self.state = CommandBufferState::Executable;
        debug!(
            id = self.handle.id,
            words = self.stream.len(),
            after_words = self.after_stream.len(),
            geometry = self.resources.geometry_count(),
            "command buffer end"
        );
        Ok(())
    }

    /// Drop everything recorded and start recording again, as `begin` does
    /// but keeping the usage flags and inheritance of the last `begin`.
    pub fn reset(&mut self, flags: vk::CommandBufferResetFlags) -> Result<(), CommandError> {
        self.sync_pool();
        let inherited = self.inherited_pass();
        self.clear();
        if flags.contains(vk::CommandBufferResetFlags::RELEASE_RESOURCES) {
            self.main = CmdList::new();
            self.after = CmdList::new();
            self.stream = CmdBuffer::new();
            self.after_stream = CmdBuffer::new();
        }
        self.rec.render_pass = inherited;
        self.state = CommandBufferState::Recording;
        debug!(id = self.handle.id, ?flags, "command buffer reset");
        Ok(())
    }

    /// The render pass a secondary continues, rebuilt as it was at `begin`.
    fn inherited_pass(&self) -> Option<ActivePass> {
        let pass = self.inheritance.as_ref()?;
        let render_pass = pass.render_pass.clone()?;
        let render_area = pass
            .framebuffer
            .as_ref()
            .map(|fb| vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: vk::Extent2D {
                    width: fb.width,
                    height: fb.height,
                },
            })
            .unwrap_or_default();
        Some(ActivePass {
            pass: render_pass,
            framebuffer: pass.framebuffer.clone(),
            subpass: pass.subpass,
            render_area,
            clear_values: Vec::new(),
            owned: false,
        })
    }

    /// Whether this buffer could be submitted now, without claiming it.
    pub fn check_submit(&self) -> Result<(), CommandError> {
        if self.level == CommandBufferLevel::Secondary {
            return Err(CommandError::InvalidSecondary {
                handle: self.handle,
                reason: "secondary buffers run through execute_commands".into(),
            });
        }
        if self.is_one_time()
            && self.state == CommandBufferState::Executable
            && !self.pool_was_reset()
            && self.submitted.load(Ordering::Acquire)
        {
            return Err(CommandError::AlreadySubmitted);
        }
        match self.state() {
            CommandBufferState::Executable => Ok(()),
            other => Err(CommandError::NotExecutable(other)),
        }
    }

    /// Claim this buffer for one submission.
    pub fn acquire_for_submit(&self) -> Result<(), CommandError> {
        self.check_submit()?;
        if self.is_one_time() && self.submitted.swap(true, Ordering::AcqRel) {
            return Err(CommandError::AlreadySubmitted);
        }
        Ok(())
    }

    /// Undo a claim whose submission never ran.
    pub fn release_submit(&self) {
        if self.is_one_time() {
            self.submitted.store(false, Ordering::Release);
        }
    }

    /// Splice finalised secondaries into this primary, in order.
    pub fn execute_commands(&mut self, secondaries: &[&CommandBuffer]) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if self.level != CommandBufferLevel::Primary {
            return Err(CommandError::InvalidArgument(
                "execute_commands needs a primary command buffer".into(),
            ));
        }
        for secondary in secondaries {
            if secondary.level != CommandBufferLevel::Secondary {
                return Err(CommandError::InvalidSecondary {
                    handle: secondary.handle,
                    reason: "not a secondary command buffer".into(),
                });
            }
            if secondary.state() != CommandBufferState::Executable {
                return Err(CommandError::InvalidSecondary {
                    handle: secondary.handle,
                    reason: format!("state is {:?}", secondary.state()),
                });
            }
        }

        for secondary in secondaries {
            self.main.push(secondary.stream.clone());
            self.after.push(secondary.after_stream.clone());
            self.resources.union(&secondary.resources);
            debug!(
                primary = self.handle.id,
                secondary = secondary.handle.id,
                words = secondary.stream.len(),
                "secondary spliced"
            );
        }

        // The secondaries left program, geometry and fixed state unknown
        if !secondaries.is_empty() {
            self.rec.active = None;
            self.rec.geometry_dirty = true;
            self.rec.bound_geometry = None;
        }
        Ok(())
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("handle", &self.handle)
            .field("level", &self.level)
            .field("state", &self.state())
            .field("words", &self.stream.len())
            .finish()
    }
}
