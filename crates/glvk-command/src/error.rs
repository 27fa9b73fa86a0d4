use glvk_core::{CoreError, Handle};

use crate::buffer::CommandBufferState;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command buffer is {0:?}, not recording")]
    NotRecording(CommandBufferState),

    #[error("command buffer is already recording")]
    AlreadyRecording,

    #[error("command buffer is {0:?}, not executable")]
    NotExecutable(CommandBufferState),

    #[error("one-time-submit command buffer was already submitted")]
    AlreadySubmitted,

    #[error("no {0} pipeline bound")]
    NoPipeline(&'static str),

    #[error("a render pass is still active")]
    RenderPassActive,

    #[error("no render pass is active")]
    NoRenderPass,

    #[error("render pass has no subpass after {0}")]
    NoMoreSubpasses(u32),

    #[error("framebuffer {framebuffer:?} is not compatible with render pass {render_pass:?}")]
    IncompatibleFramebuffer {
        framebuffer: Handle,
        render_pass: Handle,
    },

    #[error("render pass needs {expected} clear values, got {got}")]
    ClearValueCount { expected: usize, got: usize },

    #[error("{expected} dynamic offsets required, got {got}")]
    DynamicOffsetCount { expected: usize, got: usize },

    #[error("no index buffer bound")]
    NoIndexBuffer,

    #[error("secondary command buffer {handle:?} cannot be executed: {reason}")]
    InvalidSecondary { handle: Handle, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}
