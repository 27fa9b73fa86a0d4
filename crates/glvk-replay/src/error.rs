use glvk_command::CommandError;
use glvk_core::CoreError;
use glvk_protocol::DecodeError;

/// Failures reported by a [`GlBackend`](crate::GlBackend).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("failed to create {kind}: {message}")]
    Creation { kind: &'static str, message: String },

    #[error("program link failed: {0}")]
    Link(String),

    #[error("unknown GL {kind} {name}")]
    UnknownObject { kind: &'static str, name: u32 },

    #[error("range {offset}+{size} of buffer {buffer} is out of bounds")]
    OutOfBounds { buffer: u32, offset: u64, size: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("invalid command stream: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("geometry buffer {0} is not referenced by the command buffer")]
    UnknownGeometry(u64),

    #[error("event {0} is not referenced by the command buffer")]
    UnknownEvent(u64),

    #[error("memory {0} is not referenced by the command buffer")]
    UnknownMemory(u64),

    #[error("invalid {kind} operand: {message}")]
    InvalidOperand { kind: &'static str, message: String },
}

impl From<BackendError> for CoreError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Link(log) => CoreError::ShaderCompilation(log),
            other => CoreError::ObjectCreation(other.to_string()),
        }
    }
}
