use crate::handle::Handle;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("handle not found: {0:?}")]
    HandleNotFound(Handle),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("memory {memory:?} is already locked")]
    AlreadyLocked { memory: Handle },

    #[error("range {offset}+{size} exceeds {limit} bytes")]
    OutOfRange { offset: u64, size: u64, limit: u64 },

    #[error("memory {0:?} is not host visible")]
    NotHostVisible(Handle),

    #[error("{0:?} is already bound to memory")]
    AlreadyBound(Handle),

    #[error("missing binding for {name} (set={set}, binding={binding})")]
    MissingBinding { name: String, set: u32, binding: u32 },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid descriptor write: {0}")]
    InvalidDescriptor(String),

    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    #[error("invalid render pass: {0}")]
    InvalidRenderPass(String),

    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    #[error("GL object creation failed: {0}")]
    ObjectCreation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
