//! Replays recorded command streams on a GL context.
//!
//! A [`Queue`] takes finished command buffers, applies pending memory
//! uploads and geometry-cache maintenance, then walks the stream issuing one
//! backend call sequence per record. [`CallLog`] is an in-memory backend;
//! the `glow` feature adds [`GlowBackend`] for a real context.

pub mod backend;
pub mod call_log;
pub mod context;
pub mod engine;
pub mod error;
#[cfg(feature = "glow")]
pub mod glow_backend;
pub mod queue;

pub use backend::{GlBackend, TextureRegion};
pub use call_log::{CallLog, GlCall};
pub use context::{ContextLock, GlContext};
pub use engine::{ReplayEngine, ReplayStats};
pub use error::{BackendError, ReplayError};
#[cfg(feature = "glow")]
pub use glow_backend::GlowBackend;
pub use queue::Queue;
