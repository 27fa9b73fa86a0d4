pub mod barrier;
pub mod buffer;
pub mod descriptors;
pub mod draw;
pub mod error;
pub mod pool;
mod push;
pub mod query;
pub mod render_pass;
pub mod transfer;

pub use barrier::AccessBarrier;
pub use buffer::{BeginInfo, CommandBuffer, CommandBufferLevel, CommandBufferState, InheritanceInfo};
pub use error::CommandError;
pub use pool::CommandPool;
pub use render_pass::{ClearValue, RenderPassBegin};
pub use transfer::{BufferCopy, BufferImageCopy, ImageCopy};
