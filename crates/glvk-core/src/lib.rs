pub mod binding;
pub mod config;
pub mod convert;
pub mod descriptor;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod format;
pub mod geometry;
pub mod handle;
pub mod memory;
pub mod objects;
pub mod pipeline;
pub mod reflect;
pub mod renderpass;
pub mod resource;
pub mod table;

pub use config::GlvkConfig;
pub use device::Device;
pub use error::CoreError;
pub use handle::{Handle, ResourceKind};
pub use table::ResourceTable;
