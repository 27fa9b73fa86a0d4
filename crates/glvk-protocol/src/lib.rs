pub mod error;
pub mod gl;
pub mod op;
pub mod records;
pub mod stream;

pub use error::DecodeError;
pub use op::{Op, HEADER_WORDS};
pub use records::{Command, OpKind, Record, UniformType};
pub use stream::{CmdBuffer, CmdList, Decoder};
