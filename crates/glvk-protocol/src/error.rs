use crate::records::OpKind;

/// Errors raised while walking an encoded stream.
///
/// Offsets are word offsets of the offending header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("truncated header at word {offset}: {remaining} word(s) left")]
    TruncatedHeader { offset: usize, remaining: usize },

    #[error("unknown op kind {raw:#x} at word {offset}")]
    UnknownKind { offset: usize, raw: u32 },

    #[error("{kind:?} at word {offset} declares {declared} words, expected {expected}")]
    SizeMismatch {
        offset: usize,
        kind: OpKind,
        declared: u32,
        expected: u32,
    },

    #[error("truncated {kind:?} at word {offset}: needs {declared} words, {remaining} left")]
    TruncatedRecord {
        offset: usize,
        kind: OpKind,
        declared: u32,
        remaining: usize,
    },

    #[error("expected {expected:?} at word {offset}, found {found:?}")]
    KindMismatch {
        offset: usize,
        expected: OpKind,
        found: OpKind,
    },

    #[error("payload of {kind:?} at word {offset} could not be read: {reason}")]
    Payload {
        offset: usize,
        kind: OpKind,
        reason: String,
    },
}
