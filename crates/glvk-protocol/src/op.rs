use serde::Serialize;

use crate::records::OpKind;

/// Header size in words: kind(1) + size(1) = 2.
pub const HEADER_WORDS: u32 = 2;

/// The `(kind, size)` header that precedes every encoded record.
///
/// `size` is the record's total footprint in words, header included, and is
/// always `kind.words()` for a well-formed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Op {
    pub kind: OpKind,
    pub size: u32,
}

impl Op {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            size: kind.words(),
        }
    }

    /// Payload length in words (everything after the header).
    pub fn payload_words(&self) -> u32 {
        self.size.saturating_sub(HEADER_WORDS)
    }

    pub fn to_words(self) -> [u32; HEADER_WORDS as usize] {
        [self.kind.as_raw(), self.size]
    }
}
