//! Flat word streams: encoding into [`CmdBuffer`], ordered accumulation in
//! [`CmdList`], and bounds-checked sequential decoding with [`Decoder`].

use crate::error::DecodeError;
use crate::op::{Op, HEADER_WORDS};
use crate::records::{Command, OpKind, Record};

/// An owned, contiguous sequence of encoded records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CmdBuffer {
    words: Vec<u32>,
}

impl CmdBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(words: usize) -> Self {
        Self {
            words: Vec::with_capacity(words),
        }
    }

    /// Wrap raw words. Nothing is checked until the buffer is decoded.
    pub fn from_words(words: Vec<u32>) -> Self {
        Self { words }
    }

    /// Encode one record: exactly `R::WORDS` words are appended.
    pub fn push<R: Record>(&mut self, record: R) {
        self.push_raw(R::KIND, bytemuck::bytes_of(&record));
    }

    /// Encode an already-decoded command.
    pub fn push_command(&mut self, command: &Command) {
        self.push_raw(command.kind(), command.payload());
    }

    fn push_raw(&mut self, kind: OpKind, payload: &[u8]) {
        let op = Op::new(kind);
        debug_assert_eq!(op.payload_words() as usize * 4, payload.len());

        self.words.reserve(op.size as usize);
        self.words.extend_from_slice(&op.to_words());
        self.words.extend(
            payload
                .chunks_exact(4)
                .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]])),
        );
    }

    pub fn append(&mut self, other: &CmdBuffer) {
        self.words.extend_from_slice(&other.words);
    }

    /// Concatenate buffers in order into one buffer of exactly their summed length.
    pub fn concat<'a, I>(parts: I) -> CmdBuffer
    where
        I: IntoIterator<Item = &'a CmdBuffer>,
    {
        let parts: Vec<&CmdBuffer> = parts.into_iter().collect();
        let total = parts.iter().map(|p| p.len()).sum();
        let mut out = CmdBuffer::with_capacity(total);
        for part in parts {
            out.append(part);
        }
        out
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn into_words(self) -> Vec<u32> {
        self.words
    }

    /// Length in words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn decoder(&self) -> Decoder<'_> {
        Decoder::new(&self.words)
    }

    /// Walk the whole stream without executing it. Returns the record count.
    pub fn validate(&self) -> Result<usize, DecodeError> {
        let mut decoder = self.decoder();
        let mut count = 0;
        while decoder.skip_record()?.is_some() {
            count += 1;
        }
        Ok(count)
    }
}

/// Ordered sequence of [`CmdBuffer`]s. Insertion order is execution order.
#[derive(Debug, Clone, Default)]
pub struct CmdList {
    buffers: Vec<CmdBuffer>,
}

impl CmdList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a buffer. Empty buffers are dropped since they replay to nothing.
    pub fn push(&mut self, buffer: CmdBuffer) {
        if !buffer.is_empty() {
            self.buffers.push(buffer);
        }
    }

    /// Encode a single record as its own buffer.
    pub fn push_record<R: Record>(&mut self, record: R) {
        let mut buffer = CmdBuffer::with_capacity(R::WORDS as usize);
        buffer.push(record);
        self.buffers.push(buffer);
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn total_words(&self) -> usize {
        self.buffers.iter().map(CmdBuffer::len).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CmdBuffer> {
        self.buffers.iter()
    }

    pub fn clear(&mut self) {
        self.buffers.clear();
    }

    /// Concatenate every buffer, in order, into one exact-size buffer.
    pub fn flatten(&self) -> CmdBuffer {
        CmdBuffer::concat(&self.buffers)
    }
}

/// Sequential cursor over an encoded stream.
///
/// Every header is validated against the remaining capacity before any
/// payload byte is read, so decoding never reaches past the end of the
/// slice. After the first error the decoder is fused and yields nothing.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    words: &'a [u32],
    pos: usize,
    fused: bool,
}

impl<'a> Decoder<'a> {
    pub fn new(words: &'a [u32]) -> Self {
        Self {
            words,
            pos: 0,
            fused: false,
        }
    }

    /// Current word offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.words.len() - self.pos
    }

    pub fn is_finished(&self) -> bool {
        self.fused || self.remaining() == 0
    }

    /// Decode the next header without consuming it.
    ///
    /// `Ok(None)` means no more records.
    pub fn peek_header(&self) -> Result<Option<Op>, DecodeError> {
        if self.fused {
            return Ok(None);
        }
        let rest = &self.words[self.pos..];
        if rest.is_empty() {
            return Ok(None);
        }
        if rest.len() < HEADER_WORDS as usize {
            return Err(DecodeError::TruncatedHeader {
                offset: self.pos,
                remaining: rest.len(),
            });
        }

        let kind = OpKind::from_raw(rest[0]).ok_or(DecodeError::UnknownKind {
            offset: self.pos,
            raw: rest[0],
        })?;
        let declared = rest[1];
        let expected = kind.words();
        if declared != expected {
            return Err(DecodeError::SizeMismatch {
                offset: self.pos,
                kind,
                declared,
                expected,
            });
        }
        if declared as usize > rest.len() {
            return Err(DecodeError::TruncatedRecord {
                offset: self.pos,
                kind,
                declared,
                remaining: rest.len(),
            });
        }

        Ok(Some(Op {
            kind,
            size: declared,
        }))
    }

    fn checked_header(&mut self) -> Result<Option<Op>, DecodeError> {
        self.peek_header().inspect_err(|_| self.fused = true)
    }

    fn payload(&self, op: Op) -> &'a [u8] {
        let start = self.pos + HEADER_WORDS as usize;
        let end = self.pos + op.size as usize;
        let words: &'a [u32] = self.words;
        bytemuck::cast_slice(&words[start..end])
    }

    /// Decode the next record into a [`Command`].
    pub fn next_command(&mut self) -> Result<Option<Command>, DecodeError> {
        let Some(op) = self.checked_header()? else {
            return Ok(None);
        };
        let command = Command::from_payload(op.kind, self.payload(op)).map_err(|e| {
            self.fused = true;
            DecodeError::Payload {
                offset: self.pos,
                kind: op.kind,
                reason: format!("{:?}", e),
            }
        })?;
        self.pos += op.size as usize;
        Ok(Some(command))
    }

    /// Decode the next record as `R`. A different kind at the cursor is an
    /// error and leaves the cursor where it was.
    pub fn decode_record<R: Record>(&mut self) -> Result<Option<R>, DecodeError> {
        let Some(op) = self.checked_header()? else {
            return Ok(None);
        };
        if op.kind != R::KIND {
            return Err(DecodeError::KindMismatch {
                offset: self.pos,
                expected: R::KIND,
                found: op.kind,
            });
        }
        let record = bytemuck::try_pod_read_unaligned::<R>(self.payload(op)).map_err(|e| {
            self.fused = true;
            DecodeError::Payload {
                offset: self.pos,
                kind: op.kind,
                reason: format!("{:?}", e),
            }
        })?;
        self.pos += op.size as usize;
        Ok(Some(record))
    }

    /// Advance past the next record without decoding its payload.
    pub fn skip_record(&mut self) -> Result<Option<Op>, DecodeError> {
        let Some(op) = self.checked_header()? else {
            return Ok(None);
        };
        self.pos += op.size as usize;
        Ok(Some(op))
    }
}

impl Iterator for Decoder<'_> {
    type Item = Result<Command, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_command().transpose()
    }
}
