use crate::error::{CodecError, Result};

/// A read-only position into a byte span.
///
/// Parsing functions advance the position on success. On failure the
/// position is unspecified; callers must not assume it was left where it
/// started.
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the span.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// The byte at the current position, if any.
    pub fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    /// Advance past the current byte.
    pub fn bump(&mut self) {
        if self.pos < self.buf.len() {
            self.pos += 1;
        }
    }

    /// Consume and return the current byte.
    pub fn take(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Consume `byte` or fail.
    pub fn expect(&mut self, byte: u8) -> Result<()> {
        match self.peek() {
            Some(b) if b == byte => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(CodecError::UnexpectedByte {
                byte: b,
                offset: self.pos,
            }),
            None => Err(CodecError::UnexpectedEnd(self.pos)),
        }
    }

    /// Unconsumed remainder of the span.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.buf[start..end]
    }
}
