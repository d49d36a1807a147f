use bytes::{BufMut, BytesMut};
use portbridge_codec::base64;

use crate::error::{FrameError, Result};
use crate::HEADER_SIZE;

/// Soft limit on a single outbound message.
pub const DEFAULT_REPLY_LIMIT: usize = 16 * 1024;

/// The shared outbound message buffer.
///
/// The first 4 bytes are reserved for the length header; writers append
/// after them. [`OutboundAssembly::finalize`] patches the header with the
/// payload length in native byte order, hands the whole buffer to the
/// sink and resets for the next message. Owned by exactly one dispatch at
/// a time; there is no internal locking.
pub struct OutboundAssembly {
    buf: BytesMut,
    limit: usize,
}

impl Default for OutboundAssembly {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundAssembly {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_REPLY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        assert!(limit > HEADER_SIZE);
        let mut buf = BytesMut::with_capacity(limit.min(DEFAULT_REPLY_LIMIT));
        buf.put_bytes(0, HEADER_SIZE);
        Self { buf, limit }
    }

    /// Discard any partial content and start a new message.
    pub fn begin(&mut self) {
        self.buf.clear();
        self.buf.put_bytes(0, HEADER_SIZE);
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    pub fn append_str(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
    }

    /// Append `data` encoded as base64, bounded by the reply limit.
    ///
    /// On overflow the buffer may already hold a prefix of the encoding;
    /// the caller chooses between sending the truncated message and
    /// starting over with [`Self::begin`].
    pub fn append_base64(&mut self, data: &[u8]) -> Result<()> {
        base64::encode_append(data, &mut self.buf, self.limit)
            .map_err(|_| FrameError::ReplyOverflow { limit: self.limit })
    }

    /// Payload written so far (header excluded).
    pub fn payload(&self) -> &[u8] {
        &self.buf[HEADER_SIZE..]
    }

    pub fn payload_len(&self) -> usize {
        self.buf.len() - HEADER_SIZE
    }

    /// Patch the length header, hand the framed message to `sink`, and
    /// reset for the next message.
    pub fn finalize<S>(&mut self, sink: &mut S)
    where
        S: FnMut(&[u8]) + ?Sized,
    {
        let len = (self.buf.len() - HEADER_SIZE) as u32;
        self.buf[..HEADER_SIZE].copy_from_slice(&len.to_ne_bytes());
        sink(&self.buf);
        self.begin();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finalize_to_vec(out: &mut OutboundAssembly) -> Vec<u8> {
        let mut wire = Vec::new();
        out.finalize(&mut |bytes: &[u8]| wire.extend_from_slice(bytes));
        wire
    }

    #[test]
    fn header_is_patched_with_payload_length() {
        let mut out = OutboundAssembly::new();
        out.append_str("[\"@\",\"1\",[\"0.1\"]]");
        let wire = finalize_to_vec(&mut out);
        let declared = u32::from_ne_bytes(wire[..4].try_into().unwrap());
        assert_eq!(declared as usize, wire.len() - 4);
        assert_eq!(&wire[4..], b"[\"@\",\"1\",[\"0.1\"]]");
    }

    #[test]
    fn buffer_resets_between_messages() {
        let mut out = OutboundAssembly::new();
        out.append_str("first");
        let _ = finalize_to_vec(&mut out);

        out.append_str("2");
        let wire = finalize_to_vec(&mut out);
        assert_eq!(&wire[4..], b"2");
        assert_eq!(u32::from_ne_bytes(wire[..4].try_into().unwrap()), 1);
    }

    #[test]
    fn begin_discards_partial_reply() {
        let mut out = OutboundAssembly::new();
        out.append_str("garbage");
        out.begin();
        assert_eq!(out.payload_len(), 0);
    }

    #[test]
    fn base64_append_respects_limit() {
        let mut out = OutboundAssembly::with_limit(12);
        out.append_str("\"");
        let err = out.append_base64(&[0u8; 300]).unwrap_err();
        assert!(matches!(err, FrameError::ReplyOverflow { limit: 12 }));
    }

    #[test]
    fn base64_append_roundtrips() {
        let mut out = OutboundAssembly::new();
        out.append_base64(b"hi").unwrap();
        assert_eq!(out.payload(), b"aGk=");
    }
}
