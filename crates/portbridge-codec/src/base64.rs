//! Base64 with the standard alphabet, shaped for the bridge wire format:
//! encoding appends to a bounded reply buffer, decoding consumes the byte
//! stream a JSON string callback delivers.

use bytes::{BufMut, BytesMut};

use crate::error::{CodecError, Result};

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Append the base64 encoding of `data` to `dst`, refusing to grow past
/// `limit`.
///
/// The check is per 4-character group, so on failure `dst` may already
/// hold a prefix of the encoding; the caller decides whether to send or
/// discard the truncated reply.
pub fn encode_append(data: &[u8], dst: &mut BytesMut, limit: usize) -> Result<()> {
    let mut chunks = data.chunks_exact(3);
    for chunk in &mut chunks {
        if dst.len() + 4 > limit {
            return Err(CodecError::DestinationFull { limit });
        }
        let bits = (u32::from(chunk[0]) << 16) | (u32::from(chunk[1]) << 8) | u32::from(chunk[2]);
        dst.put_u8(ALPHABET[(bits >> 18) as usize]);
        dst.put_u8(ALPHABET[(bits >> 12) as usize & 0x3f]);
        dst.put_u8(ALPHABET[(bits >> 6) as usize & 0x3f]);
        dst.put_u8(ALPHABET[bits as usize & 0x3f]);
    }
    let tail = chunks.remainder();
    if !tail.is_empty() && dst.len() + 4 > limit {
        return Err(CodecError::DestinationFull { limit });
    }
    match tail {
        [a, b] => {
            let bits = (u32::from(*a) << 8) | u32::from(*b);
            dst.put_u8(ALPHABET[(bits >> 10) as usize]);
            dst.put_u8(ALPHABET[(bits >> 4) as usize & 0x3f]);
            dst.put_u8(ALPHABET[(bits << 2) as usize & 0x3f]);
            dst.put_u8(b'=');
        }
        [a] => {
            dst.put_u8(ALPHABET[(a >> 2) as usize]);
            dst.put_u8(ALPHABET[((a << 4) & 0x3f) as usize]);
            dst.put_u8(b'=');
            dst.put_u8(b'=');
        }
        _ => {}
    }
    Ok(())
}

/// Streaming base64 decoder fed one input character at a time.
///
/// Characters outside the alphabet (`=` padding included) are silently
/// ignored, so the JSON string callback can forward its blocks without
/// pre-filtering. State lives for one logical string argument: create a
/// fresh decoder per argument.
#[derive(Debug, Default)]
pub struct Base64Decoder {
    carry_value: u16,
    carry_bits: u8,
}

impl Base64Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one character; returns a decoded byte once ≥8 bits are
    /// buffered.
    pub fn push(&mut self, byte: u8) -> Option<u8> {
        let value = match byte {
            b'A'..=b'Z' => byte - b'A',
            b'a'..=b'z' => byte - b'a' + 26,
            b'0'..=b'9' => byte - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            _ => return None,
        };
        self.carry_value = (self.carry_value << 6) | u16::from(value);
        self.carry_bits += 6;
        if self.carry_bits >= 8 {
            self.carry_bits -= 8;
            Some((self.carry_value >> self.carry_bits) as u8)
        } else {
            None
        }
    }
}
