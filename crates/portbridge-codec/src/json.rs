//! Pull-style JSON decoding over a [`Cursor`].
//!
//! The grammar is the deliberately narrow subset the bridge protocol uses:
//! base-10 integers (no floats, no exponents), strings with a
//! single-character escape table (no `\u` escapes), arrays and objects
//! driven by caller callbacks. Whitespace is spaces and tabs only.

use crate::cursor::Cursor;
use crate::error::{CodecError, Result};

/// Classification of the next JSON value.
///
/// `String`, `Array` and `Object` are classified without consuming any of
/// their content; the cursor stays on the opening delimiter and the caller
/// descends with [`parse_string`], [`iterate_array`] or [`iterate_object`].
/// Scalars are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonValue {
    Null,
    Boolean(bool),
    Integer(i64),
    String,
    Array,
    Object,
}

/// Consume spaces and tabs. Newlines are not whitespace here; the framing
/// layer never produces them between tokens.
pub fn skip_whitespace(cur: &mut Cursor) {
    while let Some(b' ' | b'\t') = cur.peek() {
        cur.bump();
    }
}

/// Consume optional whitespace, a `,`, and optional trailing whitespace.
pub fn skip_comma(cur: &mut Cursor) -> Result<()> {
    skip_whitespace(cur);
    cur.expect(b',')?;
    skip_whitespace(cur);
    Ok(())
}

/// Parse a `"`-delimited string, delivering decoded content to `sink`.
///
/// Literal runs between escapes are delivered as one block each, so a
/// single logical string may reach the sink in several pieces. Escapes
/// `\b \f \n \r \t` decode to their control character; any other escaped
/// byte passes through literally (which also covers `\"` and `\\`).
/// Fails if the sink rejects a block or the string is unterminated.
pub fn parse_string<F>(cur: &mut Cursor, mut sink: F) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    cur.expect(b'"')?;
    loop {
        let start = cur.pos();
        while let Some(b) = cur.peek() {
            if b == b'"' || b == b'\\' {
                break;
            }
            cur.bump();
        }
        sink(cur.slice(start, cur.pos()))?;
        match cur.peek() {
            None => return Err(CodecError::UnexpectedEnd(cur.pos())),
            Some(b'"') => {
                cur.bump();
                return Ok(());
            }
            Some(_) => {
                cur.bump(); // backslash
                let offset = cur.pos();
                let esc = cur.take().ok_or(CodecError::UnexpectedEnd(offset))?;
                let decoded: &[u8] = match esc {
                    b'b' => b"\x08",
                    b'f' => b"\x0c",
                    b'n' => b"\n",
                    b'r' => b"\r",
                    b't' => b"\t",
                    _ => cur.slice(offset, offset + 1),
                };
                sink(decoded)?;
            }
        }
    }
}

/// Parse a string into a fixed-capacity buffer; returns the decoded length.
pub fn parse_string_into(cur: &mut Cursor, buf: &mut [u8]) -> Result<usize> {
    let mut len = 0usize;
    let capacity = buf.len();
    parse_string(cur, |block| {
        if len + block.len() > capacity {
            return Err(CodecError::KeyTooLong(capacity));
        }
        buf[len..len + block.len()].copy_from_slice(block);
        len += block.len();
        Ok(())
    })?;
    Ok(len)
}

/// Parse a base-10 integer with an optional leading `-`.
pub fn parse_integer(cur: &mut Cursor) -> Result<i64> {
    let negative = cur.peek() == Some(b'-');
    if negative {
        cur.bump();
    }
    let mut value: i64 = 0;
    let mut digits = 0usize;
    while let Some(b @ b'0'..=b'9') = cur.peek() {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
        digits += 1;
        cur.bump();
    }
    if digits == 0 {
        return Err(CodecError::ExpectedDigit(cur.pos()));
    }
    Ok(if negative { -value } else { value })
}

fn expect_token(cur: &mut Cursor, token: &[u8]) -> Result<()> {
    for &b in token {
        cur.expect(b)?;
    }
    Ok(())
}

/// Classify the next significant byte without descending into composites.
pub fn parse_value_tag(cur: &mut Cursor) -> Result<JsonValue> {
    skip_whitespace(cur);
    match cur.peek() {
        None => Err(CodecError::UnexpectedEnd(cur.pos())),
        Some(b'"') => Ok(JsonValue::String),
        Some(b'[') => Ok(JsonValue::Array),
        Some(b'{') => Ok(JsonValue::Object),
        Some(b't') => {
            expect_token(cur, b"true")?;
            Ok(JsonValue::Boolean(true))
        }
        Some(b'f') => {
            expect_token(cur, b"false")?;
            Ok(JsonValue::Boolean(false))
        }
        Some(b'n') => {
            expect_token(cur, b"null")?;
            Ok(JsonValue::Null)
        }
        Some(b'0'..=b'9' | b'-') => Ok(JsonValue::Integer(parse_integer(cur)?)),
        Some(byte) => Err(CodecError::UnexpectedByte {
            byte,
            offset: cur.pos(),
        }),
    }
}

/// Consume one scalar or string value without keeping it.
///
/// Arrays and objects are not skippable; the protocol never nests them in
/// positions where a value is ignored.
pub fn skip_value(cur: &mut Cursor) -> Result<()> {
    match parse_value_tag(cur)? {
        JsonValue::String => parse_string(cur, |_| Ok(())),
        JsonValue::Array | JsonValue::Object => Err(CodecError::UnexpectedByte {
            byte: cur.peek().unwrap_or(0),
            offset: cur.pos(),
        }),
        _ => Ok(()),
    }
}

/// Iterate a JSON array, invoking `element` once per element.
///
/// `element` must parse the value and leave the cursor just past it. The
/// closing `]` is consumed on success.
pub fn iterate_array<F>(cur: &mut Cursor, mut element: F) -> Result<()>
where
    F: FnMut(&mut Cursor) -> Result<()>,
{
    cur.expect(b'[')?;
    skip_whitespace(cur);
    if cur.peek() == Some(b']') {
        cur.bump();
        return Ok(());
    }
    element(cur)?;
    loop {
        skip_whitespace(cur);
        match cur.take() {
            Some(b']') => return Ok(()),
            Some(b',') => {
                skip_whitespace(cur);
                element(cur)?;
            }
            Some(byte) => {
                return Err(CodecError::UnexpectedByte {
                    byte,
                    offset: cur.pos() - 1,
                })
            }
            None => return Err(CodecError::UnexpectedEnd(cur.pos())),
        }
    }
}

/// Iterate a JSON object, invoking `pair` with each key.
///
/// Keys are decoded into `key_buf`; a key that does not fit fails the
/// whole iteration. `pair` must parse the value and leave the cursor just
/// past it. The closing `}` is consumed on success.
pub fn iterate_object<F>(cur: &mut Cursor, key_buf: &mut [u8], mut pair: F) -> Result<()>
where
    F: FnMut(&mut Cursor, &str) -> Result<()>,
{
    cur.expect(b'{')?;
    skip_whitespace(cur);
    if cur.peek() == Some(b'}') {
        cur.bump();
        return Ok(());
    }
    loop {
        skip_whitespace(cur);
        let key_len = parse_string_into(cur, key_buf)?;
        let key = std::str::from_utf8(&key_buf[..key_len]).map_err(|_| CodecError::KeyNotUtf8)?;
        skip_whitespace(cur);
        cur.expect(b':')?;
        skip_whitespace(cur);
        pair(cur, key)?;
        skip_whitespace(cur);
        match cur.take() {
            Some(b'}') => return Ok(()),
            Some(b',') => continue,
            Some(byte) => {
                return Err(CodecError::UnexpectedByte {
                    byte,
                    offset: cur.pos() - 1,
                })
            }
            None => return Err(CodecError::UnexpectedEnd(cur.pos())),
        }
    }
}
