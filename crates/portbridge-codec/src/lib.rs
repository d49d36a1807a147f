//! Streaming JSON and base64 codecs for native messaging payloads.
//!
//! Everything in this crate parses in place: a [`Cursor`] walks a borrowed
//! byte span and callbacks receive sub-slices of it. No value tree is ever
//! built, so a message is decoded with bounded memory regardless of how
//! long its arrays or strings are. Binary data rides inside JSON strings as
//! base64; [`base64`] provides the matching bounded encoder and the
//! character-at-a-time decoder the string callbacks feed.

pub mod base64;
pub mod cursor;
pub mod error;
pub mod json;

pub use base64::Base64Decoder;
pub use cursor::Cursor;
pub use error::{CodecError, Result};
pub use json::JsonValue;
