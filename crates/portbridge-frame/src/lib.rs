//! Length-prefixed message framing for the native messaging streams.
//!
//! Every message on the wire is a 4-byte unsigned length in native machine
//! order followed by that many bytes of UTF-8 JSON. The peer is the
//! browser on the same machine, not a network host, so there is no magic,
//! no versioning and no network byte order.
//!
//! [`InboundAssembly`] turns arbitrarily chunked input into complete
//! payloads; [`OutboundAssembly`] is the shared reply buffer whose header
//! is patched at finalize time.

pub mod error;
pub mod inbound;
pub mod outbound;

pub use error::{FrameError, Result};
pub use inbound::InboundAssembly;
pub use outbound::OutboundAssembly;

/// Frame header: 4-byte unsigned payload length, native byte order.
pub const HEADER_SIZE: usize = 4;
