//! Unsolicited device-to-host notifications.
//!
//! Unlike replies these carry no token; the controlling process matches
//! them on the leading `serialRecv`/`serialError` tag.

use portbridge_frame::OutboundAssembly;
use tracing::warn;

/// Build and emit a `["serialRecv", path, base64]` notification.
///
/// If the encoded payload would exceed the reply limit the message goes
/// out truncated rather than not at all; the receiving side treats the
/// stream as lossy anyway.
pub fn serial_recv<S>(out: &mut OutboundAssembly, path: &str, data: &[u8], sink: &mut S)
where
    S: FnMut(&[u8]) + ?Sized,
{
    out.begin();
    out.append_str("[\"serialRecv\",\"");
    out.append_str(path);
    out.append_str("\",\"");
    if let Err(err) = out.append_base64(data) {
        warn!(path, error = %err, "device payload truncated");
    }
    out.append_str("\"]");
    out.finalize(sink);
}

/// Build and emit a `["serialError", path, message]` notification.
pub fn serial_error<S>(out: &mut OutboundAssembly, path: &str, message: &str, sink: &mut S)
where
    S: FnMut(&[u8]) + ?Sized,
{
    out.begin();
    out.append_str("[\"serialError\",\"");
    out.append_str(path);
    out.append_str("\",\"");
    append_escaped(out, message);
    out.append_str("\"]");
    out.finalize(sink);
}

/// OS error strings occasionally contain quotes; escape just enough to
/// keep the notification well formed.
fn append_escaped(out: &mut OutboundAssembly, text: &str) {
    for &b in text.as_bytes() {
        match b {
            b'"' => out.append_str("\\\""),
            b'\\' => out.append_str("\\\\"),
            _ => out.append(&[b]),
        }
    }
}
