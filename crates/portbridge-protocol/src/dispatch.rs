//! Envelope parsing and the command table.

use portbridge_codec::json::{
    iterate_object, parse_string, parse_string_into, skip_comma, skip_whitespace,
};
use portbridge_codec::{Base64Decoder, Cursor};
use portbridge_frame::OutboundAssembly;
use tracing::{debug, warn};

use crate::driver::SerialDriver;
use crate::error::Result;
use crate::options::SerialOptions;

/// Reply sentinels: bare digit characters, not JSON booleans. The
/// controlling extension matches on these literally.
const OK: &str = "1";
const FAIL: &str = "0";

const VERSION_REPLY: &str = "[\"0.1\"]";

const TOKEN_CAPACITY: usize = 24;
const COMMAND_CAPACITY: usize = 24;
const KEY_CAPACITY: usize = 24;
const PATH_CAPACITY: usize = 64;

/// Decoded bytes are written to the device in batches of this size.
const SEND_CHUNK: usize = 16;

struct HandlerCtx<'a> {
    out: &'a mut OutboundAssembly,
    driver: &'a mut dyn SerialDriver,
    open_paths: &'a mut Vec<String>,
}

type Handler = fn(&mut Cursor<'_>, &mut HandlerCtx<'_>);

/// Registration order is fixed at build time; lookup is an exact,
/// case-sensitive match and the first hit wins.
static COMMANDS: &[(&str, Handler)] = &[
    ("version", version),
    ("serial_list", serial_list),
    ("serial_open_raw", serial_open_raw),
    ("serial_close", serial_close),
    ("serial_send_raw", serial_send_raw),
];

/// Parses request envelopes and routes commands to handlers.
///
/// Also the bookkeeper for which device paths are currently open: close
/// and send against an unopened path fail without ever reaching the
/// driver, and a second open of the same path is refused.
#[derive(Default)]
pub struct Dispatcher {
    open_paths: Vec<String>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently held open.
    pub fn open_paths(&self) -> &[String] {
        &self.open_paths
    }

    /// Handle one complete request frame.
    ///
    /// Returns `Ok(true)` when a reply was assembled into `out` and wants
    /// finalizing, `Ok(false)` when the command is unknown (silently
    /// dropped, per protocol), and `Err` when the envelope itself is
    /// malformed (logged by the caller, no reply either way).
    pub fn handle(
        &mut self,
        frame: &[u8],
        out: &mut OutboundAssembly,
        driver: &mut dyn SerialDriver,
    ) -> Result<bool> {
        let mut cur = Cursor::new(frame);
        skip_whitespace(&mut cur);
        cur.expect(b'[')?;
        skip_whitespace(&mut cur);

        let mut token_buf = [0u8; TOKEN_CAPACITY];
        let token_len = parse_string_into(&mut cur, &mut token_buf)?;
        skip_comma(&mut cur)?;
        cur.expect(b'[')?;
        skip_whitespace(&mut cur);

        let mut command_buf = [0u8; COMMAND_CAPACITY];
        let command_len = parse_string_into(&mut cur, &mut command_buf)?;
        let command = &command_buf[..command_len];

        let Some((name, handler)) = COMMANDS
            .iter()
            .find(|(name, _)| name.as_bytes() == command)
        else {
            debug!(
                command = %String::from_utf8_lossy(command),
                "ignoring unknown command"
            );
            return Ok(false);
        };
        debug!(command = name, "dispatching");

        out.begin();
        out.append_str("[\"@\",\"");
        out.append(&token_buf[..token_len]);
        out.append_str("\",");
        let mut ctx = HandlerCtx {
            out,
            driver,
            open_paths: &mut self.open_paths,
        };
        handler(&mut cur, &mut ctx);
        out.append_str("]");
        Ok(true)
    }
}

fn version(_args: &mut Cursor, ctx: &mut HandlerCtx) {
    ctx.out.append_str(VERSION_REPLY);
}

fn serial_list(_args: &mut Cursor, ctx: &mut HandlerCtx) {
    ctx.out.append_str("[");
    for (i, path) in ctx.driver.list_ports().iter().enumerate() {
        if i > 0 {
            ctx.out.append_str(",");
        }
        ctx.out.append_str("\"");
        ctx.out.append_str(path);
        ctx.out.append_str("\"");
    }
    ctx.out.append_str("]");
}

/// Parse the comma-prefixed path argument. On failure the `0` sentinel is
/// already appended and `None` returned.
fn parse_path(args: &mut Cursor, out: &mut OutboundAssembly) -> Option<String> {
    if let Err(err) = skip_comma(args) {
        warn!(error = %err, "missing comma before path argument");
        out.append_str(FAIL);
        return None;
    }
    let mut buf = [0u8; PATH_CAPACITY];
    let len = match parse_string_into(args, &mut buf) {
        Ok(len) => len,
        Err(err) => {
            warn!(error = %err, "failed to parse device path");
            out.append_str(FAIL);
            return None;
        }
    };
    match std::str::from_utf8(&buf[..len]) {
        Ok(path) => Some(path.to_owned()),
        Err(_) => {
            warn!("device path is not valid UTF-8");
            out.append_str(FAIL);
            None
        }
    }
}

fn serial_open_raw(args: &mut Cursor, ctx: &mut HandlerCtx) {
    let Some(path) = parse_path(args, ctx.out) else {
        return;
    };

    let mut options = SerialOptions::default();
    skip_whitespace(args);
    if args.peek() == Some(b',') {
        args.bump();
        skip_whitespace(args);
        let mut key_buf = [0u8; KEY_CAPACITY];
        if let Err(err) = iterate_object(args, &mut key_buf, |cur, key| options.apply(key, cur)) {
            warn!(path, error = %err, "failed to parse serial options");
            ctx.out.append_str(FAIL);
            return;
        }
    }

    if ctx.open_paths.iter().any(|p| p == &path) {
        warn!(path, "serial path already open");
        ctx.out.append_str(FAIL);
        return;
    }
    match ctx.driver.open(&path, &options) {
        Ok(()) => {
            ctx.open_paths.push(path);
            ctx.out.append_str(OK);
        }
        Err(err) => {
            warn!(path, error = %err, "failed to open serial path");
            ctx.out.append_str(FAIL);
        }
    }
}

fn serial_close(args: &mut Cursor, ctx: &mut HandlerCtx) {
    let Some(path) = parse_path(args, ctx.out) else {
        return;
    };
    let Some(index) = ctx.open_paths.iter().position(|p| p == &path) else {
        warn!(path, "trying to close unopened path");
        ctx.out.append_str(FAIL);
        return;
    };
    ctx.open_paths.remove(index);
    match ctx.driver.close(&path) {
        Ok(()) => ctx.out.append_str(OK),
        Err(err) => {
            warn!(path, error = %err, "failed to close serial path");
            ctx.out.append_str(FAIL);
        }
    }
}

fn serial_send_raw(args: &mut Cursor, ctx: &mut HandlerCtx) {
    let Some(path) = parse_path(args, ctx.out) else {
        return;
    };
    if !ctx.open_paths.iter().any(|p| p == &path) {
        warn!(path, "trying to send to unopened path");
        ctx.out.append_str(FAIL);
        return;
    }
    if let Err(err) = skip_comma(args) {
        warn!(path, error = %err, "missing comma after path");
        ctx.out.append_str(FAIL);
        return;
    }

    // The string argument streams through the base64 decoder as the
    // escape callback delivers it; decoded bytes go to the device in
    // SEND_CHUNK batches plus one final flush for the remainder.
    let driver = &mut *ctx.driver;
    let mut decoder = Base64Decoder::new();
    let mut batch = [0u8; SEND_CHUNK];
    let mut batch_len = 0usize;
    let parsed = parse_string(args, |block| {
        for &c in block {
            if let Some(byte) = decoder.push(c) {
                batch[batch_len] = byte;
                batch_len += 1;
                if batch_len == SEND_CHUNK {
                    if let Err(err) = driver.write(&path, &batch) {
                        warn!(path, error = %err, "device write failed");
                        return Err(portbridge_codec::CodecError::SinkRejected);
                    }
                    batch_len = 0;
                }
            }
        }
        Ok(())
    });

    let sent = match parsed {
        Ok(()) if batch_len > 0 => match driver.write(&path, &batch[..batch_len]) {
            Ok(()) => true,
            Err(err) => {
                warn!(path, error = %err, "device write failed");
                false
            }
        },
        Ok(()) => true,
        Err(err) => {
            warn!(path, error = %err, "failed to stream payload to device");
            false
        }
    };
    ctx.out.append_str(if sent { OK } else { FAIL });
}
