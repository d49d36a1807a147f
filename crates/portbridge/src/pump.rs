//! The single-threaded event loop.
//!
//! Stdin, signal handling and every device reader funnel into one
//! channel; the engine and stdout are only ever touched from the thread
//! draining it, so no locking beyond the channel is needed.

use std::io::{self, Read, Write};
use std::sync::mpsc;
use std::thread::JoinHandle;

use portbridge_protocol::{ProtocolEngine, SerialDriver};
use portbridge_serial::DeviceEvent;
use tracing::{debug, error};

const STDIN_CHUNK: usize = 512;

pub enum Event {
    /// Raw bytes from the controlling process.
    Stdin(Vec<u8>),
    /// Traffic or a failure from a device reader thread.
    Device(DeviceEvent),
    /// Stdin closed or a termination signal arrived.
    Shutdown,
}

/// Read stdin in chunks on a dedicated thread and forward them as events.
/// EOF or a read failure turns into [`Event::Shutdown`].
pub fn spawn_stdin_reader(tx: mpsc::Sender<Event>) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name("stdin".to_owned())
        .spawn(move || {
            let mut stdin = io::stdin();
            let mut buf = [0u8; STDIN_CHUNK];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => {
                        debug!("stdin closed");
                        let _ = tx.send(Event::Shutdown);
                        return;
                    }
                    Ok(n) => {
                        if tx.send(Event::Stdin(buf[..n].to_vec())).is_err() {
                            return;
                        }
                    }
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(err) => {
                        error!(error = %err, "failed to read stdin");
                        let _ = tx.send(Event::Shutdown);
                        return;
                    }
                }
            }
        })
}

/// Framed-message sink writing to stdout, flushed per message so the
/// controlling process never waits on a buffered reply.
pub fn stdout_sink() -> impl FnMut(&[u8]) {
    let stdout = io::stdout();
    move |bytes: &[u8]| {
        let mut out = stdout.lock();
        // A vanished peer surfaces as stdin EOF; write errors need no
        // handling of their own.
        let _ = out.write_all(bytes).and_then(|()| out.flush());
    }
}

/// Drain events until shutdown.
pub fn run<D, S>(engine: &mut ProtocolEngine<D>, events: mpsc::Receiver<Event>, sink: &mut S)
where
    D: SerialDriver,
    S: FnMut(&[u8]) + ?Sized,
{
    for event in events {
        match event {
            Event::Stdin(chunk) => engine.feed(&chunk, sink),
            Event::Device(DeviceEvent::Data { path, bytes }) => {
                engine.notify_received(&path, &bytes, sink)
            }
            Event::Device(DeviceEvent::Error { path, message }) => {
                engine.notify_error(&path, &message, sink)
            }
            Event::Shutdown => {
                debug!("shutting down");
                break;
            }
        }
    }
}
