use portbridge_frame::{InboundAssembly, OutboundAssembly};
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::driver::SerialDriver;
use crate::notify;

/// Ties reassembly, dispatch and reply framing together around one driver.
///
/// One engine per bridge process. All methods run on the host's event
/// thread; device reader threads never touch the engine directly, they
/// forward their payloads as events the host replays through
/// [`ProtocolEngine::notify_received`] and [`ProtocolEngine::notify_error`].
pub struct ProtocolEngine<D: SerialDriver> {
    inbound: InboundAssembly,
    outbound: OutboundAssembly,
    dispatcher: Dispatcher,
    driver: D,
}

impl<D: SerialDriver> ProtocolEngine<D> {
    pub fn new(driver: D) -> Self {
        Self {
            inbound: InboundAssembly::new(),
            outbound: OutboundAssembly::new(),
            dispatcher: Dispatcher::new(),
            driver,
        }
    }

    pub fn with_capacity(driver: D, inbound_capacity: usize, reply_limit: usize) -> Self {
        Self {
            inbound: InboundAssembly::with_capacity(inbound_capacity),
            outbound: OutboundAssembly::with_limit(reply_limit),
            dispatcher: Dispatcher::new(),
            driver,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Paths currently open, for shutdown cleanup.
    pub fn open_paths(&self) -> &[String] {
        self.dispatcher.open_paths()
    }

    /// Feed raw stdin bytes. Completed requests are dispatched as they
    /// assemble; each reply (if any) is framed and handed to `sink`.
    pub fn feed<S>(&mut self, chunk: &[u8], sink: &mut S)
    where
        S: FnMut(&[u8]) + ?Sized,
    {
        let outbound = &mut self.outbound;
        let dispatcher = &mut self.dispatcher;
        let driver = &mut self.driver;
        self.inbound.feed(chunk, |frame| {
            match dispatcher.handle(frame, &mut *outbound, &mut *driver) {
                Ok(true) => outbound.finalize(&mut *sink),
                Ok(false) => {}
                Err(err) => {
                    debug!(error = %err, "dropping malformed request");
                    outbound.begin();
                }
            }
        });
    }

    /// Emit a `serialRecv` notification for bytes read from a device.
    pub fn notify_received<S>(&mut self, path: &str, data: &[u8], sink: &mut S)
    where
        S: FnMut(&[u8]) + ?Sized,
    {
        notify::serial_recv(&mut self.outbound, path, data, sink);
    }

    /// Emit a `serialError` notification for a failed device.
    pub fn notify_error<S>(&mut self, path: &str, message: &str, sink: &mut S)
    where
        S: FnMut(&[u8]) + ?Sized,
    {
        notify::serial_error(&mut self.outbound, path, message, sink);
    }
}
