use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use portbridge_protocol::{DriverError, SerialDriver, SerialOptions};
use tracing::{debug, warn};

use crate::line;

/// Devices are read in chunks of this size; each chunk becomes one
/// `serialRecv` notification.
const READ_BUFFER: usize = 256;

/// How long a reader thread blocks in poll before rechecking its stop
/// flag. Bounds how long `close` can take.
const POLL_INTERVAL_MS: libc::c_int = 250;

/// Traffic and failures reported by reader threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Data { path: String, bytes: Vec<u8> },
    Error { path: String, message: String },
}

/// Callback the reader threads deliver events through. The host wraps its
/// event-queue sender in one of these.
pub type DeviceNotifier = Arc<dyn Fn(DeviceEvent) + Send + Sync>;

struct PortHandle {
    file: File,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

/// termios-backed [`SerialDriver`].
///
/// The advertised port list comes from configuration, not from scanning;
/// the bridge deliberately only exposes paths the operator listed. Writes
/// happen on the caller's thread, reads on one thread per open port.
pub struct UnixSerialDriver {
    ports: Vec<String>,
    open: HashMap<String, PortHandle>,
    notifier: DeviceNotifier,
}

impl UnixSerialDriver {
    pub fn new(ports: Vec<String>, notifier: DeviceNotifier) -> Self {
        Self {
            ports,
            open: HashMap::new(),
            notifier,
        }
    }

    /// Close every open port, joining the reader threads.
    pub fn close_all(&mut self) {
        let paths: Vec<String> = self.open.keys().cloned().collect();
        for path in paths {
            if let Err(err) = self.close(&path) {
                warn!(path, error = %err, "failed to close port during shutdown");
            }
        }
    }
}

impl SerialDriver for UnixSerialDriver {
    fn list_ports(&self) -> Vec<String> {
        self.ports.clone()
    }

    fn open(&mut self, path: &str, options: &SerialOptions) -> Result<(), DriverError> {
        if self.open.contains_key(path) {
            return Err(DriverError::AlreadyOpen(path.to_owned()));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|err| DriverError::Open {
                path: path.to_owned(),
                source: err,
            })?;
        line::configure(file.as_raw_fd(), path, options)?;

        let stop = Arc::new(AtomicBool::new(false));
        let reader_file = file.try_clone().map_err(|err| DriverError::Open {
            path: path.to_owned(),
            source: err,
        })?;
        let reader = std::thread::Builder::new()
            .name(format!("read {path}"))
            .spawn({
                let path = path.to_owned();
                let stop = Arc::clone(&stop);
                let notifier = Arc::clone(&self.notifier);
                move || read_loop(reader_file, path, stop, notifier)
            })
            .map_err(DriverError::Io)?;

        debug!(path, bit_rate = options.bit_rate, "opened serial port");
        self.open.insert(
            path.to_owned(),
            PortHandle {
                file,
                stop,
                reader: Some(reader),
            },
        );
        Ok(())
    }

    fn close(&mut self, path: &str) -> Result<(), DriverError> {
        let mut handle = self
            .open
            .remove(path)
            .ok_or_else(|| DriverError::NotOpen(path.to_owned()))?;
        handle.stop.store(true, Ordering::Relaxed);
        if let Some(reader) = handle.reader.take() {
            if reader.join().is_err() {
                warn!(path, "reader thread panicked");
            }
        }
        drop(handle.file);
        debug!(path, "closed serial port");
        Ok(())
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), DriverError> {
        let handle = self
            .open
            .get_mut(path)
            .ok_or_else(|| DriverError::NotOpen(path.to_owned()))?;
        handle.file.write_all(data).map_err(|err| DriverError::Write {
            path: path.to_owned(),
            source: err,
        })
    }
}

impl Drop for UnixSerialDriver {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Poll-and-read loop for one port. Exits silently on EOF or stop; a read
/// or poll failure produces a single error event before exiting.
fn read_loop(file: File, path: String, stop: Arc<AtomicBool>, notifier: DeviceNotifier) {
    let fd = file.as_raw_fd();
    let mut buf = [0u8; READ_BUFFER];
    while !stop.load(Ordering::Relaxed) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let n = unsafe { libc::poll(&mut pfd, 1, POLL_INTERVAL_MS) };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                continue;
            }
            notifier(DeviceEvent::Error {
                path,
                message: format!("poll failed: {err}"),
            });
            return;
        }
        if n == 0 {
            continue;
        }
        if pfd.revents & libc::POLLIN == 0 {
            // POLLERR / POLLHUP without data: the device went away.
            debug!(path, revents = pfd.revents, "device hangup");
            notifier(DeviceEvent::Error {
                path,
                message: "device disconnected".to_owned(),
            });
            return;
        }
        match (&file).read(&mut buf) {
            Ok(0) => return,
            Ok(r) => notifier(DeviceEvent::Data {
                path: path.clone(),
                bytes: buf[..r].to_vec(),
            }),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                notifier(DeviceEvent::Error {
                    path: path.clone(),
                    message: format!("failed to read: {err}"),
                });
                return;
            }
        }
    }
}
