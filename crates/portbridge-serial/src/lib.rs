//! Unix serial device driver for the bridge.
//!
//! Each opened port gets a dedicated reader thread that polls the device
//! and forwards traffic as [`DeviceEvent`]s through a caller-supplied
//! notifier, so the host can funnel them into its single event loop.
//! Line configuration goes through termios; only the classic POSIX bit
//! rates up to 230400 are accepted.

mod line;

pub mod driver;

pub use driver::{DeviceEvent, DeviceNotifier, UnixSerialDriver};
