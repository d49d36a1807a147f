use crate::options::SerialOptions;

/// Errors from a serial driver implementation.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The path is already held open by this driver.
    #[error("port {0} is already open")]
    AlreadyOpen(String),

    /// The path is not currently open.
    #[error("port {0} is not open")]
    NotOpen(String),

    /// The requested bit rate has no hardware equivalent.
    #[error("unsupported bit rate {0}")]
    UnsupportedBitRate(u32),

    /// An option value outside its allowed range.
    #[error("invalid {field} value {value}")]
    InvalidOption { field: &'static str, value: u32 },

    /// Opening the device node failed.
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    /// Applying line settings failed.
    #[error("failed to configure {path}: {source}")]
    Configure {
        path: String,
        source: std::io::Error,
    },

    /// Writing to the device failed.
    #[error("failed to write to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },

    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The serial device collaborator.
///
/// The protocol core calls these synchronously from the dispatch thread
/// and treats any error as a command failure. Inbound device data does
/// not flow through this trait: implementations push it into the host's
/// notification path (see the engine's `notify_received`/`notify_error`).
pub trait SerialDriver {
    /// Paths the bridge advertises to the controlling process.
    fn list_ports(&self) -> Vec<String>;

    /// Open and configure a device.
    fn open(&mut self, path: &str, options: &SerialOptions) -> Result<(), DriverError>;

    /// Close a previously opened device.
    fn close(&mut self, path: &str) -> Result<(), DriverError>;

    /// Write `data` fully to an open device.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), DriverError>;
}
