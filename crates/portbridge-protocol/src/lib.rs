//! Command dispatch and protocol engine for the serial bridge.
//!
//! Requests arrive as `["<token>", ["<command>", <args...>]]` and are
//! answered with `["@", "<token>", <result>]`. The dispatcher walks the
//! envelope with the streaming decoder from `portbridge-codec`, hands the
//! argument cursor to the matched handler, and the handler writes its
//! result straight into the shared outbound buffer. Device traffic flows
//! the other way as unsolicited `serialRecv`/`serialError` notifications.
//!
//! The actual device I/O lives behind the [`SerialDriver`] trait; each
//! platform implements it however its OS requires.

pub mod dispatch;
pub mod driver;
pub mod engine;
pub mod error;
pub mod notify;
pub mod options;

pub use dispatch::Dispatcher;
pub use driver::{DriverError, SerialDriver};
pub use engine::ProtocolEngine;
pub use error::ProtocolError;
pub use options::SerialOptions;
