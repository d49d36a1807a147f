/// Errors that can occur while decoding JSON or base64 payloads.
///
/// After any error the cursor position is unspecified; partial work may
/// already have reached a side-effecting sink.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Input ended before the parser was done.
    #[error("unexpected end of input at offset {0}")]
    UnexpectedEnd(usize),

    /// A byte that does not fit the expected grammar.
    #[error("unexpected byte {byte:#04x} at offset {offset}")]
    UnexpectedByte { byte: u8, offset: usize },

    /// An integer with no digits.
    #[error("expected a digit at offset {0}")]
    ExpectedDigit(usize),

    /// A string sink refused a block (destination full, device write
    /// failure, ...). The refusing sink knows the real cause.
    #[error("string sink rejected a block")]
    SinkRejected,

    /// An object key did not fit the caller's key buffer.
    #[error("object key exceeds {0}-byte buffer")]
    KeyTooLong(usize),

    /// An object key was not valid UTF-8.
    #[error("object key is not valid UTF-8")]
    KeyNotUtf8,

    /// The base64 encoder ran out of room in the destination.
    #[error("base64 output exceeds destination limit of {limit} bytes")]
    DestinationFull { limit: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
