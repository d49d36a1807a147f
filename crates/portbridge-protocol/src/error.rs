use portbridge_codec::CodecError;

/// Errors surfaced by the dispatcher to its caller.
///
/// Only envelope-level problems reach here; argument-level failures are
/// answered inline with the `0` sentinel and never become errors.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The top-level request structure is not the expected
    /// `[token, [command, ...]]` shape.
    #[error("malformed request envelope: {0}")]
    Envelope(#[from] CodecError),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
