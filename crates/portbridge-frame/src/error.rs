/// Errors that can occur while assembling frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A reply grew past the outbound buffer's soft limit.
    #[error("reply exceeds outbound limit of {limit} bytes")]
    ReplyOverflow { limit: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
