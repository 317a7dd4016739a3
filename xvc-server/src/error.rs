use std::io;

use thiserror::Error;
use xvc_protocol::error::ReadError;

/// Reasons for a session to end early.
///
/// None of these are reported to the client, XVC has no error response. The client only
/// observes that the connection is closed.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading from or writing to the client failed.
    #[error("transport error: {0}")]
    Transport(#[source] io::Error),
    /// The client sent an unknown command or a shift that exceeds the vector capacity.
    #[error("protocol violation: {0}")]
    Protocol(#[source] ReadError),
    /// The client stopped accepting data before the whole response was sent.
    #[error("short write: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },
}

impl From<io::Error> for SessionError {
    fn from(value: io::Error) -> Self {
        SessionError::Transport(value)
    }
}

impl From<ReadError> for SessionError {
    fn from(value: ReadError) -> Self {
        match value {
            ReadError::IoError(err) => SessionError::Transport(err),
            other => SessionError::Protocol(other),
        }
    }
}
