use std::{io, num::ParseIntError, str::Utf8Error};

use thiserror::Error;

/// Errors that may occur when reading a message from a stream.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The stream ended before the first byte of a new command.
    /// This is how a client normally closes its session.
    #[error("Connection closed by peer")]
    Disconnected,
    #[error(transparent)]
    IoError(#[from] io::Error),
    #[error("Received invalid command with prefix {0}")]
    InvalidCommandPrefix(String),
    #[error("Unsupported version {0}")]
    UnsupportedVersion(String),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("Message too large! Maximum is {max}, but got {got}")]
    TooManyBytes { max: usize, got: usize },
}

impl From<Utf8Error> for ReadError {
    fn from(value: Utf8Error) -> Self {
        ReadError::InvalidFormat(format!("Invalid UTF8: {}", value))
    }
}

impl From<ParseIntError> for ReadError {
    fn from(value: ParseIntError) -> Self {
        ReadError::InvalidFormat(format!("Invalid integer: {}", value))
    }
}
