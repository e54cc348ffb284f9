use std::io;
use thiserror::Error;

/// Custom error types for sdrsync
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connect error: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Set not acknowledged: {0}")]
    Ack(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new connect error
    pub fn connect(msg: impl Into<String>) -> Self {
        Error::Connect(msg.into())
    }

    /// Creates a new parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Creates a new acknowledgment error
    pub fn ack(msg: impl Into<String>) -> Self {
        Error::Ack(msg.into())
    }

    /// Creates a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Creates a new unexpected error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Error::Unexpected(msg.into())
    }

    /// Creates an I/O error for an operation that exceeded its timeout
    pub fn timed_out(what: impl Into<String>) -> Self {
        Error::Io(io::Error::new(io::ErrorKind::TimedOut, what.into()))
    }

    /// True for failures that cost us the session: both connections are
    /// discarded and the engine reconnects after a backoff.
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Connect(_))
    }
}
