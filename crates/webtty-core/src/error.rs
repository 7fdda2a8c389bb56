//! Error types for webtty-core.

use thiserror::Error;

/// Main error type for webtty operations.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from underlying system calls.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Signed-URL verification failed (missing secret, missing token,
    /// unparseable referer, or signature mismatch).
    #[error("signature unverified: {message}")]
    Unverified { message: String },

    /// Process could not be created.
    #[error("spawn error: {message}")]
    Spawn { message: String },

    /// PTY error after the process is running.
    #[error("pty error: {message}")]
    Pty { message: String },

    /// Malformed client event (bad resize envelope, invalid dimensions).
    /// Dropped by the bridge; never fatal to the session.
    #[error("malformed event: {message}")]
    MalformedEvent { message: String },

    /// Transport layer error.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The transport connection was closed.
    #[error("connection closed")]
    ConnectionClosed,

    /// Invalid configuration, reported at startup.
    #[error("config error: {message}")]
    Config { message: String },
}

impl Error {
    /// Returns true if the session can continue after this error.
    ///
    /// Only malformed client events are recoverable: the bridge drops the
    /// event, logs it, and keeps streaming.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::MalformedEvent { .. })
    }
}

/// Convenience result type for webtty operations.
pub type Result<T> = std::result::Result<T, Error>;
