//! Error types for espat.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! response-parsing errors are all captured here.

/// The error type for all espat operations.
///
/// Transport failures are surfaced to callers of the [`Transport`] trait,
/// but the AT engine folds read/write failures into "no data" and lets the
/// retry loop decide. The protocol variants are produced by the checked
/// client APIs that need to tell failure causes apart.
///
/// [`Transport`]: crate::transport::Transport
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port open/configure failure).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for data from the module.
    #[error("timeout waiting for response")]
    Timeout,

    /// No connection to the module has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the module was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// A command never produced a valid echo/`OK` envelope.
    #[error("command {command} failed after {attempts} attempt(s)")]
    CommandFailed {
        /// The command text as sent, without the line terminator.
        command: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// The response payload has no `key:value` line for the requested key.
    #[error("key not found in response: {0}")]
    KeyNotFound(String),

    /// A value could not be parsed as a colon-separated MAC address.
    #[error("invalid MAC address: {0:?}")]
    InvalidMac(String),

    /// An invalid parameter was passed to a builder or command.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
