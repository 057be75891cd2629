//! Error types for telnetd.

use thiserror::Error;

/// Common error type for telnetd.
#[derive(Error, Debug)]
pub enum TelnetError {
    /// I/O error from a socket or file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (malformed TOML, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// A protocol-level violation that cannot be handled in-session.
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Result type alias for telnetd operations.
pub type Result<T> = std::result::Result<T, TelnetError>;
