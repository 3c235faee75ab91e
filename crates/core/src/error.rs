//! Error types for Redstone.
//!
//! Every failure a caller can observe is one of four kinds. Errors raised by a
//! particular backend are translated into this taxonomy at the execution
//! boundary; backend error types never reach callers.
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `Connection` | a handle cannot be obtained or used (refused, closed, pool exhausted) |
//! | `Command` | the store rejected a command or answered in an unexpected shape |
//! | `Deserialization` | a stored payload cannot be reconstructed into the requested shape |
//! | `Usage` | the caller broke an API contract (mismatched batch lengths, bad descriptor) |

use serde::{Deserialize, Serialize};

/// Result type alias for Redstone operations
pub type Result<T> = std::result::Result<T, Error>;

/// The four failure categories, without their details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// See [`Error::Connection`]
    Connection,
    /// See [`Error::Command`]
    Command,
    /// See [`Error::Deserialization`]
    Deserialization,
    /// See [`Error::Usage`]
    Usage,
}

/// Errors surfaced by every Redstone operation.
///
/// # Example
///
/// ```ignore
/// match facade.get::<i64>("counter") {
///     Ok(v) => println!("{:?}", v),
///     Err(Error::Connection { reason }) => eprintln!("store unreachable: {}", reason),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    /// A connection could not be obtained, or failed while in use.
    /// Callers may retry; whether the command took effect is unknown unless
    /// the failure happened during acquisition.
    #[error("connection error: {reason}")]
    Connection { reason: String },

    /// The store rejected the command (wrong type, syntax, not an integer,
    /// cross-shard access, ...). Not retryable.
    #[error("command error: {reason}")]
    Command { reason: String },

    /// A payload could not be decoded into the requested shape.
    /// Local to the one value that failed.
    #[error("deserialization error: {reason}")]
    Deserialization { reason: String },

    /// The caller violated an API contract.
    #[error("usage error: {reason}")]
    Usage { reason: String },
}

impl Error {
    /// Create a connection error.
    pub fn connection(reason: impl Into<String>) -> Self {
        Error::Connection {
            reason: reason.into(),
        }
    }

    /// Create a command error.
    pub fn command(reason: impl Into<String>) -> Self {
        Error::Command {
            reason: reason.into(),
        }
    }

    /// Create a deserialization error.
    pub fn deserialization(reason: impl Into<String>) -> Self {
        Error::Deserialization {
            reason: reason.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(reason: impl Into<String>) -> Self {
        Error::Usage {
            reason: reason.into(),
        }
    }

    /// The store answered `command` with a reply the caller cannot interpret.
    pub fn unexpected_reply(command: &str, reply: impl std::fmt::Debug) -> Self {
        Error::command(format!("unexpected reply for {}: {:?}", command, reply))
    }

    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Command { .. } => ErrorKind::Command,
            Error::Deserialization { .. } => ErrorKind::Deserialization,
            Error::Usage { .. } => ErrorKind::Usage,
        }
    }

    /// The human-readable detail carried by this error.
    pub fn reason(&self) -> &str {
        match self {
            Error::Connection { reason }
            | Error::Command { reason }
            | Error::Deserialization { reason }
            | Error::Usage { reason } => reason,
        }
    }

    /// Only connection failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}
