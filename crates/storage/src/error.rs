//! Errors raised by the in-process backends.
//!
//! These never leave the crate's backends: [`Backend::translate`](crate::Backend::translate)
//! maps them onto [`redstone_core::Error`] at the execution boundary.

use redstone_core::Error;

/// Failure of the standalone in-memory backend.
///
/// Display strings follow the store's own error replies so that translated
/// command errors read the same as from a real server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    /// The backend refused a new connection.
    #[error("connection refused")]
    Refused,

    /// Every allowed connection is leased.
    #[error("connection pool exhausted: {max} connections in use")]
    PoolExhausted { max: usize },

    /// The connection was closed while in use.
    #[error("connection closed")]
    Closed,

    /// Operation against a key holding another type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// Stored value or argument is not an integer.
    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    /// Stored value or argument is not a float, or the result is not finite.
    #[error("ERR value is not a valid float")]
    NotFloat,

    /// Integer arithmetic overflowed.
    #[error("ERR increment or decrement would overflow")]
    Overflow,

    /// The key does not exist.
    #[error("ERR no such key")]
    NoSuchKey,

    /// List index out of range.
    #[error("ERR index out of range")]
    IndexOutOfRange,

    /// Malformed or out-of-context command.
    #[error("ERR {0}")]
    Invalid(String),
}

impl MemoryError {
    /// Shorthand for [`MemoryError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        MemoryError::Invalid(reason.into())
    }

    /// Connection-level failures, as opposed to command rejections.
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            MemoryError::Refused | MemoryError::PoolExhausted { .. } | MemoryError::Closed
        )
    }
}

impl From<MemoryError> for Error {
    fn from(e: MemoryError) -> Self {
        if e.is_connection() {
            Error::connection(e.to_string())
        } else {
            Error::command(e.to_string())
        }
    }
}

/// Failure of the sharded backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShardError {
    /// A multi-key command spans more than one shard.
    #[error("CROSSSLOT Keys in request don't hash to the same shard ({command})")]
    CrossShard { command: &'static str },

    /// A shard rejected the command or its connection failed.
    #[error("shard {shard}: {source}")]
    Shard {
        shard: usize,
        #[source]
        source: MemoryError,
    },

    /// Failure not tied to one shard (acquisition, closed connection).
    #[error(transparent)]
    Connection(MemoryError),
}

impl From<ShardError> for Error {
    fn from(e: ShardError) -> Self {
        match e {
            ShardError::CrossShard { .. } => Error::command(e.to_string()),
            ShardError::Shard { ref source, .. } if source.is_connection() => {
                Error::connection(e.to_string())
            }
            ShardError::Shard { .. } => Error::command(e.to_string()),
            ShardError::Connection(inner) => inner.into(),
        }
    }
}
