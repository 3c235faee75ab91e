//! Store replies.
//!
//! Every [`Command`](crate::Command) produces exactly one [`Reply`]. The shape
//! for each command is documented on its variant.

use serde::{Deserialize, Serialize};

/// A reply from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    /// Absent value (missing key, failed condition, timeout)
    Nil,
    /// Simple status line such as `OK`, `PONG`, `QUEUED` or a type name
    Status(String),
    /// Integer result
    Int(i64),
    /// Floating point result (scores, `INCRBYFLOAT`)
    Double(f64),
    /// Binary-safe string
    Bulk(Vec<u8>),
    /// Nested replies
    Array(Vec<Reply>),
    /// Per-command failure inside an `EXEC` result
    Error(String),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    /// `+QUEUED`
    pub fn queued() -> Self {
        Reply::Status("QUEUED".to_string())
    }

    /// A bulk string or nil.
    pub fn bulk_or_nil(value: Option<Vec<u8>>) -> Self {
        value.map_or(Reply::Nil, Reply::Bulk)
    }

    /// An array of bulk strings.
    pub fn bulks<I: IntoIterator<Item = Vec<u8>>>(items: I) -> Self {
        Reply::Array(items.into_iter().map(Reply::Bulk).collect())
    }

    /// Returns `true` for `Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Nil)
    }

    /// Returns `true` for the `OK` status.
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Status(s) if s == "OK")
    }
}
