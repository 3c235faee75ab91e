//! # Redstone Executor
//!
//! The public API for Redstone, a typed command facade over a Redis-style
//! key-value store.
//!
//! This is the only crate users need to import. It provides:
//! - [`Redstone`] - typed methods for every command family
//! - [`Executor`] - the single entry point that leases a connection per unit of work
//! - [`RetryPolicy`] - backoff for connection acquisition
//! - [`Error`] - the closed error taxonomy every call reports through
//!
//! ## Quick Start
//!
//! ```text
//! use redstone_executor::{Redstone, RedstoneConfig};
//!
//! let db = Redstone::standalone(&RedstoneConfig::default())?;
//! db.set("session:42", &"token")?;
//! let token: Option<String> = db.get("session:42")?;
//! ```
//!
//! ## Command Families
//!
//! | Family | Examples |
//! |--------|----------|
//! | **Server** | `ping`, `dbsize`, `flushdb` |
//! | **Keys** | `del`, `expire`, `keys`, `scan` |
//! | **Strings** | `set`, `get`, `mget`, `incr_by` |
//! | **Hashes** | `hset`, `hgetall`, `hscan` |
//! | **Lists** | `lpush`, `lrange`, `blpop` |
//! | **Sets** | `sadd`, `smembers`, `sinterstore` |
//! | **Sorted sets** | `zadd`, `zrange_with_scores` |
//! | **Pub/Sub** | `publish`, `subscribe` |
//! | **Transactions** | `transaction`, `multi` |
//!
//! ## Namespaces
//!
//! A facade built with a prefix (`Redstone::builder(backend).prefix("app:")`)
//! prepends it to every key it sends and removes it from every key it lists.

#![warn(missing_docs)]

mod api;
mod convert;
mod executor;
mod retry;

// Test modules
#[cfg(test)]
mod tests;

// =============================================================================
// Public API - Everything users need is re-exported here
// =============================================================================

pub use api::{Received, Redstone, RedstoneBuilder, SetOptions, Transaction};
pub use executor::{Executor, Handle, HandleSubscriber};
pub use retry::RetryPolicy;

// Core types so users don't need redstone-core directly
pub use redstone_core::{
    BackendConfig, Container, CursorToken, Decoded, Encoding, Error, ErrorKind, FieldSchema,
    KeyCodec, RecordSchema, RedstoneConfig, Result, RetryConfig, Scan, ScanCursor, ScanItems,
    ScanPage, ScanParams, ScanState, ShapeId, ShapeTree, TypeDescriptor, Value, ValueCodec,
};

// Backend types so users don't need redstone-storage directly
pub use redstone_storage::{
    Backend, Command, Connection, End, Expiry, MemoryBackend, Message, Reply, SetCondition,
    ShardedBackend, Subscriber,
};
