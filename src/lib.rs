//! Redstone - typed command facade for Redis-style key-value stores
//!
//! Redstone wraps a store's command set in typed methods with a uniform
//! namespace policy, pluggable value encoding, resumable scan cursors and one
//! closed error taxonomy.
//!
//! # Quick Start
//!
//! ```ignore
//! use redstone::{Redstone, RedstoneConfig};
//!
//! // Facade over an in-process store, keys namespaced under "app:"
//! let db = Redstone::builder(redstone::MemoryBackend::new())
//!     .prefix("app:")
//!     .build();
//!
//! // Stored under "app:session:42"
//! db.set("session:42", &"token")?;
//! let token: Option<String> = db.get("session:42")?;
//! ```
//!
//! # Architecture
//!
//! Every call goes through the [`Executor`], which leases one connection per
//! unit of work from the bound [`Backend`]. The [`Redstone`] struct provides
//! the typed interface on top.
//!
//! Backend internals (keyspace, sharding, pub/sub broker) are reachable only
//! through the re-exported backend types.

// Re-export the public API from redstone-executor
pub use redstone_executor::*;
