//! Command set, backend traits and in-process backends
//!
//! This crate implements the store side of Redstone:
//! - `Command` / `Reply`: the typed request and response model
//! - `Backend` / `Connection` / `Subscriber`: the seam the executor drives
//! - `MemoryBackend`: standalone store on one shared `Keyspace`
//! - `ShardedBackend`: keys spread over several keyspaces by hash tag
//! - `Broker`: channel registry for publish/subscribe
//!
//! # Keyspace
//!
//! Strings, hashes, lists, sets and sorted sets with lazy expiry, per-key
//! versions for optimistic transactions and condition-variable wakeups for
//! blocking pops.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod command;
pub mod error;
pub mod glob;
pub mod keyspace;
pub mod memory;
pub mod pool;
pub mod pubsub;
pub mod reply;
pub mod sharded;

pub use backend::{Backend, Connection, Subscriber};
pub use command::{Command, End, Expiry, SetCondition};
pub use error::{MemoryError, ShardError};
pub use glob::glob_match;
pub use keyspace::{Keyspace, DEFAULT_SCAN_COUNT};
pub use memory::{MemoryBackend, MemoryConnection, MemorySubscriber};
pub use pubsub::{Broker, Message, Subscription};
pub use reply::Reply;
pub use sharded::{hash_tag, ShardedBackend, ShardedConnection, ShardedSubscriber};
