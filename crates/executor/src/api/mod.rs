//! High-level typed facade over the [`Executor`].
//!
//! [`Redstone`] turns each store command into a typed method. Every method
//! follows the same path:
//!
//! 1. keys pass through the [`KeyCodec`] (namespace prefix)
//! 2. values pass through the [`ValueCodec`] (JSON or MessagePack)
//! 3. one [`Command`] runs through [`Executor::execute`]
//! 4. the [`Reply`] is checked for shape and decoded
//!
//! Methods come in up to three value flavours: typed (`get::<T>`, serde),
//! raw (`get_raw`, bytes without framing) and descriptor-driven (`get_as`,
//! a runtime [`TypeDescriptor`]).
//!
//! # Example
//!
//! ```text
//! use redstone::{Redstone, RedstoneConfig};
//!
//! let db = Redstone::standalone(&RedstoneConfig::default())?;
//! db.set("user:1", &User { id: 1, name: "Ada".into() })?;
//! let user: Option<User> = db.get("user:1")?;
//! ```

mod hashes;
mod keys;
mod lists;
mod pubsub;
mod server;
mod sets;
mod strings;
mod transaction;
mod zsets;

pub use pubsub::Received;
pub use strings::SetOptions;
pub use transaction::Transaction;

use std::time::Duration;

use redstone_core::{
    Decoded, Encoding, Error, KeyCodec, RedstoneConfig, Result, TypeDescriptor, ValueCodec,
};
use redstone_storage::{Backend, Command, MemoryBackend, Reply, ShardedBackend};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::executor::{Executor, Handle};
use crate::retry::RetryPolicy;

/// Typed command facade over one backend.
///
/// Cheap to share by reference across threads; every call leases its own
/// connection.
#[derive(Debug)]
pub struct Redstone<B: Backend> {
    executor: Executor<B>,
    keys: KeyCodec,
    codec: ValueCodec,
}

impl Redstone<MemoryBackend> {
    /// Facade over a fresh standalone in-memory store.
    ///
    /// `config.backend.shards` is ignored.
    pub fn standalone(config: &RedstoneConfig) -> Result<Self> {
        let backend = match config.backend.max_connections {
            Some(max) => MemoryBackend::with_max_connections(max),
            None => MemoryBackend::new(),
        };
        Ok(Self::from_config(backend, config))
    }
}

impl Redstone<ShardedBackend> {
    /// Facade over a fresh sharded in-memory store with
    /// `config.backend.shards` shards.
    pub fn sharded(config: &RedstoneConfig) -> Result<Self> {
        if config.backend.shards == 0 {
            return Err(Error::usage("backend.shards must be at least 1"));
        }
        let backend = match config.backend.max_connections {
            Some(max) => ShardedBackend::with_max_connections(config.backend.shards, max),
            None => ShardedBackend::new(config.backend.shards),
        };
        Ok(Self::from_config(backend, config))
    }
}

impl<B: Backend> Redstone<B> {
    /// Start building a facade over `backend`.
    pub fn builder(backend: B) -> RedstoneBuilder<B> {
        RedstoneBuilder::new(backend)
    }

    /// Facade over `backend` with every setting taken from `config`.
    pub fn from_config(backend: B, config: &RedstoneConfig) -> Self {
        let mut builder = Self::builder(backend)
            .encoding(config.encoding)
            .retry(RetryPolicy::from(&config.retry));
        if let Some(prefix) = &config.prefix {
            builder = builder.prefix(prefix.clone());
        }
        builder.build()
    }

    /// The underlying executor, for custom units of work.
    pub fn executor(&self) -> &Executor<B> {
        &self.executor
    }

    /// The bound backend.
    pub fn backend(&self) -> &B {
        self.executor.backend()
    }

    /// The namespace policy applied to every key.
    pub fn key_codec(&self) -> &KeyCodec {
        &self.keys
    }

    /// The payload codec applied to every typed value.
    pub fn value_codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Run a custom unit of work on one leased connection.
    ///
    /// Keys in commands sent through the handle are not prefixed.
    pub fn execute<R, F>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&mut Handle<'_, B>) -> Result<R>,
    {
        self.executor.execute(work)
    }

    /// Send one prebuilt command. Keys are sent as given.
    pub fn command(&self, cmd: Command) -> Result<Reply> {
        self.executor.call(cmd)
    }

    // =========================================================================
    // Shared plumbing for the command families
    // =========================================================================

    pub(crate) fn call(&self, cmd: Command) -> Result<Reply> {
        self.executor.call(cmd)
    }

    pub(crate) fn key(&self, key: impl AsRef<[u8]>) -> Vec<u8> {
        self.keys.encode(key)
    }

    pub(crate) fn key_list<K: AsRef<[u8]>>(&self, keys: &[K]) -> Vec<Vec<u8>> {
        self.keys.encode_all(keys)
    }

    pub(crate) fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        self.codec.encode(value)
    }

    pub(crate) fn encode_all<T: Serialize>(&self, values: &[T]) -> Result<Vec<Vec<u8>>> {
        values.iter().map(|v| self.codec.encode(v)).collect()
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T> {
        self.codec.decode(payload)
    }

    /// Missing entries stay `None`; they never decode to a default.
    pub(crate) fn decode_opt<T: DeserializeOwned>(
        &self,
        raw: Option<Vec<u8>>,
    ) -> Result<Option<T>> {
        raw.map(|payload| self.decode(&payload)).transpose()
    }

    pub(crate) fn decode_opt_as(
        &self,
        raw: Option<Vec<u8>>,
        descriptor: &TypeDescriptor,
    ) -> Result<Option<Decoded>> {
        raw.map(|payload| self.codec.decode_as(&payload, descriptor))
            .transpose()
    }

    /// Decode every element independently.
    pub(crate) fn decode_each<T: DeserializeOwned>(&self, items: Vec<Vec<u8>>) -> Vec<Result<T>> {
        items.iter().map(|payload| self.decode(payload)).collect()
    }

    /// Decode every present element independently.
    pub(crate) fn decode_each_opt<T: DeserializeOwned>(
        &self,
        items: Vec<Option<Vec<u8>>>,
    ) -> Vec<Result<Option<T>>> {
        items.into_iter().map(|raw| self.decode_opt(raw)).collect()
    }

    /// Remove the namespace prefix from a key returned by the store.
    pub(crate) fn strip(&self, mut raw: Vec<u8>) -> Vec<u8> {
        let prefix_len = raw.len() - self.keys.strip(&raw).len();
        raw.drain(..prefix_len);
        raw
    }
}

/// Timeout for blocking commands in the store's millisecond form.
///
/// `None` and zero both mean "wait until data arrives".
pub(crate) fn timeout_ms(timeout: Option<Duration>) -> u64 {
    timeout.map_or(0, |t| t.as_millis().min(u64::MAX as u128) as u64)
}

/// Programmatic construction of a [`Redstone`] facade.
#[derive(Debug)]
pub struct RedstoneBuilder<B: Backend> {
    backend: B,
    prefix: Option<String>,
    encoding: Encoding,
    retry: RetryPolicy,
}

impl<B: Backend> RedstoneBuilder<B> {
    fn new(backend: B) -> Self {
        Self {
            backend,
            prefix: None,
            encoding: Encoding::default(),
            retry: RetryPolicy::no_retry(),
        }
    }

    /// Namespace prefix applied to every key.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Payload encoding for typed values.
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Connection acquisition retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Finish construction.
    pub fn build(self) -> Redstone<B> {
        let keys = KeyCodec::new(self.prefix);
        tracing::info!(
            target: "redstone::executor",
            backend = self.backend.name(),
            prefix = keys.prefix().unwrap_or(""),
            encoding = self.encoding.name(),
            max_retries = self.retry.max_retries(),
            "facade ready"
        );
        Redstone {
            executor: Executor::with_retry(self.backend, self.retry),
            keys,
            codec: ValueCodec::new(self.encoding),
        }
    }
}
