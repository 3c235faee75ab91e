//! Sharded in-memory backend.
//!
//! # Design
//!
//! - N independent [`Keyspace`]s, one per shard
//! - Keys route by `xxh3_64(hash_tag(key)) % N`; a `{tag}` section makes
//!   related keys land together
//! - Single-key commands go to their shard
//! - `DEL`, `EXISTS` and `MGET` fan out per key and merge the replies
//! - `DBSIZE`, `FLUSHDB` and `KEYS` visit every shard
//! - Any other multi-key command must stay on one shard, else it fails with
//!   [`ShardError::CrossShard`]
//! - `SCAN` walks shards in order; the cursor token packs the position inside
//!   the current shard together with the shard index
//! - Transactions queue at the connection and run on the one shard all
//!   their keys share
//!
//! Pub/sub is cluster-wide through a single broker.

use std::sync::Arc;
use std::time::Duration;

use xxhash_rust::xxh3::xxh3_64;

use crate::backend::{Backend, Connection, Subscriber};
use crate::command::Command;
use crate::error::{MemoryError, ShardError};
use crate::keyspace::Keyspace;
use crate::memory::{MemorySubscriber, Session};
use crate::pool::{Pool, Slot};
use crate::pubsub::{Broker, Message};
use crate::reply::Reply;

/// The portion of `key` that decides its shard.
///
/// The bytes between the first `{` and the next `}` when that section is
/// non-empty, otherwise the whole key.
pub fn hash_tag(key: &[u8]) -> &[u8] {
    if let Some(open) = key.iter().position(|&b| b == b'{') {
        let rest = &key[open + 1..];
        if let Some(len) = rest.iter().position(|&b| b == b'}') {
            if len > 0 {
                return &rest[..len];
            }
        }
    }
    key
}

/// In-process store split across several shards.
#[derive(Debug, Clone)]
pub struct ShardedBackend {
    shards: Arc<[Arc<Keyspace>]>,
    broker: Arc<Broker>,
    pool: Arc<Pool>,
}

impl ShardedBackend {
    /// Unbounded backend with `shards` empty shards (at least one).
    pub fn new(shards: usize) -> Self {
        Self::with_pool(shards, Pool::new(None))
    }

    /// Backend allowing at most `max` simultaneous connections.
    pub fn with_max_connections(shards: usize, max: usize) -> Self {
        Self::with_pool(shards, Pool::new(Some(max)))
    }

    fn with_pool(shards: usize, pool: Pool) -> Self {
        Self {
            shards: (0..shards.max(1)).map(|_| Arc::new(Keyspace::new())).collect(),
            broker: Arc::new(Broker::new()),
            pool: Arc::new(pool),
        }
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Shard index for `key`.
    pub fn shard_for(&self, key: &[u8]) -> usize {
        shard_index(key, self.shards.len())
    }

    /// Keyspace of shard `index`.
    pub fn shard(&self, index: usize) -> Option<&Keyspace> {
        self.shards.get(index).map(|s| s.as_ref())
    }

    /// The pub/sub broker shared by every shard.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    /// Refuse the next `n` connection attempts.
    pub fn fail_next_connects(&self, n: u32) {
        self.pool.refuse_next(n);
    }

    /// Close every connection currently leased.
    pub fn close_all(&self) {
        tracing::debug!(
            target: "redstone::storage",
            backend = "sharded",
            "closing all connections"
        );
        self.pool.close_all();
    }

    /// Number of connections currently leased.
    pub fn active_connections(&self) -> usize {
        self.pool.active()
    }
}

fn shard_index(key: &[u8], shards: usize) -> usize {
    (xxh3_64(hash_tag(key)) % shards as u64) as usize
}

impl Backend for ShardedBackend {
    type Connection = ShardedConnection;
    type Error = ShardError;

    fn name(&self) -> &'static str {
        "sharded"
    }

    fn connect(&self) -> Result<ShardedConnection, ShardError> {
        let slot = self.pool.acquire().map_err(ShardError::Connection)?;
        Ok(ShardedConnection {
            shards: Arc::clone(&self.shards),
            broker: Arc::clone(&self.broker),
            slot,
            session: Session::default(),
        })
    }

    fn release(&self, conn: ShardedConnection) {
        drop(conn);
    }

    fn translate(&self, err: ShardError) -> redstone_core::Error {
        err.into()
    }
}

/// A leased connection to a [`ShardedBackend`].
#[derive(Debug)]
pub struct ShardedConnection {
    shards: Arc<[Arc<Keyspace>]>,
    broker: Arc<Broker>,
    slot: Slot,
    session: Session,
}

impl ShardedConnection {
    fn shard_of(&self, key: &[u8]) -> usize {
        shard_index(key, self.shards.len())
    }

    /// The single shard every key in `keys` maps to; shard 0 when empty.
    fn common_shard<'a>(
        &self,
        keys: impl IntoIterator<Item = &'a [u8]>,
        command: &'static str,
    ) -> Result<usize, ShardError> {
        let mut shards = keys.into_iter().map(|k| self.shard_of(k));
        let first = shards.next().unwrap_or(0);
        if shards.all(|s| s == first) {
            Ok(first)
        } else {
            Err(ShardError::CrossShard { command })
        }
    }

    fn apply(&self, shard: usize, cmd: Command) -> Result<Reply, ShardError> {
        let keyspace = &self.shards[shard];
        let result = if cmd.blocking_timeout().is_some() {
            let liveness = self.slot.liveness();
            keyspace.apply_blocking(cmd, &|| liveness.is_closed())
        } else {
            keyspace.apply(cmd)
        };
        result.map_err(|source| ShardError::Shard { shard, source })
    }

    /// Run a per-key command on each key's shard and sum the integer replies.
    fn sum_per_key(
        &self,
        keys: Vec<Vec<u8>>,
        build: fn(Vec<Vec<u8>>) -> Command,
    ) -> Result<Reply, ShardError> {
        let mut total = 0;
        for key in keys {
            let shard = self.shard_of(&key);
            if let Reply::Int(n) = self.apply(shard, build(vec![key]))? {
                total += n;
            }
        }
        Ok(Reply::Int(total))
    }

    fn mget(&self, keys: Vec<Vec<u8>>) -> Result<Reply, ShardError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let shard = self.shard_of(&key);
            let value = match self.apply(shard, Command::MGet { keys: vec![key] })? {
                Reply::Array(mut items) if items.len() == 1 => items.remove(0),
                _ => Reply::Nil,
            };
            values.push(value);
        }
        Ok(Reply::Array(values))
    }

    fn scan(
        &self,
        cursor: String,
        pattern: Option<Vec<u8>>,
        count: Option<usize>,
        kind: Option<String>,
    ) -> Result<Reply, ShardError> {
        let n = self.shards.len() as u64;
        let token: u64 = cursor.parse().map_err(|_| ShardError::Shard {
            shard: 0,
            source: MemoryError::invalid("invalid cursor"),
        })?;
        let shard = (token % n) as usize;
        let position = token / n;
        let reply = self.apply(
            shard,
            Command::Scan {
                cursor: position.to_string(),
                pattern,
                count,
                kind,
            },
        )?;
        let mut parts = match reply {
            Reply::Array(parts) => parts,
            other => return Ok(other),
        };
        let next_position = match parts.first() {
            Some(Reply::Bulk(raw)) => std::str::from_utf8(raw)
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0),
            _ => 0,
        };
        let next = if next_position != 0 {
            next_position * n + shard as u64
        } else if (shard as u64) + 1 < n {
            shard as u64 + 1
        } else {
            0
        };
        if let Some(first) = parts.first_mut() {
            *first = Reply::Bulk(next.to_string().into_bytes());
        }
        Ok(Reply::Array(parts))
    }

    fn everywhere(&self, cmd: Command) -> Result<Vec<Reply>, ShardError> {
        (0..self.shards.len())
            .map(|shard| self.apply(shard, cmd.clone()))
            .collect()
    }

    fn exec(&mut self) -> Result<Reply, ShardError> {
        let (watched, queued) = self.session.take_transaction();
        let keys = watched
            .keys()
            .map(Vec::as_slice)
            .chain(queued.iter().flat_map(|cmd| cmd.keys()));
        let shard = self.common_shard(keys, "EXEC")?;
        let broker = &self.broker;
        Ok(self.shards[shard]
            .exec(&watched, queued, &|channel, message| broker.publish(channel, message))
            .map_or(Reply::Nil, Reply::Array))
    }
}

impl Connection for ShardedConnection {
    type Error = ShardError;
    type Subscriber = ShardedSubscriber;

    fn call(&mut self, cmd: Command) -> Result<Reply, ShardError> {
        if self.slot.is_closed() {
            return Err(ShardError::Connection(MemoryError::Closed));
        }
        let shards = &self.shards;
        let cmd = match self
            .session
            .intercept(cmd, |key| shards[shard_index(key, shards.len())].version(key))
            .map_err(ShardError::Connection)?
        {
            Ok(reply) => return Ok(reply),
            Err(cmd) => cmd,
        };
        match cmd {
            Command::Exec => self.exec(),
            Command::Publish { channel, message } => {
                Ok(Reply::Int(self.broker.publish(&channel, &message) as i64))
            }
            Command::Del { keys } => self.sum_per_key(keys, |keys| Command::Del { keys }),
            Command::Exists { keys } => self.sum_per_key(keys, |keys| Command::Exists { keys }),
            Command::MGet { keys } => self.mget(keys),
            Command::Scan {
                cursor,
                pattern,
                count,
                kind,
            } => self.scan(cursor, pattern, count, kind),
            Command::DbSize => {
                let total = self
                    .everywhere(Command::DbSize)?
                    .into_iter()
                    .map(|r| if let Reply::Int(n) = r { n } else { 0 })
                    .sum();
                Ok(Reply::Int(total))
            }
            Command::FlushDb => {
                self.everywhere(Command::FlushDb)?;
                Ok(Reply::ok())
            }
            cmd @ Command::Keys { .. } => {
                let mut keys = Vec::new();
                for reply in self.everywhere(cmd)? {
                    if let Reply::Array(items) = reply {
                        keys.extend(items);
                    }
                }
                Ok(Reply::Array(keys))
            }
            cmd => {
                let shard = self.common_shard(cmd.keys(), cmd.name())?;
                self.apply(shard, cmd)
            }
        }
    }

    fn subscribe(&mut self, channels: &[Vec<u8>]) -> Result<ShardedSubscriber, ShardError> {
        if self.slot.is_closed() {
            return Err(ShardError::Connection(MemoryError::Closed));
        }
        Ok(ShardedSubscriber(MemorySubscriber::new(
            self.broker.subscribe(channels),
            self.slot.liveness().clone(),
        )))
    }
}

/// Subscription handle of a [`ShardedConnection`].
#[derive(Debug)]
pub struct ShardedSubscriber(MemorySubscriber);

impl Subscriber for ShardedSubscriber {
    type Error = ShardError;

    fn next_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>, ShardError> {
        self.0.next_message(timeout).map_err(ShardError::Connection)
    }
}
