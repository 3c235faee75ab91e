//! Standalone in-memory backend.
//!
//! One shared [`Keyspace`] and [`Broker`]; every connection carries its own
//! transaction session. Test hooks simulate refused connections and a server
//! closing live connections.

use std::sync::Arc;
use std::time::Duration;

use rustc_hash::FxHashMap;

use crate::backend::{Backend, Connection, Subscriber};
use crate::command::Command;
use crate::error::MemoryError;
use crate::keyspace::Keyspace;
use crate::pool::{Liveness, Pool, Slot};
use crate::pubsub::{Broker, Message, Subscription};
use crate::reply::Reply;

/// In-process standalone store.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    keyspace: Arc<Keyspace>,
    broker: Arc<Broker>,
    pool: Arc<Pool>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Unbounded backend with an empty keyspace.
    pub fn new() -> Self {
        Self::with_pool(Pool::new(None))
    }

    /// Backend allowing at most `max` simultaneous connections.
    pub fn with_max_connections(max: usize) -> Self {
        Self::with_pool(Pool::new(Some(max)))
    }

    fn with_pool(pool: Pool) -> Self {
        Self {
            keyspace: Arc::new(Keyspace::new()),
            broker: Arc::new(Broker::new()),
            pool: Arc::new(pool),
        }
    }

    /// Refuse the next `n` connection attempts.
    pub fn fail_next_connects(&self, n: u32) {
        self.pool.refuse_next(n);
    }

    /// Close every connection currently leased.
    ///
    /// Calls in progress (including blocking pops and subscriptions) fail
    /// with [`MemoryError::Closed`]. New connections are unaffected.
    pub fn close_all(&self) {
        tracing::debug!(target: "redstone::storage", backend = "memory", "closing all connections");
        self.pool.close_all();
    }

    /// Number of connections currently leased.
    pub fn active_connections(&self) -> usize {
        self.pool.active()
    }

    /// The underlying keyspace.
    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    /// The pub/sub broker shared by this backend's connections.
    pub fn broker(&self) -> &Broker {
        &self.broker
    }
}

impl Backend for MemoryBackend {
    type Connection = MemoryConnection;
    type Error = MemoryError;

    fn name(&self) -> &'static str {
        "memory"
    }

    fn connect(&self) -> Result<MemoryConnection, MemoryError> {
        let slot = self.pool.acquire()?;
        Ok(MemoryConnection {
            keyspace: Arc::clone(&self.keyspace),
            broker: Arc::clone(&self.broker),
            slot,
            session: Session::default(),
        })
    }

    fn release(&self, conn: MemoryConnection) {
        if conn.session.in_multi() {
            tracing::debug!(target: "redstone::storage", "discarding open transaction on release");
        }
        drop(conn);
    }

    fn translate(&self, err: MemoryError) -> redstone_core::Error {
        err.into()
    }
}

/// Per-connection `WATCH`/`MULTI` state.
#[derive(Debug, Default)]
pub(crate) struct Session {
    watched: FxHashMap<Vec<u8>, u64>,
    queue: Option<Vec<Command>>,
}

impl Session {
    pub(crate) fn in_multi(&self) -> bool {
        self.queue.is_some()
    }

    /// Handle transaction control and queueing.
    ///
    /// Returns `Ok(Err(cmd))` when the command must be executed directly.
    /// `version` reads a key's current version for `WATCH`.
    pub(crate) fn intercept(
        &mut self,
        cmd: Command,
        version: impl Fn(&[u8]) -> u64,
    ) -> Result<Result<Reply, Command>, MemoryError> {
        match cmd {
            Command::Multi => {
                if self.in_multi() {
                    return Err(MemoryError::invalid("MULTI calls can not be nested"));
                }
                self.queue = Some(Vec::new());
                Ok(Ok(Reply::ok()))
            }
            Command::Discard => {
                self.queue
                    .take()
                    .ok_or_else(|| MemoryError::invalid("DISCARD without MULTI"))?;
                self.watched.clear();
                Ok(Ok(Reply::ok()))
            }
            Command::Watch { keys } => {
                if self.in_multi() {
                    return Err(MemoryError::invalid("WATCH inside MULTI is not allowed"));
                }
                for key in keys {
                    let v = version(&key);
                    self.watched.entry(key).or_insert(v);
                }
                Ok(Ok(Reply::ok()))
            }
            Command::Unwatch if !self.in_multi() => {
                self.watched.clear();
                Ok(Ok(Reply::ok()))
            }
            Command::Exec => {
                if !self.in_multi() {
                    return Err(MemoryError::invalid("EXEC without MULTI"));
                }
                Ok(Err(Command::Exec))
            }
            cmd => match self.queue.as_mut() {
                Some(queue) => {
                    queue.push(cmd);
                    Ok(Ok(Reply::queued()))
                }
                None => Ok(Err(cmd)),
            },
        }
    }

    /// Take the watched versions and queued commands for `EXEC`.
    pub(crate) fn take_transaction(&mut self) -> (FxHashMap<Vec<u8>, u64>, Vec<Command>) {
        (
            std::mem::take(&mut self.watched),
            self.queue.take().unwrap_or_default(),
        )
    }
}

/// A leased connection to a [`MemoryBackend`].
#[derive(Debug)]
pub struct MemoryConnection {
    keyspace: Arc<Keyspace>,
    broker: Arc<Broker>,
    slot: Slot,
    session: Session,
}

impl Connection for MemoryConnection {
    type Error = MemoryError;
    type Subscriber = MemorySubscriber;

    fn call(&mut self, cmd: Command) -> Result<Reply, MemoryError> {
        if self.slot.is_closed() {
            return Err(MemoryError::Closed);
        }
        let keyspace = &self.keyspace;
        let cmd = match self.session.intercept(cmd, |key| keyspace.version(key))? {
            Ok(reply) => return Ok(reply),
            Err(cmd) => cmd,
        };
        match cmd {
            Command::Exec => {
                let (watched, queued) = self.session.take_transaction();
                let broker = &self.broker;
                Ok(self
                    .keyspace
                    .exec(&watched, queued, &|channel, message| broker.publish(channel, message))
                    .map_or(Reply::Nil, Reply::Array))
            }
            Command::Publish { channel, message } => {
                Ok(Reply::Int(self.broker.publish(&channel, &message) as i64))
            }
            cmd if cmd.blocking_timeout().is_some() => {
                let liveness = self.slot.liveness();
                self.keyspace.apply_blocking(cmd, &|| liveness.is_closed())
            }
            cmd => self.keyspace.apply(cmd),
        }
    }

    fn subscribe(&mut self, channels: &[Vec<u8>]) -> Result<MemorySubscriber, MemoryError> {
        if self.slot.is_closed() {
            return Err(MemoryError::Closed);
        }
        if self.session.in_multi() {
            return Err(MemoryError::invalid("SUBSCRIBE inside MULTI is not allowed"));
        }
        Ok(MemorySubscriber::new(
            self.broker.subscribe(channels),
            self.slot.liveness().clone(),
        ))
    }
}

/// Subscription handle of the in-process backends.
#[derive(Debug)]
pub struct MemorySubscriber {
    subscription: Subscription,
    liveness: Liveness,
}

impl MemorySubscriber {
    pub(crate) fn new(subscription: Subscription, liveness: Liveness) -> Self {
        Self {
            subscription,
            liveness,
        }
    }
}

impl Subscriber for MemorySubscriber {
    type Error = MemoryError;

    fn next_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>, MemoryError> {
        let liveness = &self.liveness;
        self.subscription.recv(timeout, &|| liveness.is_closed())
    }
}
