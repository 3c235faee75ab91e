//! Backend abstraction
//!
//! A [`Backend`] hands out [`Connection`]s; the executor leases one per unit
//! of work and returns it through [`Backend::release`] on every exit path.
//!
//! Backend-native errors stay inside this boundary. [`Backend::translate`]
//! maps them onto the closed [`redstone_core::Error`] taxonomy before they
//! reach a caller.

use std::time::Duration;

use crate::command::Command;
use crate::pubsub::Message;
use crate::reply::Reply;

/// A source of connections to a store.
pub trait Backend: Send + Sync + 'static {
    /// Connection handed out by [`Backend::connect`]
    type Connection: Connection<Error = Self::Error>;

    /// Backend-native failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Acquire a connection.
    fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Return a connection acquired from this backend.
    fn release(&self, conn: Self::Connection);

    /// Map a backend-native failure onto the public error taxonomy.
    fn translate(&self, err: Self::Error) -> redstone_core::Error;
}

/// One leased connection.
///
/// Connection state (watched keys, an open `MULTI` queue) lives here and is
/// discarded when the connection is released.
pub trait Connection: Send {
    /// Backend-native failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Subscription handle returned by [`Connection::subscribe`]
    type Subscriber: Subscriber<Error = Self::Error>;

    /// Send one command and wait for its reply.
    fn call(&mut self, cmd: Command) -> Result<Reply, Self::Error>;

    /// Subscribe to `channels`.
    fn subscribe(&mut self, channels: &[Vec<u8>]) -> Result<Self::Subscriber, Self::Error>;
}

/// Receiving end of a channel subscription. Dropping it unsubscribes.
pub trait Subscriber: Send {
    /// Backend-native failure
    type Error: std::error::Error + Send + Sync + 'static;

    /// Wait for the next message.
    ///
    /// `None` timeout waits indefinitely. Returns `Ok(None)` when the timeout
    /// elapses with no message.
    fn next_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>, Self::Error>;
}
