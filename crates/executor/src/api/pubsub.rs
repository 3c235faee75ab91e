//! Publish/subscribe.
//!
//! Channel names are not namespaced: a channel is shared by every client of
//! the store regardless of key prefix.

use std::ops::ControlFlow;
use std::time::Duration;

use redstone_core::Result;
use redstone_storage::{Backend, Command, Message};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Redstone;
use crate::convert;

/// One event delivered to a [`Redstone::subscribe`] listener.
#[derive(Debug)]
pub enum Received<T> {
    /// A published message; the payload decodes independently per message.
    Message {
        /// Channel it was published on
        channel: String,
        /// Decoded payload
        payload: Result<T>,
    },
    /// No message arrived within the configured wait.
    Timeout,
}

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Pub/Sub Operations (4)
    // =========================================================================

    /// Publish an encoded message. Returns how many subscribers received it.
    pub fn publish<T: Serialize + ?Sized>(
        &self,
        channel: impl AsRef<[u8]>,
        message: &T,
    ) -> Result<i64> {
        let message = self.encode(message)?;
        self.publish_raw(channel, message)
    }

    /// Publish bytes as-is.
    pub fn publish_raw(&self, channel: impl AsRef<[u8]>, message: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::Publish {
            channel: channel.as_ref().to_vec(),
            message: message.as_ref().to_vec(),
        };
        convert::int("PUBLISH", self.call(cmd)?)
    }

    /// Subscribe to `channels` and feed every message to `listener` until it
    /// returns [`ControlFlow::Break`].
    ///
    /// With `timeout` set, `listener` also receives [`Received::Timeout`]
    /// whenever that long passes without a message. `None` or zero waits
    /// indefinitely. The subscription holds one connection for its whole
    /// lifetime; closing the backend's connections ends it with a connection
    /// error.
    pub fn subscribe<T, C, F>(
        &self,
        channels: &[C],
        timeout: Option<Duration>,
        mut listener: F,
    ) -> Result<()>
    where
        T: DeserializeOwned,
        C: AsRef<[u8]>,
        F: FnMut(Received<T>) -> ControlFlow<()>,
    {
        self.subscribe_raw(channels, timeout, |message| {
            let event = match message {
                Some(Message { channel, payload }) => Received::Message {
                    channel: String::from_utf8_lossy(&channel).into_owned(),
                    payload: self.decode(&payload),
                },
                None => Received::Timeout,
            };
            listener(event)
        })
    }

    /// Byte form of [`subscribe`](Self::subscribe); `None` marks a timeout.
    pub fn subscribe_raw<C, F>(
        &self,
        channels: &[C],
        timeout: Option<Duration>,
        mut listener: F,
    ) -> Result<()>
    where
        C: AsRef<[u8]>,
        F: FnMut(Option<Message>) -> ControlFlow<()>,
    {
        let channels: Vec<Vec<u8>> = channels.iter().map(|c| c.as_ref().to_vec()).collect();
        let timeout = timeout.filter(|t| !t.is_zero());
        self.execute(|handle| {
            let mut subscriber = handle.subscribe(&channels)?;
            tracing::debug!(
                target: "redstone::executor",
                channels = channels.len(),
                "subscription open"
            );
            loop {
                let message = subscriber.next_message(timeout)?;
                if message.is_none() && timeout.is_none() {
                    continue;
                }
                if listener(message).is_break() {
                    return Ok(());
                }
            }
        })
    }
}
