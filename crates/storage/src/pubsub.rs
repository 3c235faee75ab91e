//! Publish/subscribe broker shared by all connections of a backend.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::error::MemoryError;

const POLL_SLICE: Duration = Duration::from_millis(20);

/// A message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Channel the message was published on
    pub channel: Vec<u8>,
    /// Message body
    pub payload: Vec<u8>,
}

/// Channel registry.
#[derive(Debug, Default)]
pub struct Broker {
    channels: DashMap<Vec<u8>, Vec<(u64, Sender<Message>)>>,
    next_id: AtomicU64,
}

impl Broker {
    /// An empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every subscriber of `channel`.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, channel: &[u8], payload: &[u8]) -> usize {
        let Some(mut subscribers) = self.channels.get_mut(channel) else {
            return 0;
        };
        subscribers.retain(|(_, tx)| {
            tx.send(Message {
                channel: channel.to_vec(),
                payload: payload.to_vec(),
            })
            .is_ok()
        });
        subscribers.len()
    }

    /// Subscribe to `channels` with a fresh receiver.
    ///
    /// A channel listed more than once is registered once.
    pub fn subscribe(self: &Arc<Self>, channels: &[Vec<u8>]) -> Subscription {
        let mut seen = FxHashSet::default();
        let channels: Vec<Vec<u8>> = channels
            .iter()
            .filter(|&channel| seen.insert(channel.as_slice()))
            .cloned()
            .collect();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel();
        for channel in &channels {
            self.channels
                .entry(channel.clone())
                .or_default()
                .push((id, tx.clone()));
        }
        tracing::debug!(
            target: "redstone::storage",
            id,
            channels = channels.len(),
            "subscribed"
        );
        Subscription {
            broker: Arc::clone(self),
            id,
            channels,
            rx,
        }
    }

    /// Number of live subscriptions on `channel`.
    pub fn subscribers(&self, channel: &[u8]) -> usize {
        self.channels.get(channel).map_or(0, |subs| subs.len())
    }

    fn unsubscribe(&self, id: u64, channels: &[Vec<u8>]) {
        for channel in channels {
            if let Some(mut subscribers) = self.channels.get_mut(channel) {
                subscribers.retain(|(sub, _)| *sub != id);
            }
            self.channels.remove_if(channel, |_, subs| subs.is_empty());
        }
    }
}

/// A live subscription. Dropping it unsubscribes from every channel.
#[derive(Debug)]
pub struct Subscription {
    broker: Arc<Broker>,
    id: u64,
    channels: Vec<Vec<u8>>,
    rx: Receiver<Message>,
}

impl Subscription {
    /// Channels this subscription listens on.
    pub fn channels(&self) -> &[Vec<u8>] {
        &self.channels
    }

    /// Wait for the next message, polling `is_closed` between short waits.
    pub fn recv(
        &self,
        timeout: Option<Duration>,
        is_closed: &dyn Fn() -> bool,
    ) -> Result<Option<Message>, MemoryError> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if is_closed() {
                return Err(MemoryError::Closed);
            }
            let slice = match deadline {
                Some(d) => {
                    let now = Instant::now();
                    if d <= now {
                        return Ok(None);
                    }
                    (d - now).min(POLL_SLICE)
                }
                None => POLL_SLICE,
            };
            match self.rx.recv_timeout(slice) {
                Ok(message) => return Ok(Some(message)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(MemoryError::Closed),
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broker.unsubscribe(self.id, &self.channels);
    }
}
