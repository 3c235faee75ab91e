//! The Executor - single entry point to a backend.
//!
//! [`Executor::execute`] leases one connection, runs a unit of work against
//! it through a [`Handle`], and returns the connection to the backend on every
//! exit path (success, error or panic). Backend failures are translated by the
//! backend itself, so only [`Error`] ever reaches the unit of work.
//!
//! Nothing is retried except acquiring the connection, which happens strictly
//! before any command reaches the store.

use std::time::Duration;

use redstone_core::{Error, Result};
use redstone_storage::{Backend, Command, Connection, Message, Reply, Subscriber};

use crate::retry::RetryPolicy;

/// Runs units of work against one backend.
///
/// # Thread Safety
///
/// `Executor` is `Send + Sync` whenever the backend is; concurrent callers
/// each lease their own connection.
pub struct Executor<B: Backend> {
    backend: B,
    retry: RetryPolicy,
}

impl<B: Backend> std::fmt::Debug for Executor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("backend", &self.backend.name())
            .field("retry", &self.retry)
            .finish()
    }
}

impl<B: Backend> Executor<B> {
    /// Create an executor that never retries acquisition.
    pub fn new(backend: B) -> Self {
        Self::with_retry(backend, RetryPolicy::no_retry())
    }

    /// Create an executor with an acquisition retry policy.
    pub fn with_retry(backend: B, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// The bound backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The acquisition retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Run `work` on a freshly leased connection.
    ///
    /// `work` runs exactly once. The connection is released when this call
    /// returns, whatever the outcome.
    pub fn execute<R, F>(&self, work: F) -> Result<R>
    where
        F: FnOnce(&mut Handle<'_, B>) -> Result<R>,
    {
        let conn = self.acquire()?;
        let mut handle = Handle {
            backend: &self.backend,
            conn: Some(conn),
        };
        work(&mut handle)
    }

    /// Shorthand for a unit of work that sends exactly one command.
    pub fn call(&self, cmd: Command) -> Result<Reply> {
        self.execute(|handle| handle.call(cmd))
    }

    fn acquire(&self) -> Result<B::Connection> {
        let mut attempt = 0;
        loop {
            let err = match self.backend.connect() {
                Ok(conn) => {
                    if attempt > 0 {
                        tracing::debug!(
                            target: "redstone::executor",
                            backend = self.backend.name(),
                            attempts = attempt + 1,
                            "connection acquired after retry"
                        );
                    }
                    return Ok(conn);
                }
                Err(e) => self.backend.translate(e),
            };
            if !err.is_retryable() || attempt >= self.retry.max_retries() {
                return Err(err);
            }
            let delay = self.retry.delay(attempt);
            tracing::warn!(
                target: "redstone::executor",
                backend = self.backend.name(),
                attempt = attempt + 1,
                max_attempts = self.retry.max_retries() + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "connection acquisition failed, retrying after backoff"
            );
            std::thread::sleep(delay);
            attempt += 1;
        }
    }
}

/// A leased connection, valid for one unit of work.
///
/// Dropping the handle returns the connection to the backend.
pub struct Handle<'a, B: Backend> {
    backend: &'a B,
    conn: Option<B::Connection>,
}

impl<'a, B: Backend> Handle<'a, B> {
    fn conn(&mut self) -> Result<&mut B::Connection> {
        self.conn
            .as_mut()
            .ok_or_else(|| Error::connection("connection already released"))
    }

    /// Send one command and wait for its reply.
    pub fn call(&mut self, cmd: Command) -> Result<Reply> {
        let name = cmd.name();
        tracing::debug!(
            target: "redstone::executor",
            command = name,
            backend = self.backend.name(),
            "executing command"
        );
        let backend = self.backend;
        self.conn()?.call(cmd).map_err(|e| {
            let err = backend.translate(e);
            tracing::debug!(
                target: "redstone::executor",
                command = name,
                error = %err,
                "command failed"
            );
            err
        })
    }

    /// Subscribe this connection to `channels`.
    pub fn subscribe(&mut self, channels: &[Vec<u8>]) -> Result<HandleSubscriber<'a, B>> {
        let backend = self.backend;
        let inner = self
            .conn()?
            .subscribe(channels)
            .map_err(|e| backend.translate(e))?;
        Ok(HandleSubscriber { backend, inner })
    }
}

impl<B: Backend> Drop for Handle<'_, B> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.backend.release(conn);
        }
    }
}

/// A subscription opened through a [`Handle`], with translated errors.
pub struct HandleSubscriber<'a, B: Backend> {
    backend: &'a B,
    inner: <B::Connection as Connection>::Subscriber,
}

impl<B: Backend> HandleSubscriber<'_, B> {
    /// Wait for the next message; `Ok(None)` when `timeout` elapses first.
    pub fn next_message(&mut self, timeout: Option<Duration>) -> Result<Option<Message>> {
        self.inner
            .next_message(timeout)
            .map_err(|e| self.backend.translate(e))
    }
}
