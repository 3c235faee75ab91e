//! Optimistic transactions (`WATCH` / `MULTI` / `EXEC`).
//!
//! A transaction runs inside one unit of work, so every command travels on
//! the same connection:
//!
//! ```text
//! WATCH keys ──▶ closure (reads run now, writes are buffered)
//!                   │
//!          Ok ──────┴────── Err ──▶ UNWATCH, error returned
//!           │
//!           ▼
//!        MULTI ──▶ buffered writes (each QUEUED) ──▶ EXEC
//!                        │                            │
//!              rejected ─┴─▶ DISCARD, error     Nil ──┴──▶ Ok(None)
//! ```
//!
//! `EXEC` replying nil means a watched key changed after `WATCH`; no write was
//! applied and the caller may run the transaction again.

use redstone_core::{Error, Result};
use redstone_storage::{Backend, Command, Reply};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Redstone;
use crate::convert;
use crate::executor::Handle;

/// Write buffer and read access inside [`Redstone::transaction`].
///
/// Keys and values go through the facade's codecs exactly as for the
/// single-command methods.
pub struct Transaction<'t, 'a, B: Backend> {
    db: &'t Redstone<B>,
    handle: &'t mut Handle<'a, B>,
    queued: Vec<Command>,
}

impl<'t, 'a, B: Backend> Transaction<'t, 'a, B> {
    // ==================== Reads (run immediately) ====================

    /// Read and decode a value now, outside the atomic block.
    pub fn get<T: DeserializeOwned>(&mut self, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let raw = self.get_raw(key)?;
        self.db.decode_opt(raw)
    }

    /// Read stored bytes now.
    pub fn get_raw(&mut self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let cmd = Command::Get {
            key: self.db.key(key),
        };
        convert::opt_bulk("GET", self.handle.call(cmd)?)
    }

    /// Count existing keys now.
    pub fn exists<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> Result<i64> {
        let cmd = Command::Exists {
            keys: self.db.key_list(keys),
        };
        convert::int("EXISTS", self.handle.call(cmd)?)
    }

    /// Read and decode a hash field now.
    pub fn hget<T: DeserializeOwned>(
        &mut self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
    ) -> Result<Option<T>> {
        let cmd = Command::HGet {
            key: self.db.key(key),
            field: field.as_ref().to_vec(),
        };
        let raw = convert::opt_bulk("HGET", self.handle.call(cmd)?)?;
        self.db.decode_opt(raw)
    }

    /// Send a prebuilt read command now. Keys are sent as given.
    pub fn call(&mut self, cmd: Command) -> Result<Reply> {
        if cmd.is_transaction_control() {
            return Err(Error::usage(format!(
                "{} cannot be sent inside a transaction",
                cmd.name()
            )));
        }
        self.handle.call(cmd)
    }

    // ==================== Writes (buffered until EXEC) ====================

    /// Buffer a prebuilt command. Keys are sent as given.
    pub fn queue(&mut self, cmd: Command) -> Result<()> {
        if cmd.is_transaction_control() {
            return Err(Error::usage(format!(
                "{} cannot be queued inside a transaction",
                cmd.name()
            )));
        }
        self.queued.push(cmd);
        Ok(())
    }

    /// Buffer `SET` of an encoded value.
    pub fn set<T: Serialize + ?Sized>(&mut self, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
        let value = self.db.encode(value)?;
        self.set_raw(key, value)
    }

    /// Buffer `SET` of bytes as-is.
    pub fn set_raw(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let cmd = Command::Set {
            key: self.db.key(key),
            value: value.as_ref().to_vec(),
            expiry: None,
            condition: None,
            get: false,
        };
        self.queue(cmd)
    }

    /// Buffer `DEL`.
    pub fn del<K: AsRef<[u8]>>(&mut self, keys: &[K]) -> Result<()> {
        let cmd = Command::Del {
            keys: self.db.key_list(keys),
        };
        self.queue(cmd)
    }

    /// Buffer `INCRBY`.
    pub fn incr_by(&mut self, key: impl AsRef<[u8]>, delta: i64) -> Result<()> {
        let cmd = Command::IncrBy {
            key: self.db.key(key),
            delta,
        };
        self.queue(cmd)
    }

    /// Buffer `EXPIRE` in whole seconds.
    pub fn expire(&mut self, key: impl AsRef<[u8]>, ttl: std::time::Duration) -> Result<()> {
        let cmd = Command::Expire {
            key: self.db.key(key),
            seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        };
        self.queue(cmd)
    }

    /// Buffer `HSET` of one encoded field.
    pub fn hset<T: Serialize + ?Sized>(
        &mut self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<()> {
        let cmd = Command::HSet {
            key: self.db.key(key),
            fields: vec![(field.as_ref().to_vec(), self.db.encode(value)?)],
        };
        self.queue(cmd)
    }

    /// Buffer `LPUSH` of encoded values.
    pub fn lpush<T: Serialize>(&mut self, key: impl AsRef<[u8]>, values: &[T]) -> Result<()> {
        let cmd = Command::LPush {
            key: self.db.key(key),
            values: self.db.encode_all(values)?,
        };
        self.queue(cmd)
    }

    /// Buffer `RPUSH` of encoded values.
    pub fn rpush<T: Serialize>(&mut self, key: impl AsRef<[u8]>, values: &[T]) -> Result<()> {
        let cmd = Command::RPush {
            key: self.db.key(key),
            values: self.db.encode_all(values)?,
        };
        self.queue(cmd)
    }

    /// Buffer `SADD` of encoded members.
    pub fn sadd<T: Serialize>(&mut self, key: impl AsRef<[u8]>, members: &[T]) -> Result<()> {
        let cmd = Command::SAdd {
            key: self.db.key(key),
            members: self.db.encode_all(members)?,
        };
        self.queue(cmd)
    }

    /// Buffer `SREM` of encoded members.
    pub fn srem<T: Serialize>(&mut self, key: impl AsRef<[u8]>, members: &[T]) -> Result<()> {
        let cmd = Command::SRem {
            key: self.db.key(key),
            members: self.db.encode_all(members)?,
        };
        self.queue(cmd)
    }

    /// Buffer `ZADD` of `(score, member)` pairs.
    pub fn zadd<T: Serialize>(
        &mut self,
        key: impl AsRef<[u8]>,
        members: &[(f64, T)],
    ) -> Result<()> {
        let members = members
            .iter()
            .map(|(score, member)| Ok((*score, self.db.encode(member)?)))
            .collect::<Result<Vec<_>>>()?;
        let cmd = Command::ZAdd {
            key: self.db.key(key),
            members,
        };
        self.queue(cmd)
    }

    /// Buffer `PUBLISH`; the message goes out only if the transaction commits.
    pub fn publish<T: Serialize + ?Sized>(
        &mut self,
        channel: impl AsRef<[u8]>,
        message: &T,
    ) -> Result<()> {
        let cmd = Command::Publish {
            channel: channel.as_ref().to_vec(),
            message: self.db.encode(message)?,
        };
        self.queue(cmd)
    }

    /// Number of buffered writes.
    pub fn len(&self) -> usize {
        self.queued.len()
    }

    /// Returns `true` if nothing is buffered yet.
    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }
}

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Transaction Operations (2)
    // =========================================================================

    /// Run `body` as an optimistic transaction guarded by `watch` keys.
    ///
    /// Returns the per-command replies in queue order, or `None` when a
    /// watched key changed and nothing was applied. A command that fails at
    /// `EXEC` time appears as `Reply::Error` in its slot; the others still
    /// apply.
    pub fn transaction<K, F>(&self, watch: &[K], body: F) -> Result<Option<Vec<Reply>>>
    where
        K: AsRef<[u8]>,
        F: FnOnce(&mut Transaction<'_, '_, B>) -> Result<()>,
    {
        let watched = self.key_list(watch);
        self.execute(|handle| {
            let watching = !watched.is_empty();
            if watching {
                convert::ok("WATCH", handle.call(Command::Watch { keys: watched })?)?;
            }

            let mut tx = Transaction {
                db: self,
                handle,
                queued: Vec::new(),
            };
            if let Err(e) = body(&mut tx) {
                if watching {
                    if let Err(cleanup) = tx.handle.call(Command::Unwatch) {
                        tracing::debug!(
                            target: "redstone::executor",
                            error = %cleanup,
                            "UNWATCH after failed transaction body did not complete"
                        );
                    }
                }
                return Err(e);
            }
            let Transaction { handle, queued, .. } = tx;

            convert::ok("MULTI", handle.call(Command::Multi)?)?;
            for cmd in queued {
                let name = cmd.name();
                let failure = match handle.call(cmd) {
                    Ok(reply) if reply == Reply::queued() => continue,
                    Ok(other) => Error::unexpected_reply(name, other),
                    Err(e) => e,
                };
                if let Err(cleanup) = handle.call(Command::Discard) {
                    tracing::debug!(
                        target: "redstone::executor",
                        command = name,
                        error = %cleanup,
                        "DISCARD after rejected queued command did not complete"
                    );
                }
                return Err(failure);
            }

            match handle.call(Command::Exec)? {
                Reply::Nil => {
                    tracing::debug!(
                        target: "redstone::executor",
                        "transaction aborted by watched key change"
                    );
                    Ok(None)
                }
                Reply::Array(replies) => Ok(Some(replies)),
                other => Err(Error::unexpected_reply("EXEC", other)),
            }
        })
    }

    /// Run `body` as an unguarded `MULTI` / `EXEC` block.
    pub fn multi<F>(&self, body: F) -> Result<Vec<Reply>>
    where
        F: FnOnce(&mut Transaction<'_, '_, B>) -> Result<()>,
    {
        let unguarded: &[&[u8]] = &[];
        self.transaction(unguarded, body)?
            .ok_or_else(|| Error::command("EXEC aborted without watched keys"))
    }
}
