//! List commands, including the blocking pops.
//!
//! Blocking calls take `Option<Duration>`; `None` or a zero duration waits
//! until data arrives or the connection is closed by the backend.
//!
//! Pops and moves remove the element before it is decoded. A payload that
//! fails to decode is returned as an error and is no longer in the list; the
//! `_raw` forms never lose an element this way.

use std::time::Duration;

use redstone_core::{Error, Result};
use redstone_storage::{Backend, Command, End, Reply};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{timeout_ms, Redstone};
use crate::convert;

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // List Operations (20)
    // =========================================================================

    /// Push encoded values onto the head, in order. Returns the new length.
    pub fn lpush<T: Serialize>(&self, key: impl AsRef<[u8]>, values: &[T]) -> Result<i64> {
        let values = self.encode_all(values)?;
        self.lpush_raw(key, &values)
    }

    /// Push encoded values onto the tail, in order. Returns the new length.
    pub fn rpush<T: Serialize>(&self, key: impl AsRef<[u8]>, values: &[T]) -> Result<i64> {
        let values = self.encode_all(values)?;
        self.rpush_raw(key, &values)
    }

    /// Push bytes onto the head without encoding.
    pub fn lpush_raw<V: AsRef<[u8]>>(&self, key: impl AsRef<[u8]>, values: &[V]) -> Result<i64> {
        let cmd = Command::LPush {
            key: self.key(key),
            values: values.iter().map(|v| v.as_ref().to_vec()).collect(),
        };
        convert::int("LPUSH", self.call(cmd)?)
    }

    /// Push bytes onto the tail without encoding.
    pub fn rpush_raw<V: AsRef<[u8]>>(&self, key: impl AsRef<[u8]>, values: &[V]) -> Result<i64> {
        let cmd = Command::RPush {
            key: self.key(key),
            values: values.iter().map(|v| v.as_ref().to_vec()).collect(),
        };
        convert::int("RPUSH", self.call(cmd)?)
    }

    /// Pop and decode the head element.
    pub fn lpop<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let raw = self.lpop_raw(key)?;
        self.decode_opt(raw)
    }

    /// Pop the head element's bytes.
    pub fn lpop_raw(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let cmd = Command::LPop {
            key: self.key(key),
            count: None,
        };
        convert::opt_bulk("LPOP", self.call(cmd)?)
    }

    /// Pop and decode the tail element.
    pub fn rpop<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let raw = self.rpop_raw(key)?;
        self.decode_opt(raw)
    }

    /// Pop the tail element's bytes.
    pub fn rpop_raw(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let cmd = Command::RPop {
            key: self.key(key),
            count: None,
        };
        convert::opt_bulk("RPOP", self.call(cmd)?)
    }

    /// List length; zero if missing.
    pub fn llen(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::LLen { key: self.key(key) };
        convert::int("LLEN", self.call(cmd)?)
    }

    /// Inclusive range of elements, each decoded independently.
    pub fn lrange<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Result<T>>> {
        let raw = self.lrange_raw(key, start, stop)?;
        Ok(self.decode_each(raw))
    }

    /// Inclusive range of elements as stored bytes.
    pub fn lrange_raw(&self, key: impl AsRef<[u8]>, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let cmd = Command::LRange {
            key: self.key(key),
            start,
            stop,
        };
        convert::bulks("LRANGE", self.call(cmd)?)
    }

    /// Element at `index`; negative indexes count from the tail.
    pub fn lindex<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        index: i64,
    ) -> Result<Option<T>> {
        let cmd = Command::LIndex {
            key: self.key(key),
            index,
        };
        let raw = convert::opt_bulk("LINDEX", self.call(cmd)?)?;
        self.decode_opt(raw)
    }

    /// Index of the first element equal to the encoded `value`.
    pub fn lpos<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<Option<i64>> {
        let cmd = Command::LPos {
            key: self.key(key),
            value: self.encode(value)?,
        };
        convert::opt_int("LPOS", self.call(cmd)?)
    }

    /// Overwrite the element at `index`.
    pub fn lset<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        index: i64,
        value: &T,
    ) -> Result<()> {
        let cmd = Command::LSet {
            key: self.key(key),
            index,
            value: self.encode(value)?,
        };
        convert::ok("LSET", self.call(cmd)?)
    }

    /// Remove up to `count` elements equal to `value`: from the head when
    /// positive, from the tail when negative, all when zero.
    pub fn lrem<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        count: i64,
        value: &T,
    ) -> Result<i64> {
        let cmd = Command::LRem {
            key: self.key(key),
            count,
            value: self.encode(value)?,
        };
        convert::int("LREM", self.call(cmd)?)
    }

    /// Keep only the inclusive range `start..=stop`.
    pub fn ltrim(&self, key: impl AsRef<[u8]>, start: i64, stop: i64) -> Result<()> {
        let cmd = Command::LTrim {
            key: self.key(key),
            start,
            stop,
        };
        convert::ok("LTRIM", self.call(cmd)?)
    }

    /// Atomically move one element between lists. Returns the moved element.
    pub fn lmove<T: DeserializeOwned>(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
        from: End,
        to: End,
    ) -> Result<Option<T>> {
        let raw = self.lmove_raw(source, destination, from, to)?;
        self.decode_opt(raw)
    }

    /// Byte form of [`lmove`](Self::lmove).
    pub fn lmove_raw(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
        from: End,
        to: End,
    ) -> Result<Option<Vec<u8>>> {
        let cmd = Command::LMove {
            source: self.key(source),
            destination: self.key(destination),
            from,
            to,
        };
        convert::opt_bulk("LMOVE", self.call(cmd)?)
    }

    /// Pop from the tail of `source` and push onto the head of `destination`.
    pub fn rpoplpush<T: DeserializeOwned>(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
    ) -> Result<Option<T>> {
        let raw = self.rpoplpush_raw(source, destination)?;
        self.decode_opt(raw)
    }

    /// Byte form of [`rpoplpush`](Self::rpoplpush).
    pub fn rpoplpush_raw(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
    ) -> Result<Option<Vec<u8>>> {
        let cmd = Command::RPopLPush {
            source: self.key(source),
            destination: self.key(destination),
        };
        convert::opt_bulk("RPOPLPUSH", self.call(cmd)?)
    }

    /// Pop the head of the first non-empty list, waiting up to `timeout`.
    ///
    /// Returns the key it came from (prefix removed) and the element, or
    /// `None` when the timeout elapsed.
    pub fn blpop<T: DeserializeOwned, K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout: Option<Duration>,
    ) -> Result<Option<(String, T)>> {
        let popped = self.blpop_raw(keys, timeout)?;
        self.decode_popped("BLPOP", popped)
    }

    /// Byte form of [`blpop`](Self::blpop): the key (prefix removed) and the
    /// element as stored.
    pub fn blpop_raw<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout: Option<Duration>,
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let cmd = Command::BLPop {
            keys: self.key_list(keys),
            timeout_ms: timeout_ms(timeout),
        };
        self.popped("BLPOP", self.call(cmd)?)
    }

    /// Pop the tail of the first non-empty list, waiting up to `timeout`.
    pub fn brpop<T: DeserializeOwned, K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout: Option<Duration>,
    ) -> Result<Option<(String, T)>> {
        let popped = self.brpop_raw(keys, timeout)?;
        self.decode_popped("BRPOP", popped)
    }

    /// Byte form of [`brpop`](Self::brpop).
    pub fn brpop_raw<K: AsRef<[u8]>>(
        &self,
        keys: &[K],
        timeout: Option<Duration>,
    ) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let cmd = Command::BRPop {
            keys: self.key_list(keys),
            timeout_ms: timeout_ms(timeout),
        };
        self.popped("BRPOP", self.call(cmd)?)
    }

    /// Blocking [`lmove`](Self::lmove).
    pub fn blmove<T: DeserializeOwned>(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
        from: End,
        to: End,
        timeout: Option<Duration>,
    ) -> Result<Option<T>> {
        let raw = self.blmove_raw(source, destination, from, to, timeout)?;
        self.decode_opt(raw)
    }

    /// Byte form of [`blmove`](Self::blmove).
    pub fn blmove_raw(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
        from: End,
        to: End,
        timeout: Option<Duration>,
    ) -> Result<Option<Vec<u8>>> {
        let cmd = Command::BLMove {
            source: self.key(source),
            destination: self.key(destination),
            from,
            to,
            timeout_ms: timeout_ms(timeout),
        };
        convert::opt_bulk("BLMOVE", self.call(cmd)?)
    }

    fn popped(&self, cmd: &str, reply: Reply) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        let Some(items) = convert::opt_array(cmd, reply)? else {
            return Ok(None);
        };
        let mut items = items.into_iter();
        match (items.next(), items.next(), items.next()) {
            (Some(Reply::Bulk(key)), Some(Reply::Bulk(value)), None) => {
                Ok(Some((self.strip(key), value)))
            }
            (key, value, _) => Err(Error::unexpected_reply(cmd, (key, value))),
        }
    }

    fn decode_popped<T: DeserializeOwned>(
        &self,
        cmd: &str,
        popped: Option<(Vec<u8>, Vec<u8>)>,
    ) -> Result<Option<(String, T)>> {
        popped
            .map(|(key, value)| Ok((convert::text(cmd, key)?, self.decode(&value)?)))
            .transpose()
    }
}
