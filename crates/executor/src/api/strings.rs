//! String commands: plain values and counters.

use std::time::Duration;

use redstone_core::{Decoded, Error, Result, TypeDescriptor};
use redstone_storage::{Backend, Command, Expiry, Reply, SetCondition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Redstone;
use crate::convert;

/// Options for [`Redstone::set_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    expiry: Option<Expiry>,
    condition: Option<SetCondition>,
}

impl SetOptions {
    /// Plain `SET`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire after `ttl`, at millisecond precision.
    pub fn expire_in(mut self, ttl: Duration) -> Self {
        self.expiry = Some(Expiry::Millis(
            u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        ));
        self
    }

    /// Keep the key's current time to live.
    pub fn keep_ttl(mut self) -> Self {
        self.expiry = Some(Expiry::KeepTtl);
        self
    }

    /// Only write if the key does not exist.
    pub fn if_absent(mut self) -> Self {
        self.condition = Some(SetCondition::IfAbsent);
        self
    }

    /// Only write if the key already exists.
    pub fn if_present(mut self) -> Self {
        self.condition = Some(SetCondition::IfPresent);
        self
    }
}

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // String Operations (20)
    // =========================================================================

    /// Store an encoded value, replacing any previous value and expiry.
    pub fn set<T: Serialize + ?Sized>(&self, key: impl AsRef<[u8]>, value: &T) -> Result<()> {
        let value = self.encode(value)?;
        self.set_raw(key, value)
    }

    /// Store bytes as-is, without encoding.
    pub fn set_raw(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        let cmd = Command::Set {
            key: self.key(key),
            value: value.as_ref().to_vec(),
            expiry: None,
            condition: None,
            get: false,
        };
        convert::ok("SET", self.call(cmd)?)
    }

    /// Store an encoded value with an expiry and/or an existence condition.
    ///
    /// Returns `false` when the condition prevented the write.
    pub fn set_with<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        value: &T,
        options: SetOptions,
    ) -> Result<bool> {
        let cmd = Command::Set {
            key: self.key(key),
            value: self.encode(value)?,
            expiry: options.expiry,
            condition: options.condition,
            get: false,
        };
        match self.call(cmd)? {
            Reply::Nil => Ok(false),
            other => convert::ok("SET", other).map(|()| true),
        }
    }

    /// Store only if the key does not exist.
    pub fn setnx<T: Serialize + ?Sized>(&self, key: impl AsRef<[u8]>, value: &T) -> Result<bool> {
        self.set_with(key, value, SetOptions::new().if_absent())
    }

    /// Read and decode a value. `None` if the key is missing.
    pub fn get<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let raw = self.get_raw(key)?;
        self.decode_opt(raw)
    }

    /// Read stored bytes without decoding.
    pub fn get_raw(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        let cmd = Command::Get { key: self.key(key) };
        convert::opt_bulk("GET", self.call(cmd)?)
    }

    /// Read a value and decode it against a runtime descriptor.
    pub fn get_as(
        &self,
        key: impl AsRef<[u8]>,
        descriptor: &TypeDescriptor,
    ) -> Result<Option<Decoded>> {
        let raw = self.get_raw(key)?;
        self.decode_opt_as(raw, descriptor)
    }

    /// Replace a value and return the previous one.
    pub fn getset<T: Serialize + DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<Option<T>> {
        let cmd = Command::GetSet {
            key: self.key(key),
            value: self.encode(value)?,
        };
        let previous = convert::opt_bulk("GETSET", self.call(cmd)?)?;
        self.decode_opt(previous)
    }

    /// Read several keys in one round trip.
    ///
    /// Each element decodes independently: a malformed payload yields an
    /// `Err` in its own slot only.
    pub fn mget<T: DeserializeOwned, K: AsRef<[u8]>>(
        &self,
        keys: &[K],
    ) -> Result<Vec<Result<Option<T>>>> {
        let raw = self.mget_raw(keys)?;
        Ok(self.decode_each_opt(raw))
    }

    /// Byte form of [`mget`](Self::mget).
    pub fn mget_raw<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Option<Vec<u8>>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let cmd = Command::MGet {
            keys: self.key_list(keys),
        };
        convert::opt_bulks("MGET", self.call(cmd)?)
    }

    /// Write several keys in one round trip.
    pub fn mset<K: AsRef<[u8]>, T: Serialize>(&self, pairs: &[(K, T)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let cmd = Command::MSet {
            pairs: self.encode_pairs(pairs)?,
        };
        convert::ok("MSET", self.call(cmd)?)
    }

    /// Write several keys only if none of them exist.
    ///
    /// An empty batch returns `true` without a round trip: no key existed.
    pub fn msetnx<K: AsRef<[u8]>, T: Serialize>(&self, pairs: &[(K, T)]) -> Result<bool> {
        if pairs.is_empty() {
            return Ok(true);
        }
        let cmd = Command::MSetNx {
            pairs: self.encode_pairs(pairs)?,
        };
        convert::boolean("MSETNX", self.call(cmd)?)
    }

    /// Increment an integer value by one.
    pub fn incr(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        self.incr_by(key, 1)
    }

    /// Increment an integer value. Missing keys start at zero.
    pub fn incr_by(&self, key: impl AsRef<[u8]>, delta: i64) -> Result<i64> {
        let cmd = Command::IncrBy {
            key: self.key(key),
            delta,
        };
        convert::int("INCRBY", self.call(cmd)?)
    }

    /// Decrement an integer value by one.
    pub fn decr(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        self.decr_by(key, 1)
    }

    /// Decrement an integer value.
    pub fn decr_by(&self, key: impl AsRef<[u8]>, delta: i64) -> Result<i64> {
        let delta = delta.checked_neg().ok_or_else(|| {
            Error::usage(format!("decrement {} cannot be negated", delta))
        })?;
        self.incr_by(key, delta)
    }

    /// Increment a floating point value.
    pub fn incr_by_float(&self, key: impl AsRef<[u8]>, delta: f64) -> Result<f64> {
        let cmd = Command::IncrByFloat {
            key: self.key(key),
            delta,
        };
        convert::double("INCRBYFLOAT", self.call(cmd)?)
    }

    /// Append raw bytes to a value. Returns the new length.
    pub fn append(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::Append {
            key: self.key(key),
            value: value.as_ref().to_vec(),
        };
        convert::int("APPEND", self.call(cmd)?)
    }

    /// Length of the stored bytes; zero if missing.
    pub fn strlen(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::StrLen { key: self.key(key) };
        convert::int("STRLEN", self.call(cmd)?)
    }

    /// Inclusive byte range of a value. Negative offsets count from the end.
    pub fn getrange(&self, key: impl AsRef<[u8]>, start: i64, end: i64) -> Result<Vec<u8>> {
        let cmd = Command::GetRange {
            key: self.key(key),
            start,
            end,
        };
        convert::bulk("GETRANGE", self.call(cmd)?)
    }

    fn encode_pairs<K: AsRef<[u8]>, T: Serialize>(
        &self,
        pairs: &[(K, T)],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        pairs
            .iter()
            .map(|(key, value)| Ok((self.key(key), self.encode(value)?)))
            .collect()
    }
}
