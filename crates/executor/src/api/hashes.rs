//! Hash commands.
//!
//! Field names are never prefixed; only the hash key is namespaced.

use redstone_core::{CursorToken, Decoded, Result, Scan, ScanPage, ScanParams, TypeDescriptor};
use redstone_storage::{Backend, Command};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Redstone;
use crate::convert;

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Hash Operations (17)
    // =========================================================================

    /// Set one field. Returns `true` if the field is new.
    pub fn hset<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<bool> {
        let value = self.encode(value)?;
        self.hset_raw(key, field, value)
    }

    /// Set one field to bytes as-is.
    pub fn hset_raw(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<bool> {
        let cmd = Command::HSet {
            key: self.key(key),
            fields: vec![(field.as_ref().to_vec(), value.as_ref().to_vec())],
        };
        convert::boolean("HSET", self.call(cmd)?)
    }

    /// Set several fields. Returns how many were new.
    pub fn hmset<F: AsRef<[u8]>, T: Serialize>(
        &self,
        key: impl AsRef<[u8]>,
        fields: &[(F, T)],
    ) -> Result<i64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let fields = fields
            .iter()
            .map(|(field, value)| Ok((field.as_ref().to_vec(), self.encode(value)?)))
            .collect::<Result<Vec<_>>>()?;
        let cmd = Command::HSet {
            key: self.key(key),
            fields,
        };
        convert::int("HSET", self.call(cmd)?)
    }

    /// Set a field only if it does not exist.
    pub fn hsetnx<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        value: &T,
    ) -> Result<bool> {
        let cmd = Command::HSetNx {
            key: self.key(key),
            field: field.as_ref().to_vec(),
            value: self.encode(value)?,
        };
        convert::boolean("HSETNX", self.call(cmd)?)
    }

    /// Read and decode one field.
    pub fn hget<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
    ) -> Result<Option<T>> {
        let raw = self.hget_raw(key, field)?;
        self.decode_opt(raw)
    }

    /// Read one field's bytes without decoding.
    pub fn hget_raw(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
    ) -> Result<Option<Vec<u8>>> {
        let cmd = Command::HGet {
            key: self.key(key),
            field: field.as_ref().to_vec(),
        };
        convert::opt_bulk("HGET", self.call(cmd)?)
    }

    /// Read one field and decode it against a runtime descriptor.
    pub fn hget_as(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        descriptor: &TypeDescriptor,
    ) -> Result<Option<Decoded>> {
        let raw = self.hget_raw(key, field)?;
        self.decode_opt_as(raw, descriptor)
    }

    /// Read several fields; each slot decodes independently.
    pub fn hmget<T: DeserializeOwned, F: AsRef<[u8]>>(
        &self,
        key: impl AsRef<[u8]>,
        fields: &[F],
    ) -> Result<Vec<Result<Option<T>>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let cmd = Command::HMGet {
            key: self.key(key),
            fields: fields.iter().map(|f| f.as_ref().to_vec()).collect(),
        };
        let raw = convert::opt_bulks("HMGET", self.call(cmd)?)?;
        Ok(self.decode_each_opt(raw))
    }

    /// Every field with its decoded value.
    ///
    /// Field names must be UTF-8; values decode independently.
    pub fn hgetall<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
    ) -> Result<Vec<(String, Result<T>)>> {
        self.hgetall_raw(key)?
            .into_iter()
            .map(|(field, value)| Ok((convert::text("HGETALL", field)?, self.decode(&value))))
            .collect()
    }

    /// Every field with its stored bytes.
    pub fn hgetall_raw(&self, key: impl AsRef<[u8]>) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cmd = Command::HGetAll { key: self.key(key) };
        convert::pairs("HGETALL", self.call(cmd)?, convert::bulk, convert::bulk)
    }

    /// Remove fields. Returns how many existed.
    pub fn hdel<F: AsRef<[u8]>>(&self, key: impl AsRef<[u8]>, fields: &[F]) -> Result<i64> {
        let cmd = Command::HDel {
            key: self.key(key),
            fields: fields.iter().map(|f| f.as_ref().to_vec()).collect(),
        };
        convert::int("HDEL", self.call(cmd)?)
    }

    /// Whether a field exists.
    pub fn hexists(&self, key: impl AsRef<[u8]>, field: impl AsRef<[u8]>) -> Result<bool> {
        let cmd = Command::HExists {
            key: self.key(key),
            field: field.as_ref().to_vec(),
        };
        convert::boolean("HEXISTS", self.call(cmd)?)
    }

    /// Number of fields.
    pub fn hlen(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::HLen { key: self.key(key) };
        convert::int("HLEN", self.call(cmd)?)
    }

    /// Field names. Fails as a whole if any name is not UTF-8.
    pub fn hkeys(&self, key: impl AsRef<[u8]>) -> Result<Vec<String>> {
        let cmd = Command::HKeys { key: self.key(key) };
        convert::bulks("HKEYS", self.call(cmd)?)?
            .into_iter()
            .map(|field| convert::text("HKEYS", field))
            .collect()
    }

    /// Field values, each decoded independently.
    pub fn hvals<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Vec<Result<T>>> {
        let cmd = Command::HVals { key: self.key(key) };
        let raw = convert::bulks("HVALS", self.call(cmd)?)?;
        Ok(self.decode_each(raw))
    }

    /// Increment an integer field.
    pub fn hincr_by(
        &self,
        key: impl AsRef<[u8]>,
        field: impl AsRef<[u8]>,
        delta: i64,
    ) -> Result<i64> {
        let cmd = Command::HIncrBy {
            key: self.key(key),
            field: field.as_ref().to_vec(),
            delta,
        };
        convert::int("HINCRBY", self.call(cmd)?)
    }

    /// Lazily iterate a hash's fields.
    ///
    /// The match pattern applies to field names and is not prefixed.
    pub fn hscan<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        params: ScanParams,
    ) -> Scan<
        (String, Result<T>),
        impl FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<(String, Result<T>)>> + '_,
    > {
        let key = self.key(key);
        Scan::new(params, move |cursor: &CursorToken, params: &ScanParams| {
            let cmd = Command::HScan {
                key: key.clone(),
                cursor: cursor.as_str().to_string(),
                pattern: params.pattern.as_ref().map(|p| p.as_bytes().to_vec()),
                count: params.count,
            };
            let (next, items) = convert::scan("HSCAN", self.call(cmd)?)?;
            let fields = convert::pairs("HSCAN", items, convert::bulk, convert::bulk)?
                .into_iter()
                .map(|(field, value)| Ok((convert::text("HSCAN", field)?, self.decode(&value))))
                .collect::<Result<Vec<_>>>()?;
            Ok(ScanPage {
                cursor: next,
                items: fields,
            })
        })
    }
}
