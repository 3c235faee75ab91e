//! Generic key commands and key iteration.
//!
//! Patterns passed to [`keys`](Redstone::keys) and [`scan`](Redstone::scan)
//! are scoped to the namespace prefix, and returned keys have the prefix
//! removed, so a prefixed facade only ever sees its own keys.

use std::time::Duration;

use redstone_core::{CursorToken, Result, Scan, ScanPage, ScanParams};
use redstone_storage::{Backend, Command};

use super::Redstone;
use crate::convert;

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Key Operations (15)
    // =========================================================================

    /// Delete keys. Returns how many existed.
    pub fn del<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        let cmd = Command::Del {
            keys: self.key_list(keys),
        };
        convert::int("DEL", self.call(cmd)?)
    }

    /// Count how many of `keys` exist. Duplicates are counted each time.
    pub fn exists<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        let cmd = Command::Exists {
            keys: self.key_list(keys),
        };
        convert::int("EXISTS", self.call(cmd)?)
    }

    /// Set a timeout in whole seconds. Returns `false` if the key is missing.
    pub fn expire(&self, key: impl AsRef<[u8]>, ttl: Duration) -> Result<bool> {
        let cmd = Command::Expire {
            key: self.key(key),
            seconds: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        };
        convert::boolean("EXPIRE", self.call(cmd)?)
    }

    /// Set a timeout in milliseconds. Returns `false` if the key is missing.
    pub fn pexpire(&self, key: impl AsRef<[u8]>, ttl: Duration) -> Result<bool> {
        let cmd = Command::PExpire {
            key: self.key(key),
            millis: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        };
        convert::boolean("PEXPIRE", self.call(cmd)?)
    }

    /// Remaining time to live in seconds; `-1` without expiry, `-2` if missing.
    pub fn ttl(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::Ttl { key: self.key(key) };
        convert::int("TTL", self.call(cmd)?)
    }

    /// Remaining time to live in milliseconds; `-1` without expiry, `-2` if missing.
    pub fn pttl(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::PTtl { key: self.key(key) };
        convert::int("PTTL", self.call(cmd)?)
    }

    /// Remove the timeout. Returns `true` if one was removed.
    pub fn persist(&self, key: impl AsRef<[u8]>) -> Result<bool> {
        let cmd = Command::Persist { key: self.key(key) };
        convert::boolean("PERSIST", self.call(cmd)?)
    }

    /// Type name of the stored value: `"none"`, `"string"`, `"hash"`,
    /// `"list"`, `"set"` or `"zset"`.
    pub fn key_type(&self, key: impl AsRef<[u8]>) -> Result<String> {
        let cmd = Command::Type { key: self.key(key) };
        convert::status("TYPE", self.call(cmd)?)
    }

    /// Rename a key, overwriting `new_key`.
    pub fn rename(&self, key: impl AsRef<[u8]>, new_key: impl AsRef<[u8]>) -> Result<()> {
        let cmd = Command::Rename {
            key: self.key(key),
            new_key: self.key(new_key),
        };
        convert::ok("RENAME", self.call(cmd)?)
    }

    /// Rename a key only if `new_key` does not exist.
    pub fn renamenx(&self, key: impl AsRef<[u8]>, new_key: impl AsRef<[u8]>) -> Result<bool> {
        let cmd = Command::RenameNx {
            key: self.key(key),
            new_key: self.key(new_key),
        };
        convert::boolean("RENAMENX", self.call(cmd)?)
    }

    /// All keys in the namespace matching `pattern`, prefix removed.
    ///
    /// Fails as a whole with a deserialization error if any key is not UTF-8;
    /// use [`keys_raw`](Self::keys_raw) for binary keys.
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.keys_raw(pattern)?
            .into_iter()
            .map(|key| convert::text("KEYS", key))
            .collect()
    }

    /// Byte form of [`keys`](Self::keys).
    pub fn keys_raw(&self, pattern: &str) -> Result<Vec<Vec<u8>>> {
        let scoped = self.key_codec().pattern(Some(pattern)).unwrap_or_default();
        let cmd = Command::Keys {
            pattern: scoped.into_bytes(),
        };
        let keys = convert::bulks("KEYS", self.call(cmd)?)?;
        Ok(keys.into_iter().map(|key| self.strip(key)).collect())
    }

    /// One SCAN round trip from `cursor`.
    ///
    /// The building block for callers that persist the token between calls;
    /// [`scan`](Self::scan) drives it to completion.
    pub fn scan_page(
        &self,
        cursor: &CursorToken,
        params: &ScanParams,
    ) -> Result<ScanPage<Vec<u8>>> {
        let cmd = Command::Scan {
            cursor: cursor.as_str().to_string(),
            pattern: self
                .key_codec()
                .pattern(params.pattern.as_deref())
                .map(String::into_bytes),
            count: params.count,
            kind: params.kind.clone(),
        };
        let (next, items) = convert::scan("SCAN", self.call(cmd)?)?;
        let keys = convert::bulks("SCAN", items)?;
        Ok(ScanPage {
            cursor: next,
            items: keys.into_iter().map(|key| self.strip(key)).collect(),
        })
    }

    /// Lazily iterate the namespace's keys, one round trip per page.
    ///
    /// A page containing a non-UTF-8 key fails with a deserialization error
    /// and ends the iteration.
    pub fn scan(
        &self,
        params: ScanParams,
    ) -> Scan<String, impl FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<String>> + '_> {
        Scan::new(params, move |cursor: &CursorToken, params: &ScanParams| {
            let page = self.scan_page(cursor, params)?;
            let items = page
                .items
                .into_iter()
                .map(|key| convert::text("SCAN", key))
                .collect::<Result<Vec<_>>>()?;
            Ok(ScanPage {
                cursor: page.cursor,
                items,
            })
        })
    }

    /// Byte form of [`scan`](Self::scan).
    pub fn scan_raw(
        &self,
        params: ScanParams,
    ) -> Scan<Vec<u8>, impl FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<Vec<u8>>> + '_>
    {
        Scan::new(params, move |cursor: &CursorToken, params: &ScanParams| {
            self.scan_page(cursor, params)
        })
    }
}
