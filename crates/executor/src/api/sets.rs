//! Set commands.

use redstone_core::{CursorToken, Result, Scan, ScanPage, ScanParams};
use redstone_storage::{Backend, Command};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Redstone;
use crate::convert;

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Set Operations (15)
    // =========================================================================

    /// Add encoded members. Returns how many were new.
    pub fn sadd<T: Serialize>(&self, key: impl AsRef<[u8]>, members: &[T]) -> Result<i64> {
        let cmd = Command::SAdd {
            key: self.key(key),
            members: self.encode_all(members)?,
        };
        convert::int("SADD", self.call(cmd)?)
    }

    /// Remove encoded members. Returns how many existed.
    pub fn srem<T: Serialize>(&self, key: impl AsRef<[u8]>, members: &[T]) -> Result<i64> {
        let cmd = Command::SRem {
            key: self.key(key),
            members: self.encode_all(members)?,
        };
        convert::int("SREM", self.call(cmd)?)
    }

    /// All members, each decoded independently. Order is unspecified.
    pub fn smembers<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Vec<Result<T>>> {
        let raw = self.smembers_raw(key)?;
        Ok(self.decode_each(raw))
    }

    /// All members as stored bytes.
    pub fn smembers_raw(&self, key: impl AsRef<[u8]>) -> Result<Vec<Vec<u8>>> {
        let cmd = Command::SMembers { key: self.key(key) };
        convert::bulks("SMEMBERS", self.call(cmd)?)
    }

    /// Whether the encoded `member` is in the set.
    pub fn sismember<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        member: &T,
    ) -> Result<bool> {
        let cmd = Command::SIsMember {
            key: self.key(key),
            member: self.encode(member)?,
        };
        convert::boolean("SISMEMBER", self.call(cmd)?)
    }

    /// Number of members.
    pub fn scard(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::SCard { key: self.key(key) };
        convert::int("SCARD", self.call(cmd)?)
    }

    /// Remove and return one arbitrary member.
    pub fn spop<T: DeserializeOwned>(&self, key: impl AsRef<[u8]>) -> Result<Option<T>> {
        let cmd = Command::SPop {
            key: self.key(key),
            count: None,
        };
        let raw = convert::opt_bulk("SPOP", self.call(cmd)?)?;
        self.decode_opt(raw)
    }

    /// Move a member from `source` to `destination`.
    ///
    /// Returns `false` if it was not in `source`.
    pub fn smove<T: Serialize + ?Sized>(
        &self,
        source: impl AsRef<[u8]>,
        destination: impl AsRef<[u8]>,
        member: &T,
    ) -> Result<bool> {
        let cmd = Command::SMove {
            source: self.key(source),
            destination: self.key(destination),
            member: self.encode(member)?,
        };
        convert::boolean("SMOVE", self.call(cmd)?)
    }

    /// Members present in every set.
    pub fn sinter<T: DeserializeOwned, K: AsRef<[u8]>>(
        &self,
        keys: &[K],
    ) -> Result<Vec<Result<T>>> {
        let cmd = Command::SInter {
            keys: self.key_list(keys),
        };
        let raw = convert::bulks("SINTER", self.call(cmd)?)?;
        Ok(self.decode_each(raw))
    }

    /// Members present in any set.
    pub fn sunion<T: DeserializeOwned, K: AsRef<[u8]>>(
        &self,
        keys: &[K],
    ) -> Result<Vec<Result<T>>> {
        let cmd = Command::SUnion {
            keys: self.key_list(keys),
        };
        let raw = convert::bulks("SUNION", self.call(cmd)?)?;
        Ok(self.decode_each(raw))
    }

    /// Members of the first set absent from all the others.
    pub fn sdiff<T: DeserializeOwned, K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Result<T>>> {
        let cmd = Command::SDiff {
            keys: self.key_list(keys),
        };
        let raw = convert::bulks("SDIFF", self.call(cmd)?)?;
        Ok(self.decode_each(raw))
    }

    /// Store the intersection in `destination`. Returns its size.
    pub fn sinterstore<K: AsRef<[u8]>>(
        &self,
        destination: impl AsRef<[u8]>,
        keys: &[K],
    ) -> Result<i64> {
        let cmd = Command::SInterStore {
            destination: self.key(destination),
            keys: self.key_list(keys),
        };
        convert::int("SINTERSTORE", self.call(cmd)?)
    }

    /// Store the union in `destination`. Returns its size.
    pub fn sunionstore<K: AsRef<[u8]>>(
        &self,
        destination: impl AsRef<[u8]>,
        keys: &[K],
    ) -> Result<i64> {
        let cmd = Command::SUnionStore {
            destination: self.key(destination),
            keys: self.key_list(keys),
        };
        convert::int("SUNIONSTORE", self.call(cmd)?)
    }

    /// Store the difference in `destination`. Returns its size.
    pub fn sdiffstore<K: AsRef<[u8]>>(
        &self,
        destination: impl AsRef<[u8]>,
        keys: &[K],
    ) -> Result<i64> {
        let cmd = Command::SDiffStore {
            destination: self.key(destination),
            keys: self.key_list(keys),
        };
        convert::int("SDIFFSTORE", self.call(cmd)?)
    }

    /// Lazily iterate a set's members, each decoded independently.
    ///
    /// The match pattern applies to the encoded member bytes.
    pub fn sscan<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        params: ScanParams,
    ) -> Scan<Result<T>, impl FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<Result<T>>> + '_>
    {
        let key = self.key(key);
        Scan::new(params, move |cursor: &CursorToken, params: &ScanParams| {
            let cmd = Command::SScan {
                key: key.clone(),
                cursor: cursor.as_str().to_string(),
                pattern: params.pattern.as_ref().map(|p| p.as_bytes().to_vec()),
                count: params.count,
            };
            let (next, items) = convert::scan("SSCAN", self.call(cmd)?)?;
            let members = convert::bulks("SSCAN", items)?;
            Ok(ScanPage {
                cursor: next,
                items: self.decode_each(members),
            })
        })
    }
}
