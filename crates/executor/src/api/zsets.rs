//! Sorted set commands.

use redstone_core::{CursorToken, Result, Scan, ScanPage, ScanParams};
use redstone_storage::{Backend, Command};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Redstone;
use crate::convert;

impl<B: Backend> Redstone<B> {
    // =========================================================================
    // Sorted Set Operations (11)
    // =========================================================================

    /// Add or update `(score, member)` pairs. Returns how many members were new.
    pub fn zadd<T: Serialize>(&self, key: impl AsRef<[u8]>, members: &[(f64, T)]) -> Result<i64> {
        let members = members
            .iter()
            .map(|(score, member)| Ok((*score, self.encode(member)?)))
            .collect::<Result<Vec<_>>>()?;
        let cmd = Command::ZAdd {
            key: self.key(key),
            members,
        };
        convert::int("ZADD", self.call(cmd)?)
    }

    /// Add `delta` to a member's score. Returns the new score.
    pub fn zincr_by<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        delta: f64,
        member: &T,
    ) -> Result<f64> {
        let cmd = Command::ZIncrBy {
            key: self.key(key),
            delta,
            member: self.encode(member)?,
        };
        convert::double("ZINCRBY", self.call(cmd)?)
    }

    /// Score of a member.
    pub fn zscore<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        member: &T,
    ) -> Result<Option<f64>> {
        let cmd = Command::ZScore {
            key: self.key(key),
            member: self.encode(member)?,
        };
        convert::opt_double("ZSCORE", self.call(cmd)?)
    }

    /// Zero-based rank of a member by ascending score.
    pub fn zrank<T: Serialize + ?Sized>(
        &self,
        key: impl AsRef<[u8]>,
        member: &T,
    ) -> Result<Option<i64>> {
        let cmd = Command::ZRank {
            key: self.key(key),
            member: self.encode(member)?,
        };
        convert::opt_int("ZRANK", self.call(cmd)?)
    }

    /// Members by rank, inclusive, each decoded independently.
    pub fn zrange<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Result<T>>> {
        let cmd = Command::ZRange {
            key: self.key(key),
            start,
            stop,
            with_scores: false,
        };
        let raw = convert::bulks("ZRANGE", self.call(cmd)?)?;
        Ok(self.decode_each(raw))
    }

    /// Members by rank with their scores.
    pub fn zrange_with_scores<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        start: i64,
        stop: i64,
    ) -> Result<Vec<(Result<T>, f64)>> {
        let cmd = Command::ZRange {
            key: self.key(key),
            start,
            stop,
            with_scores: true,
        };
        let pairs = convert::pairs("ZRANGE", self.call(cmd)?, convert::bulk, convert::double)?;
        Ok(pairs
            .into_iter()
            .map(|(member, score)| (self.decode(&member), score))
            .collect())
    }

    /// Members whose score lies in `min..=max`, in score order.
    pub fn zrange_by_score<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        min: f64,
        max: f64,
    ) -> Result<Vec<Result<T>>> {
        let cmd = Command::ZRangeByScore {
            key: self.key(key),
            min,
            max,
            with_scores: false,
        };
        let raw = convert::bulks("ZRANGEBYSCORE", self.call(cmd)?)?;
        Ok(self.decode_each(raw))
    }

    /// Remove members. Returns how many existed.
    pub fn zrem<T: Serialize>(&self, key: impl AsRef<[u8]>, members: &[T]) -> Result<i64> {
        let cmd = Command::ZRem {
            key: self.key(key),
            members: self.encode_all(members)?,
        };
        convert::int("ZREM", self.call(cmd)?)
    }

    /// Number of members.
    pub fn zcard(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        let cmd = Command::ZCard { key: self.key(key) };
        convert::int("ZCARD", self.call(cmd)?)
    }

    /// Number of members whose score lies in `min..=max`.
    pub fn zcount(&self, key: impl AsRef<[u8]>, min: f64, max: f64) -> Result<i64> {
        let cmd = Command::ZCount {
            key: self.key(key),
            min,
            max,
        };
        convert::int("ZCOUNT", self.call(cmd)?)
    }

    /// Lazily iterate `(member, score)` pairs.
    pub fn zscan<T: DeserializeOwned>(
        &self,
        key: impl AsRef<[u8]>,
        params: ScanParams,
    ) -> Scan<
        (Result<T>, f64),
        impl FnMut(&CursorToken, &ScanParams) -> Result<ScanPage<(Result<T>, f64)>> + '_,
    > {
        let key = self.key(key);
        Scan::new(params, move |cursor: &CursorToken, params: &ScanParams| {
            let cmd = Command::ZScan {
                key: key.clone(),
                cursor: cursor.as_str().to_string(),
                pattern: params.pattern.as_ref().map(|p| p.as_bytes().to_vec()),
                count: params.count,
            };
            let (next, items) = convert::scan("ZSCAN", self.call(cmd)?)?;
            let members = convert::pairs("ZSCAN", items, convert::bulk, convert::double)?;
            Ok(ScanPage {
                cursor: next,
                items: members
                    .into_iter()
                    .map(|(member, score)| (self.decode(&member), score))
                    .collect(),
            })
        })
    }
}
