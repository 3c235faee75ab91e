//! Command enum defining the store's instruction set.
//!
//! Every operation the facade can ask of a backend is a variant of
//! [`Command`]. Commands are:
//! - **Self-contained**: all arguments live in the variant
//! - **Binary**: keys, fields, members and values are raw bytes, already
//!   namespaced and encoded by the caller
//! - **Serializable**: can be logged or shipped as JSON
//! - **Pure data**: no closures
//!
//! Blocking commands carry `timeout_ms`; `0` blocks until data arrives or the
//! connection is closed.

use serde::{Deserialize, Serialize};

/// Expiry option for `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expiry {
    /// `EX seconds`
    Seconds(u64),
    /// `PX milliseconds`
    Millis(u64),
    /// `KEEPTTL`
    KeepTtl,
}

/// Existence condition for `SET`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetCondition {
    /// `NX`: only set if the key does not exist
    IfAbsent,
    /// `XX`: only set if the key exists
    IfPresent,
}

/// List end for `LMOVE` / `BLMOVE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum End {
    /// Head of the list
    Left,
    /// Tail of the list
    Right,
}

/// A store command.
///
/// # Command Categories
///
/// | Category | Count | Description |
/// |----------|-------|-------------|
/// | Connection | 4 | Ping, echo, size, flush |
/// | Keys | 12 | Generic key operations and key scans |
/// | Strings | 11 | String values and counters |
/// | Hashes | 12 | Field maps |
/// | Lists | 16 | Deques, including blocking pops |
/// | Sets | 14 | Unordered member sets |
/// | Sorted sets | 10 | Score-ordered member sets |
/// | Pub/Sub | 1 | Publishing |
/// | Transactions | 5 | Optimistic transactions |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Command {
    // ==================== Connection (4) ====================
    /// Returns: `Reply::Status("PONG")`, or `Reply::Bulk` echoing `message`
    Ping { message: Option<Vec<u8>> },

    /// Returns: `Reply::Bulk`
    Echo { message: Vec<u8> },

    /// Number of live keys.
    /// Returns: `Reply::Int`
    DbSize,

    /// Remove every key.
    /// Returns: `Reply::Status("OK")`
    FlushDb,

    // ==================== Keys (12) ====================
    /// Returns: `Reply::Int` (number removed)
    Del { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Int` (number existing, duplicates counted)
    Exists { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Int` (1 if the timeout was set)
    Expire { key: Vec<u8>, seconds: i64 },

    /// Returns: `Reply::Int` (1 if the timeout was set)
    PExpire { key: Vec<u8>, millis: i64 },

    /// Returns: `Reply::Int` (-2 missing, -1 no expiry)
    Ttl { key: Vec<u8> },

    /// Returns: `Reply::Int` (-2 missing, -1 no expiry)
    PTtl { key: Vec<u8> },

    /// Returns: `Reply::Int` (1 if an expiry was removed)
    Persist { key: Vec<u8> },

    /// Returns: `Reply::Status` (`"none"`, `"string"`, `"hash"`, ...)
    Type { key: Vec<u8> },

    /// Returns: `Reply::Status("OK")`
    Rename { key: Vec<u8>, new_key: Vec<u8> },

    /// Returns: `Reply::Int` (1 if renamed)
    RenameNx { key: Vec<u8>, new_key: Vec<u8> },

    /// Returns: `Reply::Array` of `Reply::Bulk` keys
    Keys { pattern: Vec<u8> },

    /// Returns: `Reply::Array([Bulk(cursor), Array(keys)])`
    Scan {
        cursor: String,
        pattern: Option<Vec<u8>>,
        count: Option<usize>,
        kind: Option<String>,
    },

    // ==================== Strings (11) ====================
    /// Returns: `Reply::Bulk` or `Reply::Nil`
    Get { key: Vec<u8> },

    /// Returns: `Reply::Status("OK")`, or `Reply::Nil` when the condition
    /// failed. With `get`, the previous value (`Bulk`/`Nil`) instead.
    Set {
        key: Vec<u8>,
        value: Vec<u8>,
        expiry: Option<Expiry>,
        condition: Option<SetCondition>,
        get: bool,
    },

    /// Returns: `Reply::Bulk` (previous value) or `Reply::Nil`
    GetSet { key: Vec<u8>, value: Vec<u8> },

    /// Returns: `Reply::Array` of `Bulk`/`Nil`, one per key
    MGet { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Status("OK")`
    MSet { pairs: Vec<(Vec<u8>, Vec<u8>)> },

    /// Returns: `Reply::Int` (1 if all keys were set)
    MSetNx { pairs: Vec<(Vec<u8>, Vec<u8>)> },

    /// Returns: `Reply::Int` (new value)
    IncrBy { key: Vec<u8>, delta: i64 },

    /// Returns: `Reply::Double` (new value)
    IncrByFloat { key: Vec<u8>, delta: f64 },

    /// Returns: `Reply::Int` (new length)
    Append { key: Vec<u8>, value: Vec<u8> },

    /// Returns: `Reply::Int`
    StrLen { key: Vec<u8> },

    /// Returns: `Reply::Bulk`
    GetRange { key: Vec<u8>, start: i64, end: i64 },

    // ==================== Hashes (12) ====================
    /// Returns: `Reply::Int` (number of new fields)
    HSet {
        key: Vec<u8>,
        fields: Vec<(Vec<u8>, Vec<u8>)>,
    },

    /// Returns: `Reply::Int` (1 if set)
    HSetNx {
        key: Vec<u8>,
        field: Vec<u8>,
        value: Vec<u8>,
    },

    /// Returns: `Reply::Bulk` or `Reply::Nil`
    HGet { key: Vec<u8>, field: Vec<u8> },

    /// Returns: `Reply::Array` of `Bulk`/`Nil`, one per field
    HMGet { key: Vec<u8>, fields: Vec<Vec<u8>> },

    /// Returns: `Reply::Array` alternating field, value
    HGetAll { key: Vec<u8> },

    /// Returns: `Reply::Int` (number removed)
    HDel { key: Vec<u8>, fields: Vec<Vec<u8>> },

    /// Returns: `Reply::Int` (0 or 1)
    HExists { key: Vec<u8>, field: Vec<u8> },

    /// Returns: `Reply::Int`
    HLen { key: Vec<u8> },

    /// Returns: `Reply::Array` of fields
    HKeys { key: Vec<u8> },

    /// Returns: `Reply::Array` of values
    HVals { key: Vec<u8> },

    /// Returns: `Reply::Int` (new value)
    HIncrBy {
        key: Vec<u8>,
        field: Vec<u8>,
        delta: i64,
    },

    /// Returns: `Reply::Array([Bulk(cursor), Array(field, value, ...)])`
    HScan {
        key: Vec<u8>,
        cursor: String,
        pattern: Option<Vec<u8>>,
        count: Option<usize>,
    },

    // ==================== Lists (16) ====================
    /// Returns: `Reply::Int` (new length)
    LPush { key: Vec<u8>, values: Vec<Vec<u8>> },

    /// Returns: `Reply::Int` (new length)
    RPush { key: Vec<u8>, values: Vec<Vec<u8>> },

    /// Returns: `Reply::Bulk`/`Reply::Nil`, or `Reply::Array` when `count` is given
    LPop { key: Vec<u8>, count: Option<usize> },

    /// Returns: `Reply::Bulk`/`Reply::Nil`, or `Reply::Array` when `count` is given
    RPop { key: Vec<u8>, count: Option<usize> },

    /// Returns: `Reply::Int`
    LLen { key: Vec<u8> },

    /// Returns: `Reply::Array`
    LRange { key: Vec<u8>, start: i64, stop: i64 },

    /// Returns: `Reply::Bulk` or `Reply::Nil`
    LIndex { key: Vec<u8>, index: i64 },

    /// Returns: `Reply::Status("OK")`
    LSet {
        key: Vec<u8>,
        index: i64,
        value: Vec<u8>,
    },

    /// Returns: `Reply::Int` (number removed)
    LRem {
        key: Vec<u8>,
        count: i64,
        value: Vec<u8>,
    },

    /// Returns: `Reply::Status("OK")`
    LTrim { key: Vec<u8>, start: i64, stop: i64 },

    /// Returns: `Reply::Bulk` (moved element) or `Reply::Nil`
    LMove {
        source: Vec<u8>,
        destination: Vec<u8>,
        from: End,
        to: End,
    },

    /// Returns: `Reply::Bulk` (moved element) or `Reply::Nil`
    RPopLPush {
        source: Vec<u8>,
        destination: Vec<u8>,
    },

    /// Returns: `Reply::Array([Bulk(key), Bulk(value)])`, or `Reply::Nil` on timeout
    BLPop { keys: Vec<Vec<u8>>, timeout_ms: u64 },

    /// Returns: `Reply::Array([Bulk(key), Bulk(value)])`, or `Reply::Nil` on timeout
    BRPop { keys: Vec<Vec<u8>>, timeout_ms: u64 },

    /// Returns: `Reply::Bulk` (moved element), or `Reply::Nil` on timeout
    BLMove {
        source: Vec<u8>,
        destination: Vec<u8>,
        from: End,
        to: End,
        timeout_ms: u64,
    },

    /// Index of the first element equal to `value`.
    /// Returns: `Reply::Int` or `Reply::Nil`
    LPos { key: Vec<u8>, value: Vec<u8> },

    // ==================== Sets (14) ====================
    /// Returns: `Reply::Int` (number added)
    SAdd { key: Vec<u8>, members: Vec<Vec<u8>> },

    /// Returns: `Reply::Int` (number removed)
    SRem { key: Vec<u8>, members: Vec<Vec<u8>> },

    /// Returns: `Reply::Array`
    SMembers { key: Vec<u8> },

    /// Returns: `Reply::Int` (0 or 1)
    SIsMember { key: Vec<u8>, member: Vec<u8> },

    /// Returns: `Reply::Int`
    SCard { key: Vec<u8> },

    /// Returns: `Reply::Bulk`/`Reply::Nil`, or `Reply::Array` when `count` is given
    SPop { key: Vec<u8>, count: Option<usize> },

    /// Returns: `Reply::Int` (1 if moved)
    SMove {
        source: Vec<u8>,
        destination: Vec<u8>,
        member: Vec<u8>,
    },

    /// Returns: `Reply::Array`
    SInter { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Array`
    SUnion { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Array`
    SDiff { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Int` (size of the stored set)
    SInterStore {
        destination: Vec<u8>,
        keys: Vec<Vec<u8>>,
    },

    /// Returns: `Reply::Int` (size of the stored set)
    SUnionStore {
        destination: Vec<u8>,
        keys: Vec<Vec<u8>>,
    },

    /// Returns: `Reply::Int` (size of the stored set)
    SDiffStore {
        destination: Vec<u8>,
        keys: Vec<Vec<u8>>,
    },

    /// Returns: `Reply::Array([Bulk(cursor), Array(members)])`
    SScan {
        key: Vec<u8>,
        cursor: String,
        pattern: Option<Vec<u8>>,
        count: Option<usize>,
    },

    // ==================== Sorted sets (10) ====================
    /// Returns: `Reply::Int` (number of new members)
    ZAdd {
        key: Vec<u8>,
        members: Vec<(f64, Vec<u8>)>,
    },

    /// Returns: `Reply::Double` (new score)
    ZIncrBy {
        key: Vec<u8>,
        delta: f64,
        member: Vec<u8>,
    },

    /// Returns: `Reply::Double` or `Reply::Nil`
    ZScore { key: Vec<u8>, member: Vec<u8> },

    /// Returns: `Reply::Int` or `Reply::Nil`
    ZRank { key: Vec<u8>, member: Vec<u8> },

    /// Returns: `Reply::Array` of members, or alternating member, `Double`
    /// score when `with_scores`
    ZRange {
        key: Vec<u8>,
        start: i64,
        stop: i64,
        with_scores: bool,
    },

    /// Inclusive score bounds.
    /// Returns: same shape as `ZRange`
    ZRangeByScore {
        key: Vec<u8>,
        min: f64,
        max: f64,
        with_scores: bool,
    },

    /// Returns: `Reply::Int` (number removed)
    ZRem { key: Vec<u8>, members: Vec<Vec<u8>> },

    /// Returns: `Reply::Int`
    ZCard { key: Vec<u8> },

    /// Inclusive score bounds.
    /// Returns: `Reply::Int`
    ZCount { key: Vec<u8>, min: f64, max: f64 },

    /// Returns: `Reply::Array([Bulk(cursor), Array(member, Double(score), ...)])`
    ZScan {
        key: Vec<u8>,
        cursor: String,
        pattern: Option<Vec<u8>>,
        count: Option<usize>,
    },

    // ==================== Pub/Sub (1) ====================
    /// Returns: `Reply::Int` (number of receiving subscribers)
    Publish { channel: Vec<u8>, message: Vec<u8> },

    // ==================== Transactions (5) ====================
    /// Returns: `Reply::Status("OK")`
    Watch { keys: Vec<Vec<u8>> },

    /// Returns: `Reply::Status("OK")`
    Unwatch,

    /// Returns: `Reply::Status("OK")`; later commands reply `QUEUED`
    Multi,

    /// Returns: `Reply::Array` of per-command replies, or `Reply::Nil` when a
    /// watched key changed
    Exec,

    /// Returns: `Reply::Status("OK")`
    Discard,
}

impl Command {
    /// Upper-case command name, as a store would log it.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping { .. } => "PING",
            Command::Echo { .. } => "ECHO",
            Command::DbSize => "DBSIZE",
            Command::FlushDb => "FLUSHDB",
            Command::Del { .. } => "DEL",
            Command::Exists { .. } => "EXISTS",
            Command::Expire { .. } => "EXPIRE",
            Command::PExpire { .. } => "PEXPIRE",
            Command::Ttl { .. } => "TTL",
            Command::PTtl { .. } => "PTTL",
            Command::Persist { .. } => "PERSIST",
            Command::Type { .. } => "TYPE",
            Command::Rename { .. } => "RENAME",
            Command::RenameNx { .. } => "RENAMENX",
            Command::Keys { .. } => "KEYS",
            Command::Scan { .. } => "SCAN",
            Command::Get { .. } => "GET",
            Command::Set { .. } => "SET",
            Command::GetSet { .. } => "GETSET",
            Command::MGet { .. } => "MGET",
            Command::MSet { .. } => "MSET",
            Command::MSetNx { .. } => "MSETNX",
            Command::IncrBy { .. } => "INCRBY",
            Command::IncrByFloat { .. } => "INCRBYFLOAT",
            Command::Append { .. } => "APPEND",
            Command::StrLen { .. } => "STRLEN",
            Command::GetRange { .. } => "GETRANGE",
            Command::HSet { .. } => "HSET",
            Command::HSetNx { .. } => "HSETNX",
            Command::HGet { .. } => "HGET",
            Command::HMGet { .. } => "HMGET",
            Command::HGetAll { .. } => "HGETALL",
            Command::HDel { .. } => "HDEL",
            Command::HExists { .. } => "HEXISTS",
            Command::HLen { .. } => "HLEN",
            Command::HKeys { .. } => "HKEYS",
            Command::HVals { .. } => "HVALS",
            Command::HIncrBy { .. } => "HINCRBY",
            Command::HScan { .. } => "HSCAN",
            Command::LPush { .. } => "LPUSH",
            Command::RPush { .. } => "RPUSH",
            Command::LPop { .. } => "LPOP",
            Command::RPop { .. } => "RPOP",
            Command::LLen { .. } => "LLEN",
            Command::LRange { .. } => "LRANGE",
            Command::LIndex { .. } => "LINDEX",
            Command::LSet { .. } => "LSET",
            Command::LRem { .. } => "LREM",
            Command::LTrim { .. } => "LTRIM",
            Command::LMove { .. } => "LMOVE",
            Command::RPopLPush { .. } => "RPOPLPUSH",
            Command::BLPop { .. } => "BLPOP",
            Command::BRPop { .. } => "BRPOP",
            Command::BLMove { .. } => "BLMOVE",
            Command::LPos { .. } => "LPOS",
            Command::SAdd { .. } => "SADD",
            Command::SRem { .. } => "SREM",
            Command::SMembers { .. } => "SMEMBERS",
            Command::SIsMember { .. } => "SISMEMBER",
            Command::SCard { .. } => "SCARD",
            Command::SPop { .. } => "SPOP",
            Command::SMove { .. } => "SMOVE",
            Command::SInter { .. } => "SINTER",
            Command::SUnion { .. } => "SUNION",
            Command::SDiff { .. } => "SDIFF",
            Command::SInterStore { .. } => "SINTERSTORE",
            Command::SUnionStore { .. } => "SUNIONSTORE",
            Command::SDiffStore { .. } => "SDIFFSTORE",
            Command::SScan { .. } => "SSCAN",
            Command::ZAdd { .. } => "ZADD",
            Command::ZIncrBy { .. } => "ZINCRBY",
            Command::ZScore { .. } => "ZSCORE",
            Command::ZRank { .. } => "ZRANK",
            Command::ZRange { .. } => "ZRANGE",
            Command::ZRangeByScore { .. } => "ZRANGEBYSCORE",
            Command::ZRem { .. } => "ZREM",
            Command::ZCard { .. } => "ZCARD",
            Command::ZCount { .. } => "ZCOUNT",
            Command::ZScan { .. } => "ZSCAN",
            Command::Publish { .. } => "PUBLISH",
            Command::Watch { .. } => "WATCH",
            Command::Unwatch => "UNWATCH",
            Command::Multi => "MULTI",
            Command::Exec => "EXEC",
            Command::Discard => "DISCARD",
        }
    }

    /// Every key the command touches, in argument order.
    ///
    /// Empty for commands that are not bound to keys (server commands,
    /// key-space scans, pub/sub and transaction control).
    pub fn keys(&self) -> Vec<&[u8]> {
        match self {
            Command::Ping { .. }
            | Command::Echo { .. }
            | Command::DbSize
            | Command::FlushDb
            | Command::Keys { .. }
            | Command::Scan { .. }
            | Command::Publish { .. }
            | Command::Unwatch
            | Command::Multi
            | Command::Exec
            | Command::Discard => Vec::new(),

            Command::Del { keys }
            | Command::Exists { keys }
            | Command::MGet { keys }
            | Command::BLPop { keys, .. }
            | Command::BRPop { keys, .. }
            | Command::SInter { keys }
            | Command::SUnion { keys }
            | Command::SDiff { keys }
            | Command::Watch { keys } => keys.iter().map(Vec::as_slice).collect(),

            Command::MSet { pairs } | Command::MSetNx { pairs } => {
                pairs.iter().map(|(k, _)| k.as_slice()).collect()
            }

            Command::Rename { key, new_key } | Command::RenameNx { key, new_key } => {
                vec![key.as_slice(), new_key.as_slice()]
            }

            Command::LMove {
                source,
                destination,
                ..
            }
            | Command::RPopLPush {
                source,
                destination,
            }
            | Command::BLMove {
                source,
                destination,
                ..
            }
            | Command::SMove {
                source,
                destination,
                ..
            } => vec![source.as_slice(), destination.as_slice()],

            Command::SInterStore { destination, keys }
            | Command::SUnionStore { destination, keys }
            | Command::SDiffStore { destination, keys } => std::iter::once(destination.as_slice())
                .chain(keys.iter().map(Vec::as_slice))
                .collect(),

            Command::Expire { key, .. }
            | Command::PExpire { key, .. }
            | Command::Ttl { key }
            | Command::PTtl { key }
            | Command::Persist { key }
            | Command::Type { key }
            | Command::Get { key }
            | Command::Set { key, .. }
            | Command::GetSet { key, .. }
            | Command::IncrBy { key, .. }
            | Command::IncrByFloat { key, .. }
            | Command::Append { key, .. }
            | Command::StrLen { key }
            | Command::GetRange { key, .. }
            | Command::HSet { key, .. }
            | Command::HSetNx { key, .. }
            | Command::HGet { key, .. }
            | Command::HMGet { key, .. }
            | Command::HGetAll { key }
            | Command::HDel { key, .. }
            | Command::HExists { key, .. }
            | Command::HLen { key }
            | Command::HKeys { key }
            | Command::HVals { key }
            | Command::HIncrBy { key, .. }
            | Command::HScan { key, .. }
            | Command::LPush { key, .. }
            | Command::RPush { key, .. }
            | Command::LPop { key, .. }
            | Command::RPop { key, .. }
            | Command::LLen { key }
            | Command::LRange { key, .. }
            | Command::LIndex { key, .. }
            | Command::LSet { key, .. }
            | Command::LRem { key, .. }
            | Command::LTrim { key, .. }
            | Command::LPos { key, .. }
            | Command::SAdd { key, .. }
            | Command::SRem { key, .. }
            | Command::SMembers { key }
            | Command::SIsMember { key, .. }
            | Command::SCard { key }
            | Command::SPop { key, .. }
            | Command::SScan { key, .. }
            | Command::ZAdd { key, .. }
            | Command::ZIncrBy { key, .. }
            | Command::ZScore { key, .. }
            | Command::ZRank { key, .. }
            | Command::ZRange { key, .. }
            | Command::ZRangeByScore { key, .. }
            | Command::ZRem { key, .. }
            | Command::ZCard { key }
            | Command::ZCount { key, .. }
            | Command::ZScan { key, .. } => vec![key.as_slice()],
        }
    }

    /// Blocking timeout in milliseconds, for commands that may wait.
    pub fn blocking_timeout(&self) -> Option<u64> {
        match self {
            Command::BLPop { timeout_ms, .. }
            | Command::BRPop { timeout_ms, .. }
            | Command::BLMove { timeout_ms, .. } => Some(*timeout_ms),
            _ => None,
        }
    }

    /// Transaction control commands are handled by the connection, not the
    /// keyspace.
    pub fn is_transaction_control(&self) -> bool {
        matches!(
            self,
            Command::Watch { .. }
                | Command::Unwatch
                | Command::Multi
                | Command::Exec
                | Command::Discard
        )
    }
}
