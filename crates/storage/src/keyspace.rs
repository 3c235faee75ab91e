//! In-process keyspace implementing the store's data model.
//!
//! # Design
//!
//! - One `Mutex<Db>` per keyspace: every command is atomic, and `EXEC` applies
//!   its queue under a single lock acquisition
//! - `BTreeMap` key order gives scans a stable position-based cursor
//! - Expiry is lazy: a key past its deadline is removed when next touched
//! - Every modification bumps the key's version, which is what `WATCH` checks
//! - Blocking pops wait on a `Condvar` signalled after each command
//!
//! # Scan cursors
//!
//! The cursor is the number of positions already visited in key order. Keys
//! inserted before the cursor during an iteration shift later keys, so an
//! element may be returned twice or skipped; the cursor only moves forward,
//! so iteration always terminates.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use rustc_hash::FxHashMap;

use crate::command::{Command, End, Expiry, SetCondition};
use crate::error::MemoryError;
use crate::glob::glob_match;
use crate::reply::Reply;

type Result<T> = std::result::Result<T, MemoryError>;

/// Page size when a scan gives no `COUNT`.
pub const DEFAULT_SCAN_COUNT: usize = 10;

/// Upper bound on one condition-variable wait, so that closed connections are
/// noticed promptly.
const WAIT_SLICE: Duration = Duration::from_millis(20);

#[derive(Debug, Clone)]
enum Data {
    Str(Vec<u8>),
    Hash(BTreeMap<Vec<u8>, Vec<u8>>),
    List(VecDeque<Vec<u8>>),
    Set(BTreeSet<Vec<u8>>),
    ZSet(BTreeMap<Vec<u8>, f64>),
}

impl Data {
    fn type_name(&self) -> &'static str {
        match self {
            Data::Str(_) => "string",
            Data::Hash(_) => "hash",
            Data::List(_) => "list",
            Data::Set(_) => "set",
            Data::ZSet(_) => "zset",
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Data::Str(_) => false,
            Data::Hash(h) => h.is_empty(),
            Data::List(l) => l.is_empty(),
            Data::Set(s) => s.is_empty(),
            Data::ZSet(z) => z.is_empty(),
        }
    }

    fn as_str(&self) -> Result<&Vec<u8>> {
        match self {
            Data::Str(v) => Ok(v),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_str_mut(&mut self) -> Result<&mut Vec<u8>> {
        match self {
            Data::Str(v) => Ok(v),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_hash(&self) -> Result<&BTreeMap<Vec<u8>, Vec<u8>>> {
        match self {
            Data::Hash(h) => Ok(h),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_hash_mut(&mut self) -> Result<&mut BTreeMap<Vec<u8>, Vec<u8>>> {
        match self {
            Data::Hash(h) => Ok(h),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_list(&self) -> Result<&VecDeque<Vec<u8>>> {
        match self {
            Data::List(l) => Ok(l),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_list_mut(&mut self) -> Result<&mut VecDeque<Vec<u8>>> {
        match self {
            Data::List(l) => Ok(l),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_set(&self) -> Result<&BTreeSet<Vec<u8>>> {
        match self {
            Data::Set(s) => Ok(s),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_set_mut(&mut self) -> Result<&mut BTreeSet<Vec<u8>>> {
        match self {
            Data::Set(s) => Ok(s),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_zset(&self) -> Result<&BTreeMap<Vec<u8>, f64>> {
        match self {
            Data::ZSet(z) => Ok(z),
            _ => Err(MemoryError::WrongType),
        }
    }

    fn as_zset_mut(&mut self) -> Result<&mut BTreeMap<Vec<u8>, f64>> {
        match self {
            Data::ZSet(z) => Ok(z),
            _ => Err(MemoryError::WrongType),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SetOp {
    Inter,
    Union,
    Diff,
}

#[derive(Debug, Default)]
struct Db {
    entries: BTreeMap<Vec<u8>, Entry>,
    versions: FxHashMap<Vec<u8>, u64>,
    clock: u64,
}

impl Db {
    // =========================================================================
    // Bookkeeping
    // =========================================================================

    fn touch(&mut self, key: &[u8]) {
        self.clock += 1;
        self.versions.insert(key.to_vec(), self.clock);
    }

    fn expire_if_due(&mut self, key: &[u8], now: Instant) {
        let due = matches!(
            self.entries.get(key),
            Some(Entry { expires_at: Some(t), .. }) if *t <= now
        );
        if due {
            self.entries.remove(key);
            self.touch(key);
        }
    }

    fn purge_expired(&mut self, now: Instant) {
        let due: Vec<Vec<u8>> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at.map_or(false, |t| t <= now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in due {
            self.entries.remove(&key);
            self.touch(&key);
        }
    }

    fn version(&mut self, key: &[u8], now: Instant) -> u64 {
        self.expire_if_due(key, now);
        self.versions.get(key).copied().unwrap_or(0)
    }

    fn get(&mut self, key: &[u8], now: Instant) -> Option<&Entry> {
        self.expire_if_due(key, now);
        self.entries.get(key)
    }

    fn get_mut(&mut self, key: &[u8], now: Instant) -> Option<&mut Entry> {
        self.expire_if_due(key, now);
        self.entries.get_mut(key)
    }

    fn entry_or(&mut self, key: &[u8], now: Instant, init: fn() -> Data) -> &mut Entry {
        self.expire_if_due(key, now);
        self.entries
            .entry(key.to_vec())
            .or_insert_with(|| Entry::new(init()))
    }

    fn drop_if_empty(&mut self, key: &[u8]) {
        if self.entries.get(key).map_or(false, |e| e.data.is_empty()) {
            self.entries.remove(key);
        }
    }

    fn remove(&mut self, key: &[u8], now: Instant) -> Option<Entry> {
        self.expire_if_due(key, now);
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.touch(key);
        }
        removed
    }

    fn put(&mut self, key: Vec<u8>, entry: Entry) {
        self.touch(&key);
        self.entries.insert(key, entry);
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run one command. Blocking commands make a single non-blocking attempt.
    fn execute(&mut self, cmd: Command, now: Instant) -> Result<Reply> {
        match cmd {
            // Connection
            Command::Ping { message } => {
                Ok(message.map_or(Reply::Status("PONG".into()), Reply::Bulk))
            }
            Command::Echo { message } => Ok(Reply::Bulk(message)),
            Command::DbSize => {
                self.purge_expired(now);
                Ok(Reply::Int(self.entries.len() as i64))
            }
            Command::FlushDb => {
                let keys: Vec<Vec<u8>> = self.entries.keys().cloned().collect();
                self.entries.clear();
                for key in keys {
                    self.touch(&key);
                }
                Ok(Reply::ok())
            }

            // Keys
            Command::Del { keys } => {
                let removed = keys.iter().filter(|k| self.remove(k, now).is_some()).count();
                Ok(Reply::Int(removed as i64))
            }
            Command::Exists { keys } => {
                let found = keys.iter().filter(|k| self.get(k, now).is_some()).count();
                Ok(Reply::Int(found as i64))
            }
            Command::Expire { key, seconds } => {
                self.expire_in(&key, seconds.saturating_mul(1000), now)
            }
            Command::PExpire { key, millis } => self.expire_in(&key, millis, now),
            Command::Ttl { key } => Ok(Reply::Int(match self.remaining(&key, now) {
                Some(Some(left)) => ((left.as_millis() + 500) / 1000) as i64,
                Some(None) => -1,
                None => -2,
            })),
            Command::PTtl { key } => Ok(Reply::Int(match self.remaining(&key, now) {
                Some(Some(left)) => left.as_millis() as i64,
                Some(None) => -1,
                None => -2,
            })),
            Command::Persist { key } => {
                let had = match self.get_mut(&key, now) {
                    Some(entry) => entry.expires_at.take().is_some(),
                    None => false,
                };
                if had {
                    self.touch(&key);
                }
                Ok(Reply::Int(had as i64))
            }
            Command::Type { key } => Ok(Reply::Status(
                self.get(&key, now)
                    .map_or("none", |e| e.data.type_name())
                    .to_string(),
            )),
            Command::Rename { key, new_key } => {
                self.rename(key, new_key, now)?;
                Ok(Reply::ok())
            }
            Command::RenameNx { key, new_key } => {
                if self.get(&key, now).is_none() {
                    return Err(MemoryError::NoSuchKey);
                }
                if self.get(&new_key, now).is_some() {
                    return Ok(Reply::Int(0));
                }
                self.rename(key, new_key, now)?;
                Ok(Reply::Int(1))
            }
            Command::Keys { pattern } => {
                self.purge_expired(now);
                Ok(Reply::bulks(
                    self.entries
                        .keys()
                        .filter(|k| glob_match(&pattern, k))
                        .cloned(),
                ))
            }
            Command::Scan {
                cursor,
                pattern,
                count,
                kind,
            } => {
                self.purge_expired(now);
                let (next, window) = scan_window(self.entries.iter(), &cursor, count)?;
                let items = window
                    .into_iter()
                    .filter(|(k, _)| pattern.as_deref().map_or(true, |p| glob_match(p, k)))
                    .filter(|(_, e)| kind.as_deref().map_or(true, |t| e.data.type_name() == t))
                    .map(|(k, _)| Reply::Bulk(k.clone()))
                    .collect();
                Ok(scan_reply(next, items))
            }

            // Strings
            Command::Get { key } => match self.get(&key, now) {
                Some(entry) => Ok(Reply::Bulk(entry.data.as_str()?.clone())),
                None => Ok(Reply::Nil),
            },
            Command::Set {
                key,
                value,
                expiry,
                condition,
                get,
            } => self.set(key, value, expiry, condition, get, now),
            Command::GetSet { key, value } => {
                let old = match self.get(&key, now) {
                    Some(entry) => Reply::Bulk(entry.data.as_str()?.clone()),
                    None => Reply::Nil,
                };
                self.put(key, Entry::new(Data::Str(value)));
                Ok(old)
            }
            Command::MGet { keys } => Ok(Reply::Array(
                keys.iter()
                    .map(|k| match self.get(k, now).map(|e| &e.data) {
                        Some(Data::Str(v)) => Reply::Bulk(v.clone()),
                        _ => Reply::Nil,
                    })
                    .collect(),
            )),
            Command::MSet { pairs } => {
                if pairs.is_empty() {
                    return Err(wrong_arity("mset"));
                }
                for (key, value) in pairs {
                    self.put(key, Entry::new(Data::Str(value)));
                }
                Ok(Reply::ok())
            }
            Command::MSetNx { pairs } => {
                if pairs.is_empty() {
                    return Err(wrong_arity("msetnx"));
                }
                if pairs.iter().any(|(k, _)| self.get(k, now).is_some()) {
                    return Ok(Reply::Int(0));
                }
                for (key, value) in pairs {
                    self.put(key, Entry::new(Data::Str(value)));
                }
                Ok(Reply::Int(1))
            }
            Command::IncrBy { key, delta } => {
                let (current, expires_at) = match self.get(&key, now) {
                    Some(entry) => (parse_int(entry.data.as_str()?)?, entry.expires_at),
                    None => (0, None),
                };
                let next = current.checked_add(delta).ok_or(MemoryError::Overflow)?;
                let data = Data::Str(next.to_string().into_bytes());
                self.put(key, Entry { data, expires_at });
                Ok(Reply::Int(next))
            }
            Command::IncrByFloat { key, delta } => {
                let (current, expires_at) = match self.get(&key, now) {
                    Some(entry) => (parse_float(entry.data.as_str()?)?, entry.expires_at),
                    None => (0.0, None),
                };
                let next = current + delta;
                if !next.is_finite() {
                    return Err(MemoryError::NotFloat);
                }
                let data = Data::Str(format_float(next));
                self.put(key, Entry { data, expires_at });
                Ok(Reply::Double(next))
            }
            Command::Append { key, value } => {
                let len = {
                    let s = self.entry_or(&key, now, || Data::Str(Vec::new())).data.as_str_mut()?;
                    s.extend_from_slice(&value);
                    s.len()
                };
                self.touch(&key);
                Ok(Reply::Int(len as i64))
            }
            Command::StrLen { key } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_str()?.len() as i64,
                None => 0,
            })),
            Command::GetRange { key, start, end } => {
                let bytes = match self.get(&key, now) {
                    Some(entry) => {
                        let s = entry.data.as_str()?;
                        normalize_range(start, end, s.len())
                            .map_or_else(Vec::new, |(from, to)| s[from..=to].to_vec())
                    }
                    None => Vec::new(),
                };
                Ok(Reply::Bulk(bytes))
            }

            // Hashes
            Command::HSet { key, fields } => {
                if fields.is_empty() {
                    return Err(wrong_arity("hset"));
                }
                let added = {
                    let hash = self.entry_or(&key, now, hash).data.as_hash_mut()?;
                    fields
                        .into_iter()
                        .filter(|(f, v)| hash.insert(f.clone(), v.clone()).is_none())
                        .count()
                };
                self.touch(&key);
                Ok(Reply::Int(added as i64))
            }
            Command::HSetNx { key, field, value } => {
                let added = {
                    let hash = self.entry_or(&key, now, hash).data.as_hash_mut()?;
                    if hash.contains_key(&field) {
                        false
                    } else {
                        hash.insert(field, value);
                        true
                    }
                };
                if added {
                    self.touch(&key);
                }
                Ok(Reply::Int(added as i64))
            }
            Command::HGet { key, field } => match self.get(&key, now) {
                Some(entry) => Ok(Reply::bulk_or_nil(entry.data.as_hash()?.get(&field).cloned())),
                None => Ok(Reply::Nil),
            },
            Command::HMGet { key, fields } => {
                let hash = match self.get(&key, now) {
                    Some(entry) => Some(entry.data.as_hash()?),
                    None => None,
                };
                Ok(Reply::Array(
                    fields
                        .iter()
                        .map(|f| Reply::bulk_or_nil(hash.and_then(|h| h.get(f).cloned())))
                        .collect(),
                ))
            }
            Command::HGetAll { key } => match self.get(&key, now) {
                Some(entry) => Ok(Reply::bulks(
                    entry
                        .data
                        .as_hash()?
                        .iter()
                        .flat_map(|(f, v)| [f.clone(), v.clone()]),
                )),
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::HDel { key, fields } => {
                let removed = match self.get_mut(&key, now) {
                    Some(entry) => {
                        let hash = entry.data.as_hash_mut()?;
                        fields.iter().filter(|f| hash.remove(*f).is_some()).count()
                    }
                    None => 0,
                };
                if removed > 0 {
                    self.touch(&key);
                    self.drop_if_empty(&key);
                }
                Ok(Reply::Int(removed as i64))
            }
            Command::HExists { key, field } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_hash()?.contains_key(&field) as i64,
                None => 0,
            })),
            Command::HLen { key } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_hash()?.len() as i64,
                None => 0,
            })),
            Command::HKeys { key } => match self.get(&key, now) {
                Some(entry) => Ok(Reply::bulks(entry.data.as_hash()?.keys().cloned())),
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::HVals { key } => match self.get(&key, now) {
                Some(entry) => Ok(Reply::bulks(entry.data.as_hash()?.values().cloned())),
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::HIncrBy { key, field, delta } => {
                let result = {
                    let hash = self.entry_or(&key, now, hash).data.as_hash_mut()?;
                    let current = hash.get(&field).map(|v| parse_int(v)).transpose()?.unwrap_or(0);
                    let next = current.checked_add(delta).ok_or(MemoryError::Overflow);
                    if let Ok(next) = next {
                        hash.insert(field, next.to_string().into_bytes());
                    }
                    next
                };
                self.drop_if_empty(&key);
                let next = result?;
                self.touch(&key);
                Ok(Reply::Int(next))
            }
            Command::HScan {
                key,
                cursor,
                pattern,
                count,
            } => {
                let empty = BTreeMap::new();
                let hash = match self.get(&key, now) {
                    Some(entry) => entry.data.as_hash()?,
                    None => &empty,
                };
                let (next, window) = scan_window(hash.iter(), &cursor, count)?;
                let items = window
                    .into_iter()
                    .filter(|(f, _)| pattern.as_deref().map_or(true, |p| glob_match(p, f)))
                    .flat_map(|(f, v)| [Reply::Bulk(f.clone()), Reply::Bulk(v.clone())])
                    .collect();
                Ok(scan_reply(next, items))
            }

            // Lists
            Command::LPush { key, values } => self.push(&key, values, End::Left, now),
            Command::RPush { key, values } => self.push(&key, values, End::Right, now),
            Command::LPop { key, count } => self.pop(&key, count, End::Left, now),
            Command::RPop { key, count } => self.pop(&key, count, End::Right, now),
            Command::LLen { key } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_list()?.len() as i64,
                None => 0,
            })),
            Command::LRange { key, start, stop } => match self.get(&key, now) {
                Some(entry) => {
                    let list = entry.data.as_list()?;
                    Ok(Reply::bulks(match normalize_range(start, stop, list.len()) {
                        Some((from, to)) => list.range(from..=to).cloned().collect(),
                        None => Vec::new(),
                    }))
                }
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::LIndex { key, index } => match self.get(&key, now) {
                Some(entry) => {
                    let list = entry.data.as_list()?;
                    Ok(Reply::bulk_or_nil(
                        normalize_index(index, list.len()).and_then(|i| list.get(i).cloned()),
                    ))
                }
                None => Ok(Reply::Nil),
            },
            Command::LSet { key, index, value } => {
                {
                    let entry = self.get_mut(&key, now).ok_or(MemoryError::NoSuchKey)?;
                    let list = entry.data.as_list_mut()?;
                    let slot = normalize_index(index, list.len())
                        .and_then(|i| list.get_mut(i))
                        .ok_or(MemoryError::IndexOutOfRange)?;
                    *slot = value;
                }
                self.touch(&key);
                Ok(Reply::ok())
            }
            Command::LRem { key, count, value } => {
                let removed = match self.get_mut(&key, now) {
                    Some(entry) => remove_matching(entry.data.as_list_mut()?, count, &value),
                    None => 0,
                };
                if removed > 0 {
                    self.touch(&key);
                    self.drop_if_empty(&key);
                }
                Ok(Reply::Int(removed as i64))
            }
            Command::LTrim { key, start, stop } => {
                let trimmed = match self.get_mut(&key, now) {
                    Some(entry) => {
                        let list = entry.data.as_list_mut()?;
                        *list = match normalize_range(start, stop, list.len()) {
                            Some((from, to)) => list.range(from..=to).cloned().collect(),
                            None => VecDeque::new(),
                        };
                        true
                    }
                    None => false,
                };
                if trimmed {
                    self.touch(&key);
                    self.drop_if_empty(&key);
                }
                Ok(Reply::ok())
            }
            Command::LMove {
                source,
                destination,
                from,
                to,
            }
            | Command::BLMove {
                source,
                destination,
                from,
                to,
                ..
            } => self.lmove(&source, &destination, from, to, now),
            Command::RPopLPush {
                source,
                destination,
            } => self.lmove(&source, &destination, End::Right, End::Left, now),
            Command::BLPop { keys, .. } => self.pop_first(keys, End::Left, now),
            Command::BRPop { keys, .. } => self.pop_first(keys, End::Right, now),
            Command::LPos { key, value } => match self.get(&key, now) {
                Some(entry) => Ok(entry
                    .data
                    .as_list()?
                    .iter()
                    .position(|v| *v == value)
                    .map_or(Reply::Nil, |i| Reply::Int(i as i64))),
                None => Ok(Reply::Nil),
            },

            // Sets
            Command::SAdd { key, members } => {
                if members.is_empty() {
                    return Err(wrong_arity("sadd"));
                }
                let added = {
                    let set = self.entry_or(&key, now, set).data.as_set_mut()?;
                    members.into_iter().filter(|m| set.insert(m.clone())).count()
                };
                self.touch(&key);
                Ok(Reply::Int(added as i64))
            }
            Command::SRem { key, members } => {
                let removed = match self.get_mut(&key, now) {
                    Some(entry) => {
                        let set = entry.data.as_set_mut()?;
                        members.iter().filter(|m| set.remove(*m)).count()
                    }
                    None => 0,
                };
                if removed > 0 {
                    self.touch(&key);
                    self.drop_if_empty(&key);
                }
                Ok(Reply::Int(removed as i64))
            }
            Command::SMembers { key } => match self.get(&key, now) {
                Some(entry) => Ok(Reply::bulks(entry.data.as_set()?.iter().cloned())),
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::SIsMember { key, member } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_set()?.contains(&member) as i64,
                None => 0,
            })),
            Command::SCard { key } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_set()?.len() as i64,
                None => 0,
            })),
            Command::SPop { key, count } => {
                let popped = match self.get_mut(&key, now) {
                    Some(entry) => {
                        let set = entry.data.as_set_mut()?;
                        let mut rng = rand::thread_rng();
                        let mut popped = Vec::new();
                        for _ in 0..count.unwrap_or(1) {
                            if set.is_empty() {
                                break;
                            }
                            let idx = rng.gen_range(0..set.len());
                            if let Some(member) = set.iter().nth(idx).cloned() {
                                set.remove(&member);
                                popped.push(member);
                            }
                        }
                        popped
                    }
                    None => Vec::new(),
                };
                if !popped.is_empty() {
                    self.touch(&key);
                    self.drop_if_empty(&key);
                }
                Ok(match count {
                    Some(_) => Reply::bulks(popped),
                    None => Reply::bulk_or_nil(popped.into_iter().next()),
                })
            }
            Command::SMove {
                source,
                destination,
                member,
            } => {
                if let Some(entry) = self.get(&destination, now) {
                    entry.data.as_set()?;
                }
                let moved = match self.get_mut(&source, now) {
                    Some(entry) => entry.data.as_set_mut()?.remove(&member),
                    None => false,
                };
                if !moved {
                    return Ok(Reply::Int(0));
                }
                self.touch(&source);
                self.drop_if_empty(&source);
                self.entry_or(&destination, now, set)
                    .data
                    .as_set_mut()?
                    .insert(member);
                self.touch(&destination);
                Ok(Reply::Int(1))
            }
            Command::SInter { keys } => Ok(Reply::bulks(self.set_op(SetOp::Inter, &keys, now)?)),
            Command::SUnion { keys } => Ok(Reply::bulks(self.set_op(SetOp::Union, &keys, now)?)),
            Command::SDiff { keys } => Ok(Reply::bulks(self.set_op(SetOp::Diff, &keys, now)?)),
            Command::SInterStore { destination, keys } => {
                self.set_op_store(SetOp::Inter, destination, &keys, now)
            }
            Command::SUnionStore { destination, keys } => {
                self.set_op_store(SetOp::Union, destination, &keys, now)
            }
            Command::SDiffStore { destination, keys } => {
                self.set_op_store(SetOp::Diff, destination, &keys, now)
            }
            Command::SScan {
                key,
                cursor,
                pattern,
                count,
            } => {
                let empty = BTreeSet::new();
                let set = match self.get(&key, now) {
                    Some(entry) => entry.data.as_set()?,
                    None => &empty,
                };
                let (next, window) = scan_window(set.iter(), &cursor, count)?;
                let items = window
                    .into_iter()
                    .filter(|m| pattern.as_deref().map_or(true, |p| glob_match(p, m)))
                    .map(|m| Reply::Bulk(m.clone()))
                    .collect();
                Ok(scan_reply(next, items))
            }

            // Sorted sets
            Command::ZAdd { key, members } => {
                if members.is_empty() {
                    return Err(wrong_arity("zadd"));
                }
                if members.iter().any(|(score, _)| score.is_nan()) {
                    return Err(MemoryError::NotFloat);
                }
                let added = {
                    let zset = self.entry_or(&key, now, zset).data.as_zset_mut()?;
                    members
                        .into_iter()
                        .filter(|(score, member)| zset.insert(member.clone(), *score).is_none())
                        .count()
                };
                self.touch(&key);
                Ok(Reply::Int(added as i64))
            }
            Command::ZIncrBy { key, delta, member } => {
                let result = {
                    let zset = self.entry_or(&key, now, zset).data.as_zset_mut()?;
                    let next = zset.get(&member).copied().unwrap_or(0.0) + delta;
                    if next.is_nan() {
                        Err(MemoryError::NotFloat)
                    } else {
                        zset.insert(member, next);
                        Ok(next)
                    }
                };
                self.drop_if_empty(&key);
                let next = result?;
                self.touch(&key);
                Ok(Reply::Double(next))
            }
            Command::ZScore { key, member } => match self.get(&key, now) {
                Some(entry) => Ok(entry
                    .data
                    .as_zset()?
                    .get(&member)
                    .map_or(Reply::Nil, |s| Reply::Double(*s))),
                None => Ok(Reply::Nil),
            },
            Command::ZRank { key, member } => match self.get(&key, now) {
                Some(entry) => Ok(by_score(entry.data.as_zset()?)
                    .iter()
                    .position(|(m, _)| **m == member)
                    .map_or(Reply::Nil, |i| Reply::Int(i as i64))),
                None => Ok(Reply::Nil),
            },
            Command::ZRange {
                key,
                start,
                stop,
                with_scores,
            } => match self.get(&key, now) {
                Some(entry) => {
                    let sorted = by_score(entry.data.as_zset()?);
                    let window = match normalize_range(start, stop, sorted.len()) {
                        Some((from, to)) => &sorted[from..=to],
                        None => &[][..],
                    };
                    Ok(scored_reply(window, with_scores))
                }
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::ZRangeByScore {
                key,
                min,
                max,
                with_scores,
            } => match self.get(&key, now) {
                Some(entry) => {
                    let window: Vec<_> = by_score(entry.data.as_zset()?)
                        .into_iter()
                        .filter(|(_, s)| *s >= min && *s <= max)
                        .collect();
                    Ok(scored_reply(&window, with_scores))
                }
                None => Ok(Reply::Array(Vec::new())),
            },
            Command::ZRem { key, members } => {
                let removed = match self.get_mut(&key, now) {
                    Some(entry) => {
                        let zset = entry.data.as_zset_mut()?;
                        members.iter().filter(|m| zset.remove(*m).is_some()).count()
                    }
                    None => 0,
                };
                if removed > 0 {
                    self.touch(&key);
                    self.drop_if_empty(&key);
                }
                Ok(Reply::Int(removed as i64))
            }
            Command::ZCard { key } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry.data.as_zset()?.len() as i64,
                None => 0,
            })),
            Command::ZCount { key, min, max } => Ok(Reply::Int(match self.get(&key, now) {
                Some(entry) => entry
                    .data
                    .as_zset()?
                    .values()
                    .filter(|s| **s >= min && **s <= max)
                    .count() as i64,
                None => 0,
            })),
            Command::ZScan {
                key,
                cursor,
                pattern,
                count,
            } => {
                let empty = BTreeMap::new();
                let zset = match self.get(&key, now) {
                    Some(entry) => entry.data.as_zset()?,
                    None => &empty,
                };
                let (next, window) = scan_window(zset.iter(), &cursor, count)?;
                let items = window
                    .into_iter()
                    .filter(|(m, _)| pattern.as_deref().map_or(true, |p| glob_match(p, m)))
                    .flat_map(|(m, s)| [Reply::Bulk(m.clone()), Reply::Double(*s)])
                    .collect();
                Ok(scan_reply(next, items))
            }

            cmd @ (Command::Publish { .. }
            | Command::Watch { .. }
            | Command::Unwatch
            | Command::Multi
            | Command::Exec
            | Command::Discard) => Err(MemoryError::invalid(format!(
                "{} is handled by the connection",
                cmd.name()
            ))),
        }
    }

    // =========================================================================
    // Command helpers
    // =========================================================================

    fn expire_in(&mut self, key: &[u8], millis: i64, now: Instant) -> Result<Reply> {
        if self.get(key, now).is_none() {
            return Ok(Reply::Int(0));
        }
        if millis <= 0 {
            self.remove(key, now);
            return Ok(Reply::Int(1));
        }
        if let Some(entry) = self.entries.get_mut(key) {
            entry.expires_at = Some(now + Duration::from_millis(millis as u64));
        }
        self.touch(key);
        Ok(Reply::Int(1))
    }

    /// `None` if the key is missing, `Some(None)` if it never expires.
    fn remaining(&mut self, key: &[u8], now: Instant) -> Option<Option<Duration>> {
        self.get(key, now)
            .map(|e| e.expires_at.map(|t| t.saturating_duration_since(now)))
    }

    fn rename(&mut self, key: Vec<u8>, new_key: Vec<u8>, now: Instant) -> Result<()> {
        if key == new_key {
            return self.get(&key, now).map(|_| ()).ok_or(MemoryError::NoSuchKey);
        }
        let entry = self.remove(&key, now).ok_or(MemoryError::NoSuchKey)?;
        self.put(new_key, entry);
        Ok(())
    }

    fn set(
        &mut self,
        key: Vec<u8>,
        value: Vec<u8>,
        expiry: Option<Expiry>,
        condition: Option<SetCondition>,
        get: bool,
        now: Instant,
    ) -> Result<Reply> {
        let (exists, old, old_expiry) = match self.get(&key, now) {
            Some(entry) => {
                let old = if get {
                    Reply::Bulk(entry.data.as_str()?.clone())
                } else {
                    Reply::Nil
                };
                (true, old, entry.expires_at)
            }
            None => (false, Reply::Nil, None),
        };
        let blocked = match condition {
            Some(SetCondition::IfAbsent) => exists,
            Some(SetCondition::IfPresent) => !exists,
            None => false,
        };
        if blocked {
            return Ok(if get { old } else { Reply::Nil });
        }
        let expires_at = match expiry {
            None => None,
            Some(Expiry::KeepTtl) => old_expiry,
            Some(Expiry::Seconds(0)) | Some(Expiry::Millis(0)) => {
                return Err(MemoryError::invalid("invalid expire time in 'set' command"))
            }
            Some(Expiry::Seconds(s)) => Some(now + Duration::from_secs(s)),
            Some(Expiry::Millis(ms)) => Some(now + Duration::from_millis(ms)),
        };
        self.put(
            key,
            Entry {
                data: Data::Str(value),
                expires_at,
            },
        );
        Ok(if get { old } else { Reply::ok() })
    }

    fn push(&mut self, key: &[u8], values: Vec<Vec<u8>>, end: End, now: Instant) -> Result<Reply> {
        if values.is_empty() {
            return Err(wrong_arity("push"));
        }
        let len = {
            let list = self.entry_or(key, now, list).data.as_list_mut()?;
            for value in values {
                match end {
                    End::Left => list.push_front(value),
                    End::Right => list.push_back(value),
                }
            }
            list.len()
        };
        self.touch(key);
        Ok(Reply::Int(len as i64))
    }

    fn pop(&mut self, key: &[u8], count: Option<usize>, end: End, now: Instant) -> Result<Reply> {
        let popped = match self.get_mut(key, now) {
            Some(entry) => {
                let list = entry.data.as_list_mut()?;
                let n = count.unwrap_or(1).min(list.len());
                (0..n)
                    .filter_map(|_| match end {
                        End::Left => list.pop_front(),
                        End::Right => list.pop_back(),
                    })
                    .collect::<Vec<_>>()
            }
            None => return Ok(Reply::Nil),
        };
        if !popped.is_empty() {
            self.touch(key);
            self.drop_if_empty(key);
        }
        Ok(match count {
            Some(_) => Reply::bulks(popped),
            None => Reply::bulk_or_nil(popped.into_iter().next()),
        })
    }

    fn pop_first(&mut self, keys: Vec<Vec<u8>>, end: End, now: Instant) -> Result<Reply> {
        for key in keys {
            if let Reply::Bulk(value) = self.pop(&key, None, end, now)? {
                return Ok(Reply::bulks([key, value]));
            }
        }
        Ok(Reply::Nil)
    }

    fn lmove(
        &mut self,
        source: &[u8],
        destination: &[u8],
        from: End,
        to: End,
        now: Instant,
    ) -> Result<Reply> {
        if let Some(entry) = self.get(destination, now) {
            entry.data.as_list()?;
        }
        let value = match self.pop(source, None, from, now)? {
            Reply::Bulk(value) => value,
            _ => return Ok(Reply::Nil),
        };
        {
            let list = self.entry_or(destination, now, list).data.as_list_mut()?;
            match to {
                End::Left => list.push_front(value.clone()),
                End::Right => list.push_back(value.clone()),
            }
        }
        self.touch(destination);
        Ok(Reply::Bulk(value))
    }

    fn set_op(&mut self, op: SetOp, keys: &[Vec<u8>], now: Instant) -> Result<BTreeSet<Vec<u8>>> {
        let (first, rest) = keys.split_first().ok_or_else(|| wrong_arity("set operation"))?;
        let mut acc = self.load_set(first, now)?;
        for key in rest {
            let other = self.load_set(key, now)?;
            match op {
                SetOp::Inter => acc.retain(|m| other.contains(m)),
                SetOp::Union => acc.extend(other),
                SetOp::Diff => acc.retain(|m| !other.contains(m)),
            }
        }
        Ok(acc)
    }

    fn set_op_store(
        &mut self,
        op: SetOp,
        destination: Vec<u8>,
        keys: &[Vec<u8>],
        now: Instant,
    ) -> Result<Reply> {
        let result = self.set_op(op, keys, now)?;
        let len = result.len();
        self.remove(&destination, now);
        if !result.is_empty() {
            self.put(destination, Entry::new(Data::Set(result)));
        }
        Ok(Reply::Int(len as i64))
    }

    fn load_set(&mut self, key: &[u8], now: Instant) -> Result<BTreeSet<Vec<u8>>> {
        match self.get(key, now) {
            Some(entry) => Ok(entry.data.as_set()?.clone()),
            None => Ok(BTreeSet::new()),
        }
    }
}

fn hash() -> Data {
    Data::Hash(BTreeMap::new())
}

fn list() -> Data {
    Data::List(VecDeque::new())
}

fn set() -> Data {
    Data::Set(BTreeSet::new())
}

fn zset() -> Data {
    Data::ZSet(BTreeMap::new())
}

fn wrong_arity(command: &str) -> MemoryError {
    MemoryError::invalid(format!("wrong number of arguments for '{}' command", command))
}

fn parse_int(raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or(MemoryError::NotInteger)
}

fn parse_float(raw: &[u8]) -> Result<f64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|f| f.is_finite())
        .ok_or(MemoryError::NotFloat)
}

fn format_float(value: f64) -> Vec<u8> {
    value.to_string().into_bytes()
}

/// Resolve a possibly negative inclusive range against `len`.
fn normalize_range(start: i64, stop: i64, len: usize) -> Option<(usize, usize)> {
    let len = len as i64;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let idx = if index < 0 { len as i64 + index } else { index };
    (0..len as i64).contains(&idx).then_some(idx as usize)
}

fn remove_matching(list: &mut VecDeque<Vec<u8>>, count: i64, value: &[u8]) -> usize {
    let limit = if count == 0 {
        usize::MAX
    } else {
        count.unsigned_abs() as usize
    };
    let mut removed = 0;
    let mut keep = |v: &Vec<u8>| {
        if removed < limit && v.as_slice() == value {
            removed += 1;
            false
        } else {
            true
        }
    };
    if count >= 0 {
        list.retain(|v| keep(v));
    } else {
        let mut reversed: Vec<Vec<u8>> = list.drain(..).rev().collect();
        reversed.retain(|v| keep(v));
        list.extend(reversed.into_iter().rev());
    }
    removed
}

fn by_score(zset: &BTreeMap<Vec<u8>, f64>) -> Vec<(&Vec<u8>, f64)> {
    let mut sorted: Vec<(&Vec<u8>, f64)> = zset.iter().map(|(m, s)| (m, *s)).collect();
    sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    sorted
}

fn scored_reply(window: &[(&Vec<u8>, f64)], with_scores: bool) -> Reply {
    Reply::Array(
        window
            .iter()
            .flat_map(|(m, s)| {
                let member = Reply::Bulk((*m).clone());
                if with_scores {
                    vec![member, Reply::Double(*s)]
                } else {
                    vec![member]
                }
            })
            .collect(),
    )
}

/// Select the page starting at `cursor` positions into `items`.
fn scan_window<I: ExactSizeIterator>(
    items: I,
    cursor: &str,
    count: Option<usize>,
) -> Result<(u64, Vec<I::Item>)> {
    let position: usize = cursor
        .parse()
        .map_err(|_| MemoryError::invalid("invalid cursor"))?;
    let count = count.unwrap_or(DEFAULT_SCAN_COUNT);
    if count == 0 {
        return Err(MemoryError::invalid("syntax error"));
    }
    let len = items.len();
    let window: Vec<I::Item> = items.skip(position).take(count).collect();
    let next = position.saturating_add(window.len());
    Ok((if next >= len { 0 } else { next as u64 }, window))
}

fn scan_reply(next: u64, items: Vec<Reply>) -> Reply {
    Reply::Array(vec![
        Reply::Bulk(next.to_string().into_bytes()),
        Reply::Array(items),
    ])
}

/// A keyspace shared by every connection of one backend (or one shard).
#[derive(Debug, Default)]
pub struct Keyspace {
    db: Mutex<Db>,
    changed: Condvar,
}

impl Keyspace {
    /// An empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one non-blocking command atomically.
    pub fn apply(&self, cmd: Command) -> Result<Reply> {
        let reply = self.db.lock().execute(cmd, Instant::now());
        self.changed.notify_all();
        reply
    }

    /// Run a blocking command, waiting for data until its timeout.
    ///
    /// `is_closed` is polled between waits; once it returns `true` the call
    /// fails with [`MemoryError::Closed`].
    pub fn apply_blocking(&self, cmd: Command, is_closed: &dyn Fn() -> bool) -> Result<Reply> {
        let timeout_ms = cmd.blocking_timeout().unwrap_or(0);
        let deadline = (timeout_ms > 0).then(|| Instant::now() + Duration::from_millis(timeout_ms));
        let mut db = self.db.lock();
        loop {
            if is_closed() {
                return Err(MemoryError::Closed);
            }
            let reply = db.execute(cmd.clone(), Instant::now())?;
            if !reply.is_nil() {
                drop(db);
                self.changed.notify_all();
                return Ok(reply);
            }
            let now = Instant::now();
            let wait = match deadline {
                Some(d) if d <= now => return Ok(Reply::Nil),
                Some(d) => (d - now).min(WAIT_SLICE),
                None => WAIT_SLICE,
            };
            self.changed.wait_for(&mut db, wait);
        }
    }

    /// Current modification version of `key`; `0` if never written.
    pub fn version(&self, key: &[u8]) -> u64 {
        self.db.lock().version(key, Instant::now())
    }

    /// Apply a transaction queue if no watched key changed.
    ///
    /// Returns `None` when a watched version differs. Individual command
    /// failures become `Reply::Error` entries; the rest of the queue still
    /// runs. `PUBLISH` entries are handed to `publish`.
    pub fn exec(
        &self,
        watched: &FxHashMap<Vec<u8>, u64>,
        queued: Vec<Command>,
        publish: &dyn Fn(&[u8], &[u8]) -> usize,
    ) -> Option<Vec<Reply>> {
        let now = Instant::now();
        let mut db = self.db.lock();
        if watched.iter().any(|(key, v)| db.version(key, now) != *v) {
            return None;
        }
        let replies = queued
            .into_iter()
            .map(|cmd| match cmd {
                Command::Publish { channel, message } => {
                    Reply::Int(publish(&channel, &message) as i64)
                }
                Command::Unwatch => Reply::ok(),
                cmd => db
                    .execute(cmd, now)
                    .unwrap_or_else(|e| Reply::Error(e.to_string())),
            })
            .collect();
        drop(db);
        self.changed.notify_all();
        Some(replies)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let mut db = self.db.lock();
        db.purge_expired(Instant::now());
        db.entries.len()
    }

    /// Returns `true` if no live key exists.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
