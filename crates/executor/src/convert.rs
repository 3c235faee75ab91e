//! Reply shape conversion.
//!
//! Each helper accepts exactly the reply shapes its command can produce and
//! reports anything else as [`Error::unexpected_reply`].

use redstone_core::{CursorToken, Error, Result};
use redstone_storage::Reply;

pub(crate) fn ok(cmd: &str, reply: Reply) -> Result<()> {
    match reply {
        reply if reply.is_ok() => Ok(()),
        other => Err(Error::unexpected_reply(cmd, other)),
    }
}

pub(crate) fn status(cmd: &str, reply: Reply) -> Result<String> {
    match reply {
        Reply::Status(s) => Ok(s),
        other => Err(Error::unexpected_reply(cmd, other)),
    }
}

pub(crate) fn int(cmd: &str, reply: Reply) -> Result<i64> {
    match reply {
        Reply::Int(n) => Ok(n),
        other => Err(Error::unexpected_reply(cmd, other)),
    }
}

pub(crate) fn opt_int(cmd: &str, reply: Reply) -> Result<Option<i64>> {
    match reply {
        Reply::Nil => Ok(None),
        other => int(cmd, other).map(Some),
    }
}

pub(crate) fn boolean(cmd: &str, reply: Reply) -> Result<bool> {
    int(cmd, reply).map(|n| n != 0)
}

pub(crate) fn double(cmd: &str, reply: Reply) -> Result<f64> {
    match reply {
        Reply::Double(f) => Ok(f),
        other => Err(Error::unexpected_reply(cmd, other)),
    }
}

pub(crate) fn opt_double(cmd: &str, reply: Reply) -> Result<Option<f64>> {
    match reply {
        Reply::Nil => Ok(None),
        other => double(cmd, other).map(Some),
    }
}

pub(crate) fn bulk(cmd: &str, reply: Reply) -> Result<Vec<u8>> {
    match reply {
        Reply::Bulk(b) => Ok(b),
        other => Err(Error::unexpected_reply(cmd, other)),
    }
}

pub(crate) fn opt_bulk(cmd: &str, reply: Reply) -> Result<Option<Vec<u8>>> {
    match reply {
        Reply::Nil => Ok(None),
        other => bulk(cmd, other).map(Some),
    }
}

pub(crate) fn array(cmd: &str, reply: Reply) -> Result<Vec<Reply>> {
    match reply {
        Reply::Array(items) => Ok(items),
        other => Err(Error::unexpected_reply(cmd, other)),
    }
}

/// An array reply, or `None` for nil (counted pops on a missing key).
pub(crate) fn opt_array(cmd: &str, reply: Reply) -> Result<Option<Vec<Reply>>> {
    match reply {
        Reply::Nil => Ok(None),
        other => array(cmd, other).map(Some),
    }
}

pub(crate) fn bulks(cmd: &str, reply: Reply) -> Result<Vec<Vec<u8>>> {
    array(cmd, reply)?
        .into_iter()
        .map(|item| bulk(cmd, item))
        .collect()
}

pub(crate) fn opt_bulks(cmd: &str, reply: Reply) -> Result<Vec<Option<Vec<u8>>>> {
    array(cmd, reply)?
        .into_iter()
        .map(|item| opt_bulk(cmd, item))
        .collect()
}

/// Flat `[a1, b1, a2, b2, ...]` array into pairs.
pub(crate) fn pairs<A, B>(
    cmd: &str,
    reply: Reply,
    first: impl Fn(&str, Reply) -> Result<A>,
    second: impl Fn(&str, Reply) -> Result<B>,
) -> Result<Vec<(A, B)>> {
    let items = array(cmd, reply)?;
    if items.len() % 2 != 0 {
        return Err(Error::command(format!(
            "unexpected reply for {}: odd number of elements ({})",
            cmd,
            items.len()
        )));
    }
    let mut out = Vec::with_capacity(items.len() / 2);
    let mut iter = items.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        out.push((first(cmd, a)?, second(cmd, b)?));
    }
    Ok(out)
}

/// `[cursor, [items...]]` from any of the scan commands.
pub(crate) fn scan(cmd: &str, reply: Reply) -> Result<(CursorToken, Reply)> {
    let mut parts = array(cmd, reply)?.into_iter();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(Reply::Bulk(cursor)), Some(items @ Reply::Array(_)), None) => {
            Ok((CursorToken::new(text(cmd, cursor)?), items))
        }
        (cursor, items, _) => Err(Error::unexpected_reply(cmd, (cursor, items))),
    }
}

/// Decode a key or field name returned by the store.
pub(crate) fn text(cmd: &str, raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|e| {
        Error::deserialization(format!("{} returned a name that is not UTF-8: {}", cmd, e))
    })
}
