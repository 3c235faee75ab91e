//! Key namespacing.
//!
//! A [`KeyCodec`] holds an optional prefix fixed at construction. Every key the
//! facade sends to the store passes through it. The transform is a plain
//! concatenation: it never checks whether the key already carries the prefix,
//! so applying it twice yields the prefix twice.
//!
//! Text keys stay text and byte keys stay bytes; for the same logical key both
//! forms produce byte-identical store keys.

use std::borrow::Cow;

/// Applies an optional namespace prefix to outbound keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: Option<String>,
}

impl KeyCodec {
    /// Create a codec. An empty prefix behaves exactly like no prefix.
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.filter(|p| !p.is_empty()),
        }
    }

    /// A codec that prefixes every key with `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    /// The configured prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Prefix a text key. Borrows the input when no prefix is configured.
    pub fn key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        match &self.prefix {
            None => Cow::Borrowed(key),
            Some(p) => {
                let mut out = String::with_capacity(p.len() + key.len());
                out.push_str(p);
                out.push_str(key);
                Cow::Owned(out)
            }
        }
    }

    /// Prefix a byte key. Borrows the input when no prefix is configured.
    pub fn raw_key<'a>(&self, key: &'a [u8]) -> Cow<'a, [u8]> {
        match &self.prefix {
            None => Cow::Borrowed(key),
            Some(p) => {
                let mut out = Vec::with_capacity(p.len() + key.len());
                out.extend_from_slice(p.as_bytes());
                out.extend_from_slice(key);
                Cow::Owned(out)
            }
        }
    }

    /// Prefix a batch of text keys, preserving order and length.
    pub fn keys<'a, S: AsRef<str>>(&self, keys: &'a [S]) -> Vec<Cow<'a, str>> {
        keys.iter().map(|k| self.key(k.as_ref())).collect()
    }

    /// Prefix a batch of byte keys, preserving order and length.
    pub fn raw_keys<'a, K: AsRef<[u8]>>(&self, keys: &'a [K]) -> Vec<Cow<'a, [u8]>> {
        keys.iter().map(|k| self.raw_key(k.as_ref())).collect()
    }

    /// Prefix any key form into an owned store key.
    pub fn encode(&self, key: impl AsRef<[u8]>) -> Vec<u8> {
        self.raw_key(key.as_ref()).into_owned()
    }

    /// Prefix a batch of keys of any form into owned store keys.
    pub fn encode_all<K: AsRef<[u8]>>(&self, keys: &[K]) -> Vec<Vec<u8>> {
        keys.iter().map(|k| self.encode(k)).collect()
    }

    /// Remove one leading prefix from a key returned by the store.
    ///
    /// Keys outside the namespace are returned unchanged.
    pub fn strip<'a>(&self, key: &'a [u8]) -> &'a [u8] {
        match &self.prefix {
            Some(p) => key.strip_prefix(p.as_bytes()).unwrap_or(key),
            None => key,
        }
    }

    /// Scope a glob pattern to the namespace.
    ///
    /// The prefix is matched literally: its glob metacharacters are escaped.
    /// With a prefix configured, a missing pattern becomes `prefix*` so that
    /// iteration never leaves the namespace.
    pub fn pattern(&self, pattern: Option<&str>) -> Option<String> {
        let prefix = match &self.prefix {
            None => return pattern.map(str::to_owned),
            Some(prefix) => prefix,
        };
        let tail = pattern.unwrap_or("*");
        let mut out = String::with_capacity(prefix.len() * 2 + tail.len());
        out.push_str(&escape_glob(prefix));
        out.push_str(tail);
        Some(out)
    }
}

/// Escape every glob metacharacter so `text` matches only itself.
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
