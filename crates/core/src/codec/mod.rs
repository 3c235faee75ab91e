//! Value codec.
//!
//! Converts application values to store payloads and back. One [`Encoding`]
//! is chosen per facade and used for every value it writes.
//!
//! Two decode paths exist:
//!
//! - [`ValueCodec::decode`]: statically typed through serde. The Rust type
//!   names the full nesting (`Vec<HashMap<String, Foo>>`), so there is nothing
//!   to under-specify.
//! - [`ValueCodec::decode_as`]: driven by a runtime [`TypeDescriptor`]; every
//!   nested shape is checked and a mismatch is reported with its path.
//!
//! Failures on either path are `Deserialization` errors scoped to the one
//! payload; encode failures are `Usage` errors.

mod conform;

use std::borrow::Cow;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::shape::{ShapeTree, TypeDescriptor};
use crate::value::Value;

pub use conform::conform;

/// Payload encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    /// UTF-8 JSON, readable by other clients and by `INCR` on plain integers
    #[default]
    #[serde(rename = "json")]
    Json,
    /// MessagePack with named struct fields
    #[serde(rename = "msgpack")]
    MessagePack,
}

impl Encoding {
    /// Configuration name of the encoding.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Json => "json",
            Encoding::MessagePack => "msgpack",
        }
    }
}

/// Result of a descriptor-directed decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Payload bytes, unchanged (`TypeDescriptor::Raw`)
    Raw(Vec<u8>),
    /// A value conforming to the requested shape
    Value(Value),
}

impl Decoded {
    /// The decoded value, if this is not a raw result.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Decoded::Value(v) => Some(v),
            Decoded::Raw(_) => None,
        }
    }

    /// The raw bytes, if this is a raw result.
    pub fn into_raw(self) -> Option<Vec<u8>> {
        match self {
            Decoded::Raw(b) => Some(b),
            Decoded::Value(_) => None,
        }
    }
}

/// Encodes and decodes stored values with one fixed [`Encoding`].
///
/// Immutable after construction and safe to share between threads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueCodec {
    encoding: Encoding,
}

impl ValueCodec {
    /// Create a codec for the given encoding.
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    /// JSON codec.
    pub fn json() -> Self {
        Self::new(Encoding::Json)
    }

    /// MessagePack codec.
    pub fn msgpack() -> Self {
        Self::new(Encoding::MessagePack)
    }

    /// The configured encoding.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Serialize any value.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        let out = match self.encoding {
            Encoding::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
            Encoding::MessagePack => rmp_serde::to_vec_named(value).map_err(|e| e.to_string()),
        };
        out.map_err(|reason| {
            Error::usage(format!(
                "cannot encode value as {}: {}",
                self.encoding.name(),
                reason
            ))
        })
    }

    /// Serialize a dynamic value.
    ///
    /// JSON has no representation for NaN or infinities, so they are rejected
    /// instead of being silently written as `null`.
    pub fn encode_value(&self, value: &Value) -> Result<Vec<u8>> {
        if self.encoding == Encoding::Json && value.has_non_finite() {
            return Err(Error::usage("cannot encode non-finite float as json"));
        }
        self.encode(value)
    }

    /// Deserialize a payload into `T`.
    pub fn decode<T: DeserializeOwned>(&self, payload: &[u8]) -> Result<T> {
        let out = match self.encoding {
            Encoding::Json => serde_json::from_slice(payload).map_err(|e| e.to_string()),
            Encoding::MessagePack => rmp_serde::from_slice(payload).map_err(|e| e.to_string()),
        };
        out.map_err(|reason| {
            tracing::trace!(
                target: "redstone::codec",
                encoding = self.encoding.name(),
                len = payload.len(),
                "typed decode failed"
            );
            Error::deserialization(format!(
                "cannot decode {} payload into {}: {}",
                self.encoding.name(),
                std::any::type_name::<T>(),
                reason
            ))
        })
    }

    /// Deserialize a payload without a shape.
    pub fn decode_value(&self, payload: &[u8]) -> Result<Value> {
        self.decode::<Value>(payload)
    }

    /// Decode a payload as described by `descriptor`.
    pub fn decode_as(&self, payload: &[u8], descriptor: &TypeDescriptor) -> Result<Decoded> {
        let tree = match descriptor {
            TypeDescriptor::Raw => return Ok(Decoded::Raw(payload.to_vec())),
            TypeDescriptor::Simple(id) => Cow::Owned(ShapeTree::from(id.clone())),
            TypeDescriptor::Parameterized(tree) => Cow::Borrowed(tree),
        };
        let value = self.decode_value(payload)?;
        conform(value, &tree).map(Decoded::Value).map_err(|e| {
            tracing::trace!(target: "redstone::codec", error = %e, "shape mismatch");
            e
        })
    }
}
