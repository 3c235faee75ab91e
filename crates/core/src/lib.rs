//! Core types for Redstone
//!
//! This crate defines the pieces every command method shares:
//! - KeyCodec: namespace prefixing for text and byte keys
//! - Value: dynamic value produced by shape-directed decoding
//! - TypeDescriptor / ShapeTree: runtime description of an expected shape
//! - ValueCodec: JSON or MessagePack payload encoding
//! - ScanCursor / Scan: resumable incremental iteration
//! - Error: the closed error taxonomy
//! - RedstoneConfig: TOML configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod config;
pub mod cursor;
pub mod error;
pub mod key;
pub mod shape;
pub mod value;

pub use codec::{Decoded, Encoding, ValueCodec};
pub use config::{BackendConfig, RedstoneConfig, RetryConfig};
pub use cursor::{CursorToken, Scan, ScanCursor, ScanItems, ScanPage, ScanParams, ScanState};
pub use error::{Error, ErrorKind, Result};
pub use key::{escape_glob, KeyCodec};
pub use shape::{Container, FieldSchema, RecordSchema, ShapeId, ShapeTree, TypeDescriptor};
pub use value::Value;
