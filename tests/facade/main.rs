//! Facade Integration Tests
//!
//! End-to-end tests for the redstone facade over both reference backends:
//! - Namespacing and key listings
//! - Every command family (strings, hashes, lists, sets, sorted sets)
//! - Scan cursors over large keyspaces
//! - Blocking pops, pub/sub and transactions
//! - Connection lifecycle, retry and configuration
//! - Sharded routing

mod common;

mod blocking;
mod config;
mod connections;
mod keys;
mod lists;
mod properties;
mod pubsub;
mod scan;
mod sets;
mod sharded;
mod strings;
mod transactions;
mod zsets;
