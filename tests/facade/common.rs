//! Common test utilities for facade tests

#![allow(dead_code)]

use std::sync::Once;

use redstone::{MemoryBackend, Redstone, Result, ShardedBackend};

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness, once per binary.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::WARN)
            .try_init();
    });
}

/// Create a facade over a fresh in-memory store, without a prefix
pub fn create_db() -> Redstone<MemoryBackend> {
    create_db_with_backend().0
}

/// Create a facade and keep a handle on its backend for inspection
pub fn create_db_with_backend() -> (Redstone<MemoryBackend>, MemoryBackend) {
    init_tracing();
    let backend = MemoryBackend::new();
    (Redstone::builder(backend.clone()).build(), backend)
}

/// Create a facade namespaced under `prefix`
pub fn create_prefixed(prefix: &str) -> (Redstone<MemoryBackend>, MemoryBackend) {
    init_tracing();
    let backend = MemoryBackend::new();
    (
        Redstone::builder(backend.clone()).prefix(prefix).build(),
        backend,
    )
}

/// A second, unprefixed facade over the same store
pub fn unprefixed(backend: &MemoryBackend) -> Redstone<MemoryBackend> {
    Redstone::builder(backend.clone()).build()
}

/// Create a facade over a sharded in-memory store
pub fn create_sharded(shards: usize) -> (Redstone<ShardedBackend>, ShardedBackend) {
    init_tracing();
    let backend = ShardedBackend::new(shards);
    (Redstone::builder(backend.clone()).build(), backend)
}

/// Unwrap every per-element result, panicking with the index on failure
pub fn all_ok<T>(items: Vec<Result<T>>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| item.unwrap_or_else(|e| panic!("element {} failed: {}", i, e)))
        .collect()
}

/// Sorted copy, for comparing unordered replies
pub fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort();
    items
}
