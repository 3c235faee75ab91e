//! Connection lifecycle tests: release on every path, pool limits, retry

use std::time::Duration;

use crate::common::*;
use redstone::{Command, ErrorKind, MemoryBackend, Redstone, Reply, RetryPolicy};

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::new(max_retries, Duration::from_millis(1), Duration::from_millis(5))
}

#[test]
fn every_exit_path_releases_the_connection() {
    let (db, backend) = create_db_with_backend();
    db.set("s", &"x").unwrap();

    let _ = db.get::<String>("s");
    let _ = db.get::<i64>("s"); // decode failure
    let _ = db.lpush("s", &[1]); // command failure
    let _ = db.keys("*");
    let _ = db.scan(redstone::ScanParams::new().count(1)).count();

    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn decode_failure_is_deserialization_not_command() {
    let db = create_db();
    db.set("s", &"text").unwrap();

    let err = db.get::<i64>("s").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Deserialization);
}

#[test]
fn pool_limit_reports_connection_error() {
    init_tracing();
    let backend = MemoryBackend::with_max_connections(1);
    let db = Redstone::builder(backend.clone()).build();

    let result = db.execute(|handle| {
        handle.call(Command::DbSize)?;
        Ok(db.ping())
    });

    let inner = result.unwrap();
    assert_eq!(inner.unwrap_err().kind(), ErrorKind::Connection);
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn refused_connects_are_retried_per_policy() {
    init_tracing();
    let backend = MemoryBackend::new();
    let db = Redstone::builder(backend.clone())
        .retry(fast_retry(3))
        .build();

    backend.fail_next_connects(3);
    assert_eq!(db.ping().unwrap(), "PONG");

    backend.fail_next_connects(4);
    assert_eq!(db.ping().unwrap_err().kind(), ErrorKind::Connection);
}

#[test]
fn command_escape_hatch_sends_keys_verbatim() {
    let (db, backend) = create_prefixed("app:");

    db.command(Command::Set {
        key: b"raw".to_vec(),
        value: b"1".to_vec(),
        expiry: None,
        condition: None,
        get: false,
    })
    .unwrap();

    assert_eq!(
        unprefixed(&backend).get_raw("raw").unwrap(),
        Some(b"1".to_vec())
    );
    assert_eq!(db.get_raw("raw").unwrap(), None);
    assert_eq!(
        db.command(Command::Get { key: b"raw".to_vec() }).unwrap(),
        Reply::Bulk(b"1".to_vec())
    );
}

#[test]
fn facade_is_shareable_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Redstone<MemoryBackend>>();
    assert_send_sync::<Redstone<redstone::ShardedBackend>>();
}
