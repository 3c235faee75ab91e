//! Blocking pop tests: wakeups, timeouts and cancellation by closing

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::*;
use redstone::{End, ErrorKind, MemoryBackend, Redstone};

#[test]
fn blpop_returns_immediately_when_data_exists() {
    let (db, _backend) = create_prefixed("app:");
    db.rpush("jobs", &["first", "second"]).unwrap();

    let popped: Option<(String, String)> = db
        .blpop(&["empty", "jobs"], Some(Duration::from_secs(1)))
        .unwrap();

    assert_eq!(popped, Some(("jobs".to_string(), "first".to_string())));
}

#[test]
fn raw_blocking_pops_return_stored_bytes() {
    let (db, backend) = create_prefixed("app:");
    db.rpush_raw("q", &["plain-text-from-other-client", "tail"]).unwrap();
    let wait = Some(Duration::from_millis(200));

    assert_eq!(
        db.blpop_raw(&["q"], wait).unwrap(),
        Some((b"q".to_vec(), b"plain-text-from-other-client".to_vec()))
    );
    assert_eq!(
        db.blmove_raw("q", "done", End::Left, End::Right, wait).unwrap(),
        Some(b"tail".to_vec())
    );
    assert_eq!(
        db.brpop_raw(&["done"], wait).unwrap(),
        Some((b"done".to_vec(), b"tail".to_vec()))
    );
    assert_eq!(db.brpop_raw(&["done"], Some(Duration::from_millis(30))).unwrap(), None);
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn typed_blpop_reports_undecodable_element() {
    let db = create_db();
    db.rpush_raw("q", &["plain-text-from-other-client"]).unwrap();

    let err = db
        .blpop::<String, _>(&["q"], Some(Duration::from_millis(200)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Deserialization);
    assert_eq!(db.llen("q").unwrap(), 0);
}

#[test]
fn brpop_times_out_with_none() {
    let (db, backend) = create_db_with_backend();

    let start = Instant::now();
    let popped: Option<(String, i32)> = db
        .brpop(&["nothing"], Some(Duration::from_millis(80)))
        .unwrap();

    assert_eq!(popped, None);
    assert!(start.elapsed() >= Duration::from_millis(80));
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn blpop_wakes_on_push_from_another_thread() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend.clone()).build());

    let producer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            db.rpush("queue", &[99]).unwrap();
        })
    };

    let popped: Option<(String, i32)> = db.blpop(&["queue"], None).unwrap();
    producer.join().unwrap();

    assert_eq!(popped, Some(("queue".to_string(), 99)));
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn blmove_moves_when_data_arrives() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend).build());

    let producer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            db.lpush("in", &["task"]).unwrap();
        })
    };

    let moved: Option<String> = db
        .blmove("in", "processing", End::Right, End::Left, Some(Duration::from_secs(5)))
        .unwrap();
    producer.join().unwrap();

    assert_eq!(moved.as_deref(), Some("task"));
    assert_eq!(db.llen("processing").unwrap(), 1);
}

#[test]
fn close_all_cancels_an_infinite_wait() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend.clone()).build());

    let waiter = {
        let db = Arc::clone(&db);
        thread::spawn(move || db.blpop::<i32, _>(&["never"], None))
    };

    // Wait until the blocking call holds its connection.
    let deadline = Instant::now() + Duration::from_secs(5);
    while backend.active_connections() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    backend.close_all();

    let err = waiter.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(backend.active_connections(), 0);

    // New connections are unaffected.
    assert_eq!(db.ping().unwrap(), "PONG");
}
