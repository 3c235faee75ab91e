//! Transaction tests through the public facade

use std::sync::Arc;
use std::thread;

use crate::common::*;
use redstone::{ErrorKind, MemoryBackend, Redstone, Reply};

#[test]
fn transfer_commits_atomically() {
    let (db, backend) = create_prefixed("bank:");
    db.mset(&[("alice", 100i64), ("bob", 0)]).unwrap();

    let replies = db
        .transaction(&["alice", "bob"], |tx| {
            let alice: i64 = tx.get("alice")?.unwrap_or(0);
            if alice < 30 {
                return Err(redstone::Error::usage("insufficient funds"));
            }
            tx.incr_by("alice", -30)?;
            tx.incr_by("bob", 30)
        })
        .unwrap()
        .expect("no concurrent writer");

    assert_eq!(replies, vec![Reply::Int(70), Reply::Int(30)]);
    assert_eq!(db.get::<i64>("alice").unwrap(), Some(70));
    assert_eq!(db.get::<i64>("bob").unwrap(), Some(30));
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn conflict_returns_none_and_retry_succeeds() {
    let (db, backend) = create_prefixed("app:");
    let intruder = unprefixed(&backend);
    db.set("counter", &0i64).unwrap();

    let mut attempts = 0;
    let replies = loop {
        attempts += 1;
        let outcome = db
            .transaction(&["counter"], |tx| {
                let current: i64 = tx.get("counter")?.unwrap_or(0);
                if attempts == 1 {
                    intruder.incr("app:counter")?;
                }
                tx.set("counter", &(current + 10))
            })
            .unwrap();
        if let Some(replies) = outcome {
            break replies;
        }
    };

    assert_eq!(attempts, 2);
    assert_eq!(replies, vec![Reply::ok()]);
    assert_eq!(db.get::<i64>("counter").unwrap(), Some(11));
}

#[test]
fn buffered_publish_only_goes_out_on_commit() {
    let db = create_db();

    let replies = db
        .multi(|tx| {
            tx.sadd("seen", &["a"])?;
            tx.publish("updates", "a")
        })
        .unwrap();

    assert_eq!(replies, vec![Reply::Int(1), Reply::Int(0)]);
}

#[test]
fn mixed_writes_in_one_block() {
    let db = create_db();

    let replies = db
        .multi(|tx| {
            tx.hset("h", "f", &1)?;
            tx.lpush("l", &[1, 2])?;
            tx.zadd("z", &[(1.0, "m")])?;
            tx.set_raw("r", b"bytes")?;
            tx.del(&["nothing"])?;
            tx.expire("r", std::time::Duration::from_secs(60))
        })
        .unwrap();

    assert_eq!(
        replies,
        vec![
            Reply::Int(1),
            Reply::Int(2),
            Reply::Int(1),
            Reply::ok(),
            Reply::Int(0),
            Reply::Int(1)
        ]
    );
    assert!(db.ttl("r").unwrap() > 0);
}

#[test]
fn concurrent_increments_never_lose_updates() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend.clone()).build());
    db.set("n", &0i64).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..25 {
                    loop {
                        let committed = db
                            .transaction(&["n"], |tx| {
                                let n: i64 = tx.get("n")?.unwrap_or(0);
                                tx.set("n", &(n + 1))
                            })
                            .unwrap();
                        if committed.is_some() {
                            break;
                        }
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(db.get::<i64>("n").unwrap(), Some(100));
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn closure_error_releases_watch() {
    let (db, backend) = create_db_with_backend();

    let err = db
        .transaction(&["k"], |_tx| Err(redstone::Error::usage("abort")))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(backend.active_connections(), 0);
    assert!(db.transaction(&["k"], |tx| tx.set("k", &1)).unwrap().is_some());
}
