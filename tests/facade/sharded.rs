//! Sharded backend tests: routing, cross-shard rejection, fan-out commands

use std::collections::HashSet;

use crate::common::*;
use redstone::{ErrorKind, ScanParams, ShardedBackend};

/// Two keys that the backend routes to different shards.
fn keys_on_different_shards(backend: &ShardedBackend) -> (String, String) {
    let first = "k0".to_string();
    let home = backend.shard_for(first.as_bytes());
    let other = (1..1000)
        .map(|i| format!("k{}", i))
        .find(|k| backend.shard_for(k.as_bytes()) != home)
        .expect("keys spread across shards");
    (first, other)
}

#[test]
fn single_key_commands_route_transparently() {
    let (db, _backend) = create_sharded(4);

    for i in 0..50 {
        db.set(format!("user:{}", i), &i).unwrap();
    }
    for i in 0..50 {
        assert_eq!(db.get::<i32>(format!("user:{}", i)).unwrap(), Some(i));
    }
    assert_eq!(db.dbsize().unwrap(), 50);
}

#[test]
fn keys_spread_over_every_shard() {
    let (db, backend) = create_sharded(4);
    for i in 0..200 {
        db.set(format!("k{}", i), &i).unwrap();
    }

    for shard in 0..backend.shard_count() {
        let keyspace = backend.shard(shard).unwrap();
        assert!(!keyspace.is_empty(), "shard {} is empty", shard);
    }
}

#[test]
fn cross_shard_multi_key_command_is_rejected() {
    let (db, backend) = create_sharded(4);
    let (a, b) = keys_on_different_shards(&backend);

    let err = db.rename(&a, &b).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
    assert!(err.reason().contains("CROSSSLOT"), "{}", err);

    let err = db.sinterstore("dest", &[a.as_str(), b.as_str()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
}

#[test]
fn hash_tags_keep_related_keys_together() {
    let (db, _backend) = create_sharded(4);

    db.sadd("{team}:a", &[1, 2, 3]).unwrap();
    db.sadd("{team}:b", &[2, 3, 4]).unwrap();

    assert_eq!(db.sinterstore("{team}:both", &["{team}:a", "{team}:b"]).unwrap(), 2);
    db.rename("{team}:both", "{team}:shared").unwrap();
    assert_eq!(db.scard("{team}:shared").unwrap(), 2);
}

#[test]
fn del_exists_mget_fan_out_per_key() {
    let (db, backend) = create_sharded(3);
    let (a, b) = keys_on_different_shards(&backend);
    db.set(&a, &1).unwrap();
    db.set(&b, &2).unwrap();

    assert_eq!(db.exists(&[a.as_str(), b.as_str(), "missing"]).unwrap(), 2);
    let values: Vec<Option<i32>> = all_ok(db.mget(&[a.as_str(), b.as_str()]).unwrap());
    assert_eq!(values, vec![Some(1), Some(2)]);
    assert_eq!(db.del(&[a.as_str(), b.as_str()]).unwrap(), 2);
    assert_eq!(db.dbsize().unwrap(), 0);
}

#[test]
fn scan_walks_every_shard() {
    let (db, _backend) = create_sharded(5);
    let keys: HashSet<String> = (0..120).map(|i| format!("item:{}", i)).collect();
    for key in &keys {
        db.set(key, &0).unwrap();
    }

    let mut trips = 0;
    let mut seen = HashSet::new();
    for page in db.scan(ScanParams::new().count(10)) {
        trips += 1;
        seen.extend(page.unwrap());
    }

    assert!(trips >= 12);
    assert_eq!(seen, keys);
    assert_eq!(sorted(db.keys("item:1?").unwrap()).len(), 10);
}

#[test]
fn transaction_on_one_shard_commits() {
    let (db, _backend) = create_sharded(4);

    let replies = db
        .transaction(&["{acct}:x"], |tx| {
            tx.set("{acct}:x", &1)?;
            tx.set("{acct}:y", &2)
        })
        .unwrap();

    assert_eq!(replies.map(|r| r.len()), Some(2));
    assert_eq!(db.get::<i32>("{acct}:y").unwrap(), Some(2));
}

#[test]
fn transaction_spanning_shards_is_rejected() {
    let (db, backend) = create_sharded(4);
    let (a, b) = keys_on_different_shards(&backend);

    let err = db
        .multi(|tx| {
            tx.set(&a, &1)?;
            tx.set(&b, &2)
        })
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Command);
    assert_eq!(db.exists(&[a.as_str(), b.as_str()]).unwrap(), 0);
    assert_eq!(backend.active_connections(), 0);
}
