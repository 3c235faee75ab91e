//! Generic key command tests, including the namespace scenario

use std::time::Duration;

use crate::common::*;
use redstone::{ErrorKind, Redstone, ScanParams};

// ============================================================================
// Namespace
// ============================================================================

#[test]
fn prefixed_set_is_visible_under_full_key() {
    let (db, backend) = create_prefixed("app:");

    db.set("session:42", &"abc").unwrap();

    let raw = unprefixed(&backend);
    assert_eq!(
        raw.get::<String>("app:session:42").unwrap().as_deref(),
        Some("abc")
    );
    assert_eq!(raw.get_raw("session:42").unwrap(), None);
    assert_eq!(db.exists(&["session:42"]).unwrap(), 1);
}

#[test]
fn wildcard_prefix_does_not_leak_other_namespaces() {
    let (db, backend) = create_prefixed("t?:");
    let neighbour = Redstone::builder(backend).prefix("tX:").build();
    db.set("mine", &1).unwrap();
    neighbour.set("secret", &2).unwrap();

    assert_eq!(db.keys("*").unwrap(), vec!["mine".to_string()]);
    let scanned: Vec<String> = db
        .scan(ScanParams::new())
        .items()
        .collect::<redstone::Result<_>>()
        .unwrap();
    assert_eq!(scanned, vec!["mine".to_string()]);
    let scanned_raw: Vec<Vec<u8>> = db
        .scan_raw(ScanParams::new().count(1))
        .items()
        .collect::<redstone::Result<_>>()
        .unwrap();
    assert_eq!(scanned_raw, vec![b"mine".to_vec()]);
}

#[test]
fn bracket_prefix_lists_its_own_keys() {
    let (db, backend) = create_prefixed("t[1]:");
    db.set("mine", &1).unwrap();
    unprefixed(&backend).set("t1:other", &2).unwrap();

    assert_eq!(db.keys("*").unwrap(), vec!["mine".to_string()]);
    assert_eq!(db.keys("m?ne").unwrap(), vec!["mine".to_string()]);
    let scanned: Vec<String> = db
        .scan(ScanParams::new().pattern("mi*"))
        .items()
        .collect::<redstone::Result<_>>()
        .unwrap();
    assert_eq!(scanned, vec!["mine".to_string()]);
}

#[test]
fn star_and_backslash_prefixes_match_literally() {
    for prefix in ["a*:", "a\\:", "*"] {
        let (db, backend) = create_prefixed(prefix);
        db.set("k", &1).unwrap();
        unprefixed(&backend).set("abc:k", &2).unwrap();

        assert_eq!(db.keys("*").unwrap(), vec!["k".to_string()], "prefix {}", prefix);
    }
}

#[test]
fn keys_pattern_is_scoped_to_namespace() {
    let (db, backend) = create_prefixed("app:");
    let raw = unprefixed(&backend);
    raw.set("app:user:1", &1).unwrap();
    raw.set("app:user:2", &2).unwrap();
    raw.set("app:order:1", &3).unwrap();
    raw.set("user:9", &4).unwrap();

    assert_eq!(
        sorted(db.keys("user:*").unwrap()),
        vec!["user:1".to_string(), "user:2".to_string()]
    );
    assert_eq!(db.keys("*").unwrap().len(), 3);
    assert_eq!(raw.keys("*").unwrap().len(), 4);
}

#[test]
fn keys_raw_returns_binary_names() {
    let (db, _backend) = create_prefixed("app:");
    db.set([0xffu8, 0x00], &1).unwrap();

    assert_eq!(db.keys_raw("*").unwrap(), vec![vec![0xffu8, 0x00]]);
    let err = db.keys("*").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Deserialization);
}

// ============================================================================
// Lifecycle commands
// ============================================================================

#[test]
fn del_and_exists_count_keys() {
    let db = create_db();
    db.mset(&[("a", 1), ("b", 2)]).unwrap();

    assert_eq!(db.exists(&["a", "b", "c", "a"]).unwrap(), 3);
    assert_eq!(db.del(&["a", "c"]).unwrap(), 1);
    assert_eq!(db.exists(&["a"]).unwrap(), 0);
}

#[test]
fn expire_ttl_persist() {
    let db = create_db();
    db.set("k", &1).unwrap();

    assert_eq!(db.ttl("k").unwrap(), -1);
    assert_eq!(db.ttl("missing").unwrap(), -2);

    assert!(db.expire("k", Duration::from_secs(100)).unwrap());
    let ttl = db.ttl("k").unwrap();
    assert!((1..=100).contains(&ttl), "ttl was {}", ttl);

    assert!(db.persist("k").unwrap());
    assert_eq!(db.ttl("k").unwrap(), -1);
    assert!(!db.expire("missing", Duration::from_secs(1)).unwrap());
}

#[test]
fn pexpire_elapses() {
    let db = create_db();
    db.set("k", &1).unwrap();

    assert!(db.pexpire("k", Duration::from_millis(30)).unwrap());
    assert!(db.pttl("k").unwrap() <= 30);
    std::thread::sleep(Duration::from_millis(60));

    assert_eq!(db.get::<i32>("k").unwrap(), None);
    assert_eq!(db.exists(&["k"]).unwrap(), 0);
}

#[test]
fn key_type_names() {
    let db = create_db();
    db.set("s", &1).unwrap();
    db.hset("h", "f", &1).unwrap();
    db.rpush("l", &[1]).unwrap();
    db.sadd("set", &[1]).unwrap();
    db.zadd("z", &[(1.0, 1)]).unwrap();

    assert_eq!(db.key_type("s").unwrap(), "string");
    assert_eq!(db.key_type("h").unwrap(), "hash");
    assert_eq!(db.key_type("l").unwrap(), "list");
    assert_eq!(db.key_type("set").unwrap(), "set");
    assert_eq!(db.key_type("z").unwrap(), "zset");
    assert_eq!(db.key_type("missing").unwrap(), "none");
}

#[test]
fn rename_and_renamenx() {
    let (db, backend) = create_prefixed("app:");
    db.set("a", &1).unwrap();
    db.set("b", &2).unwrap();

    assert!(!db.renamenx("a", "b").unwrap());
    db.rename("a", "c").unwrap();
    assert_eq!(db.get::<i32>("c").unwrap(), Some(1));
    assert!(unprefixed(&backend).get_raw("app:c").unwrap().is_some());

    let err = db.rename("missing", "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
}

#[test]
fn server_commands() {
    let db = create_db();

    assert_eq!(db.ping().unwrap(), "PONG");
    assert_eq!(db.echo("hi").unwrap(), b"hi".to_vec());

    db.mset(&[("a", 1), ("b", 2)]).unwrap();
    assert_eq!(db.dbsize().unwrap(), 2);
    db.flushdb().unwrap();
    assert_eq!(db.dbsize().unwrap(), 0);
}
