//! Set command tests

use crate::common::*;
use redstone::{ErrorKind, ScanParams};

#[test]
fn sadd_srem_smembers() {
    let db = create_db();

    assert_eq!(db.sadd("s", &["a", "b", "a"]).unwrap(), 2);
    assert_eq!(db.srem("s", &["a", "zzz"]).unwrap(), 1);
    assert_eq!(all_ok(db.smembers::<String>("s").unwrap()), vec!["b"]);
    assert_eq!(db.smembers_raw("s").unwrap(), vec![b"\"b\"".to_vec()]);
    assert_eq!(db.scard("s").unwrap(), 1);
}

#[test]
fn sismember_and_spop() {
    let db = create_db();
    db.sadd("s", &[1]).unwrap();

    assert!(db.sismember("s", &1).unwrap());
    assert!(!db.sismember("s", &2).unwrap());
    assert_eq!(db.spop::<i32>("s").unwrap(), Some(1));
    assert_eq!(db.spop::<i32>("s").unwrap(), None);
}

#[test]
fn smove_issues_smove() {
    let db = create_db();
    db.sadd("from", &["m"]).unwrap();

    assert!(db.smove("from", "to", "m").unwrap());
    assert!(!db.smove("from", "to", "m").unwrap());
    assert!(db.sismember("to", "m").unwrap());
    assert_eq!(db.scard("from").unwrap(), 0);
}

#[test]
fn set_algebra() {
    let db = create_db();
    db.sadd("a", &[1, 2, 3]).unwrap();
    db.sadd("b", &[2, 3, 4]).unwrap();

    assert_eq!(sorted(all_ok(db.sinter::<i32, _>(&["a", "b"]).unwrap())), vec![2, 3]);
    assert_eq!(
        sorted(all_ok(db.sunion::<i32, _>(&["a", "b"]).unwrap())),
        vec![1, 2, 3, 4]
    );
    assert_eq!(all_ok(db.sdiff::<i32, _>(&["a", "b"]).unwrap()), vec![1]);
}

#[test]
fn store_variants_write_destination() {
    let (db, _backend) = create_prefixed("app:");
    db.sadd("a", &[1, 2, 3]).unwrap();
    db.sadd("b", &[2, 3, 4]).unwrap();

    assert_eq!(db.sinterstore("i", &["a", "b"]).unwrap(), 2);
    assert_eq!(db.sunionstore("u", &["a", "b"]).unwrap(), 4);
    assert_eq!(db.sdiffstore("d", &["a", "b"]).unwrap(), 1);

    assert_eq!(sorted(all_ok(db.smembers::<i32>("i").unwrap())), vec![2, 3]);
    assert_eq!(db.scard("u").unwrap(), 4);
    assert_eq!(all_ok(db.smembers::<i32>("d").unwrap()), vec![1]);
}

#[test]
fn smembers_on_wrong_type_is_command_error() {
    let db = create_db();
    db.set("k", &1).unwrap();

    let err = db.smembers::<i32>("k").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
}

#[test]
fn sscan_covers_every_member() {
    let db = create_db();
    let members: Vec<i32> = (0..100).collect();
    db.sadd("s", &members).unwrap();

    let seen: Vec<i32> = db
        .sscan::<i32>("s", ScanParams::new().count(9))
        .items()
        .map(|item| item.unwrap().unwrap())
        .collect();

    assert_eq!(sorted(seen), members);
}
