//! List command tests

use crate::common::*;
use redstone::{End, ErrorKind};

#[test]
fn push_pop_order() {
    let db = create_db();

    assert_eq!(db.rpush("l", &[1, 2]).unwrap(), 2);
    assert_eq!(db.lpush("l", &[0, -1]).unwrap(), 4);

    assert_eq!(all_ok(db.lrange::<i32>("l", 0, -1).unwrap()), vec![-1, 0, 1, 2]);
    assert_eq!(db.lpop::<i32>("l").unwrap(), Some(-1));
    assert_eq!(db.rpop::<i32>("l").unwrap(), Some(2));
    assert_eq!(db.llen("l").unwrap(), 2);
}

#[test]
fn pop_from_missing_list_is_none() {
    let db = create_db();

    assert_eq!(db.lpop::<i32>("nope").unwrap(), None);
    assert_eq!(db.rpop::<i32>("nope").unwrap(), None);
    assert_eq!(db.lpop_raw("nope").unwrap(), None);
    assert_eq!(db.llen("nope").unwrap(), 0);
}

#[test]
fn raw_push_and_range() {
    let db = create_db();

    db.rpush_raw("l", &[b"a".as_slice(), b"b".as_slice()]).unwrap();
    db.lpush_raw("l", &["z"]).unwrap();

    assert_eq!(
        db.lrange_raw("l", 0, -1).unwrap(),
        vec![b"z".to_vec(), b"a".to_vec(), b"b".to_vec()]
    );
    assert_eq!(db.lpop_raw("l").unwrap(), Some(b"z".to_vec()));
}

#[test]
fn lrange_isolates_bad_elements() {
    let db = create_db();
    db.rpush("l", &[1]).unwrap();
    db.rpush_raw("l", &["oops"]).unwrap();
    db.rpush("l", &[3]).unwrap();

    let items = db.lrange::<i32>("l", 0, -1).unwrap();

    assert_eq!(*items[0].as_ref().unwrap(), 1);
    assert_eq!(items[1].as_ref().unwrap_err().kind(), ErrorKind::Deserialization);
    assert_eq!(*items[2].as_ref().unwrap(), 3);
}

#[test]
fn lindex_lpos_lset() {
    let db = create_db();
    db.rpush("l", &["a", "b", "c"]).unwrap();

    assert_eq!(db.lindex::<String>("l", -1).unwrap().as_deref(), Some("c"));
    assert_eq!(db.lindex::<String>("l", 10).unwrap(), None);
    assert_eq!(db.lpos("l", "b").unwrap(), Some(1));
    assert_eq!(db.lpos("l", "q").unwrap(), None);

    db.lset("l", 1, "B").unwrap();
    assert_eq!(db.lindex::<String>("l", 1).unwrap().as_deref(), Some("B"));

    let err = db.lset("l", 9, "x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
}

#[test]
fn lrem_and_ltrim() {
    let db = create_db();
    db.rpush("l", &[1, 2, 1, 3, 1]).unwrap();

    assert_eq!(db.lrem("l", -2, &1).unwrap(), 2);
    assert_eq!(all_ok(db.lrange::<i32>("l", 0, -1).unwrap()), vec![1, 2, 3]);

    db.ltrim("l", 1, -1).unwrap();
    assert_eq!(all_ok(db.lrange::<i32>("l", 0, -1).unwrap()), vec![2, 3]);
}

#[test]
fn lmove_and_rpoplpush() {
    let (db, _backend) = create_prefixed("q:");
    db.rpush("src", &["a", "b", "c"]).unwrap();

    let moved: Option<String> = db.lmove("src", "dst", End::Left, End::Right).unwrap();
    assert_eq!(moved.as_deref(), Some("a"));

    let moved: Option<String> = db.rpoplpush("src", "dst").unwrap();
    assert_eq!(moved.as_deref(), Some("c"));

    assert_eq!(
        all_ok(db.lrange::<String>("dst", 0, -1).unwrap()),
        vec!["c", "a"]
    );
    assert_eq!(db.lmove::<String>("empty", "dst", End::Left, End::Left).unwrap(), None);
}

#[test]
fn raw_pops_keep_foreign_payloads_readable() {
    let (db, _backend) = create_prefixed("q:");
    db.rpush_raw("q", &["plain-text-1", "plain-text-2", "plain-text-3"]).unwrap();

    assert_eq!(db.rpop_raw("q").unwrap(), Some(b"plain-text-3".to_vec()));
    assert_eq!(
        db.rpoplpush_raw("q", "other").unwrap(),
        Some(b"plain-text-2".to_vec())
    );
    assert_eq!(
        db.lmove_raw("other", "q", End::Left, End::Right).unwrap(),
        Some(b"plain-text-2".to_vec())
    );
    assert_eq!(
        db.lrange_raw("q", 0, -1).unwrap(),
        vec![b"plain-text-1".to_vec(), b"plain-text-2".to_vec()]
    );
    assert_eq!(db.rpop_raw("missing").unwrap(), None);
}

#[test]
fn typed_pop_of_undecodable_payload_consumes_it() {
    let db = create_db();
    db.rpush_raw("q", &["not json"]).unwrap();

    let err = db.rpop::<String>("q").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Deserialization);
    assert_eq!(db.llen("q").unwrap(), 0);
}
