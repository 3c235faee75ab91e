//! String command tests

use std::time::Duration;

use crate::common::*;
use redstone::{ErrorKind, SetOptions};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u32,
    name: String,
    tags: Vec<String>,
}

fn profile(id: u32) -> Profile {
    Profile {
        id,
        name: format!("user-{}", id),
        tags: vec!["a".into(), "b".into()],
    }
}

// ============================================================================
// SET / GET
// ============================================================================

#[test]
fn set_get_typed_record() {
    let db = create_db();

    db.set("p:1", &profile(1)).unwrap();

    assert_eq!(db.get::<Profile>("p:1").unwrap(), Some(profile(1)));
    assert_eq!(db.get::<Profile>("p:2").unwrap(), None);
}

#[test]
fn set_overwrites_and_clears_expiry() {
    let db = create_db();

    db.set_with("k", &1, SetOptions::new().expire_in(Duration::from_secs(60)))
        .unwrap();
    assert!(db.ttl("k").unwrap() > 0);

    db.set("k", &2).unwrap();
    assert_eq!(db.ttl("k").unwrap(), -1);
    assert_eq!(db.get::<i32>("k").unwrap(), Some(2));
}

#[test]
fn set_with_conditions() {
    let db = create_db();

    assert!(!db.set_with("k", &1, SetOptions::new().if_present()).unwrap());
    assert!(db.set_with("k", &1, SetOptions::new().if_absent()).unwrap());
    assert!(!db.set_with("k", &2, SetOptions::new().if_absent()).unwrap());
    assert!(db.set_with("k", &3, SetOptions::new().if_present()).unwrap());
    assert_eq!(db.get::<i32>("k").unwrap(), Some(3));
}

#[test]
fn set_with_keep_ttl() {
    let db = create_db();

    db.set_with("k", &1, SetOptions::new().expire_in(Duration::from_secs(100)))
        .unwrap();
    db.set_with("k", &2, SetOptions::new().keep_ttl()).unwrap();

    assert!(db.pttl("k").unwrap() > 0);
}

#[test]
fn setnx_only_first_wins() {
    let db = create_db();

    assert!(db.setnx("lock", "owner-a").unwrap());
    assert!(!db.setnx("lock", "owner-b").unwrap());
    assert_eq!(db.get::<String>("lock").unwrap().as_deref(), Some("owner-a"));
}

#[test]
fn getset_returns_previous() {
    let db = create_db();

    assert_eq!(db.getset("k", &1i64).unwrap(), None);
    assert_eq!(db.getset("k", &2i64).unwrap(), Some(1));
    assert_eq!(db.get::<i64>("k").unwrap(), Some(2));
}

// ============================================================================
// Batches
// ============================================================================

#[test]
fn mget_preserves_order_and_gaps() {
    let db = create_db();
    db.mset(&[("a", 1), ("c", 3)]).unwrap();

    let values = db.mget::<i32, _>(&["a", "b", "c"]).unwrap();
    let values: Vec<Option<i32>> = all_ok(values);

    assert_eq!(values, vec![Some(1), None, Some(3)]);
}

#[test]
fn mget_isolates_malformed_element() {
    let db = create_db();
    db.set("good1", &profile(1)).unwrap();
    db.set_raw("bad", b"{not json").unwrap();
    db.set("good2", &profile(2)).unwrap();

    let values = db.mget::<Profile, _>(&["good1", "bad", "good2"]).unwrap();

    assert_eq!(values.len(), 3);
    assert_eq!(values[0].as_ref().unwrap(), &Some(profile(1)));
    assert_eq!(
        values[1].as_ref().unwrap_err().kind(),
        ErrorKind::Deserialization
    );
    assert_eq!(values[2].as_ref().unwrap(), &Some(profile(2)));
}

#[test]
fn empty_batches_make_no_round_trip() {
    let db = create_db();
    let none: [&str; 0] = [];
    let no_pairs: [(&str, i32); 0] = [];

    assert!(db.mget::<i32, _>(&none).unwrap().is_empty());
    assert!(db.mget_raw(&none).unwrap().is_empty());
    db.mset(&no_pairs).unwrap();
}

#[test]
fn empty_msetnx_succeeds_without_connecting() {
    let (db, backend) = create_db_with_backend();
    let no_pairs: [(&str, i32); 0] = [];
    backend.fail_next_connects(1);

    assert!(db.msetnx(&no_pairs).unwrap());

    // The refusal is still pending, so nothing connected above.
    assert_eq!(db.dbsize().unwrap_err().kind(), ErrorKind::Connection);
}

#[test]
fn msetnx_is_all_or_nothing() {
    let db = create_db();
    db.set("b", &0).unwrap();

    assert!(!db.msetnx(&[("a", 1), ("b", 2)]).unwrap());
    assert_eq!(db.get::<i32>("a").unwrap(), None);

    assert!(db.msetnx(&[("x", 1), ("y", 2)]).unwrap());
    assert_eq!(db.exists(&["x", "y"]).unwrap(), 2);
}

// ============================================================================
// Counters and byte operations
// ============================================================================

#[test]
fn counters() {
    let db = create_db();

    assert_eq!(db.incr("hits").unwrap(), 1);
    assert_eq!(db.incr_by("hits", 9).unwrap(), 10);
    assert_eq!(db.decr("hits").unwrap(), 9);
    assert_eq!(db.decr_by("hits", 4).unwrap(), 5);
    assert_eq!(db.get::<i64>("hits").unwrap(), Some(5));
}

#[test]
fn incr_on_non_integer_is_command_error() {
    let db = create_db();
    db.set("name", &"ada").unwrap();

    let err = db.incr("name").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);
}

#[test]
fn incr_by_float() {
    let db = create_db();

    assert_eq!(db.incr_by_float("f", 1.5).unwrap(), 1.5);
    assert_eq!(db.incr_by_float("f", 1.0).unwrap(), 2.5);
}

#[test]
fn append_strlen_getrange_on_raw_bytes() {
    let db = create_db();

    assert_eq!(db.append("log", b"hello").unwrap(), 5);
    assert_eq!(db.append("log", " world").unwrap(), 11);
    assert_eq!(db.strlen("log").unwrap(), 11);
    assert_eq!(db.getrange("log", 0, 4).unwrap(), b"hello".to_vec());
    assert_eq!(db.getrange("log", -5, -1).unwrap(), b"world".to_vec());
    assert_eq!(db.strlen("missing").unwrap(), 0);
}
