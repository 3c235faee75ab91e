//! Scan cursor tests over large keyspaces

use std::collections::HashSet;

use crate::common::*;
use redstone::{CursorToken, ErrorKind, ScanCursor, ScanParams, ScanState};

#[test]
fn scan_250_keys_count_50_takes_several_round_trips() {
    let (db, _backend) = create_prefixed("app:");
    let keys: Vec<String> = (0..250).map(|i| format!("item:{}", i)).collect();
    for key in &keys {
        db.set(key, &1).unwrap();
    }

    let mut trips = 0;
    let mut seen = HashSet::new();
    for page in db.scan(ScanParams::new().count(50)) {
        trips += 1;
        seen.extend(page.unwrap());
    }

    assert!(trips >= 5, "expected at least 5 round trips, got {}", trips);
    assert_eq!(seen, keys.into_iter().collect::<HashSet<_>>());
}

#[test]
fn scan_pattern_and_type_filter() {
    let (db, _backend) = create_prefixed("app:");
    for i in 0..20 {
        db.set(format!("user:{}", i), &i).unwrap();
        db.rpush(format!("queue:{}", i), &[i]).unwrap();
    }

    let users: Vec<String> = db
        .scan(ScanParams::new().pattern("user:*").count(7))
        .items()
        .collect::<redstone::Result<_>>()
        .unwrap();
    assert_eq!(users.len(), 20);
    assert!(users.iter().all(|k| k.starts_with("user:")));

    let lists: Vec<String> = db
        .scan(ScanParams::new().kind("list"))
        .items()
        .collect::<redstone::Result<_>>()
        .unwrap();
    assert_eq!(lists.len(), 20);
    assert!(lists.iter().all(|k| k.starts_with("queue:")));
}

#[test]
fn scan_empty_keyspace_finishes_in_one_trip() {
    let db = create_db();

    let pages: Vec<_> = db.scan(ScanParams::new()).collect();

    assert_eq!(pages.len(), 1);
    assert!(pages[0].as_ref().unwrap().is_empty());
}

#[test]
fn scan_page_drives_a_resumable_cursor() {
    let db = create_db();
    for i in 0..30 {
        db.set(format!("k{}", i), &i).unwrap();
    }

    let mut cursor = ScanCursor::new(ScanParams::new().count(10));
    let mut seen = Vec::new();
    let mut trips = 0;
    while !cursor.is_done() {
        trips += 1;
        let page = cursor
            .advance(|token, params| db.scan_page(token, params))
            .unwrap();
        seen.extend(page);
    }

    assert!(trips >= 3);
    assert_eq!(seen.len(), 30);
    assert_eq!(cursor.state(), &ScanState::Done);

    // Done is terminal and makes no round trip.
    let page = cursor
        .advance(|_, _| -> redstone::Result<redstone::ScanPage<Vec<u8>>> {
            panic!("no round trip expected")
        })
        .unwrap();
    assert!(page.is_empty());
}

#[test]
fn scan_resumes_from_persisted_token() {
    let db = create_db();
    for i in 0..30 {
        db.set(format!("k{}", i), &i).unwrap();
    }

    let first = db
        .scan_page(&CursorToken::start(), &ScanParams::new().count(10))
        .unwrap();
    assert!(!first.cursor.is_start());

    let resumed = ScanCursor::resume(first.cursor.clone(), ScanParams::new().count(10));
    let fetch = |token: &CursorToken, params: &ScanParams| db.scan_page(token, params);
    let rest: Vec<Vec<u8>> = redstone::Scan::from_cursor(resumed, fetch)
        .items()
        .collect::<redstone::Result<_>>()
        .unwrap();

    let all: HashSet<Vec<u8>> = first.items.into_iter().chain(rest).collect();
    assert_eq!(all.len(), 30);
}

#[test]
fn invalid_cursor_is_command_error_and_fuses_iteration() {
    let db = create_db();
    db.set("k", &1).unwrap();

    let err = db
        .scan_page(&CursorToken::new("not-a-number"), &ScanParams::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Command);

    let mut pages = db.scan(ScanParams::new().count(0));
    assert!(pages.next().unwrap().is_err());
    assert!(pages.next().is_none());
}
