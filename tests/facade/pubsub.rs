//! Publish/subscribe tests

use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::common::*;
use redstone::{ErrorKind, MemoryBackend, Received, Redstone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Event {
    seq: u32,
}

fn wait_for_subscriber(backend: &MemoryBackend, channel: &[u8]) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while backend.broker().subscribers(channel) == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn publish_without_subscribers_reaches_nobody() {
    let db = create_db();
    assert_eq!(db.publish("news", &Event { seq: 1 }).unwrap(), 0);
}

#[test]
fn subscriber_receives_typed_messages_until_break() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend.clone()).prefix("app:").build());

    let listener = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            let mut received = Vec::new();
            db.subscribe::<Event, _, _>(&["events"], None, |msg| {
                if let Received::Message { channel, payload } = msg {
                    assert_eq!(channel, "events");
                    received.push(payload.unwrap());
                }
                if received.len() == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .map(|()| received)
        })
    };

    wait_for_subscriber(&backend, b"events");
    for seq in 0..3 {
        assert_eq!(db.publish("events", &Event { seq }).unwrap(), 1);
    }

    let received = listener.join().unwrap().unwrap();
    assert_eq!(received, vec![Event { seq: 0 }, Event { seq: 1 }, Event { seq: 2 }]);
    assert_eq!(backend.active_connections(), 0);
}

#[test]
fn bad_payload_is_isolated_to_its_message() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend.clone()).build());

    let listener = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            let mut kinds = Vec::new();
            db.subscribe::<Event, _, _>(&["ch"], None, |msg| {
                if let Received::Message { payload, .. } = msg {
                    kinds.push(payload.map_err(|e| e.kind()).map(|e| e.seq));
                }
                if kinds.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .map(|()| kinds)
        })
    };

    wait_for_subscriber(&backend, b"ch");
    db.publish_raw("ch", "garbage").unwrap();
    db.publish("ch", &Event { seq: 7 }).unwrap();

    let kinds = listener.join().unwrap().unwrap();
    assert_eq!(kinds, vec![Err(ErrorKind::Deserialization), Ok(7)]);
}

#[test]
fn timeout_is_reported_to_listener() {
    let db = create_db();

    let mut timeouts = 0;
    db.subscribe::<Event, _, _>(&["quiet"], Some(Duration::from_millis(20)), |msg| {
        assert!(matches!(msg, Received::Timeout));
        timeouts += 1;
        if timeouts == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })
    .unwrap();

    assert_eq!(timeouts, 2);
}

#[test]
fn close_all_ends_subscription_with_connection_error() {
    let backend = MemoryBackend::new();
    let db = Arc::new(Redstone::builder(backend.clone()).build());

    let listener = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            db.subscribe_raw(&["ch"], None, |_msg| ControlFlow::Continue(()))
        })
    };

    wait_for_subscriber(&backend, b"ch");
    backend.close_all();

    let err = listener.join().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(backend.active_connections(), 0);
}
