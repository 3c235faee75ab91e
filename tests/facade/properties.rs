//! Property tests for namespacing and value round trips

use std::collections::BTreeSet;

use proptest::prelude::*;
use redstone::{KeyCodec, MemoryBackend, Redstone, ScanParams};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn text_and_byte_keys_address_the_same_value(
        prefix in "[ -~]{0,8}",
        key in "[a-zA-Z0-9:_-]{1,24}",
        value in any::<i64>(),
    ) {
        let backend = MemoryBackend::new();
        let db = Redstone::builder(backend.clone()).prefix(prefix.clone()).build();

        db.set(key.as_str(), &value).unwrap();

        prop_assert_eq!(db.get::<i64>(key.as_bytes()).unwrap(), Some(value));
        let full = format!("{}{}", prefix, key);
        prop_assert_eq!(
            Redstone::builder(backend).build().get::<i64>(full.as_str()).unwrap(),
            Some(value)
        );
    }

    #[test]
    fn batch_prefixing_matches_single_prefixing(
        prefix in proptest::option::of("[ -~]{1,8}"),
        keys in proptest::collection::vec("[a-z0-9]{0,10}", 0..20),
    ) {
        let codec = KeyCodec::new(prefix);
        let batch = codec.encode_all(&keys);

        prop_assert_eq!(batch.len(), keys.len());
        for (encoded, key) in batch.iter().zip(&keys) {
            prop_assert_eq!(encoded, &codec.encode(key));
            prop_assert_eq!(codec.strip(encoded), key.as_bytes());
        }
    }

    #[test]
    fn keys_and_scan_return_exactly_the_namespace(
        prefix in "[ -~]{1,6}",
        neighbour in "[ -~]{1,6}",
        own in proptest::collection::btree_set("[a-z0-9]{1,8}", 0..12),
        foreign in proptest::collection::btree_set("[a-z0-9]{1,8}", 1..12),
    ) {
        prop_assume!(!prefix.starts_with(&neighbour) && !neighbour.starts_with(&prefix));
        let backend = MemoryBackend::new();
        let db = Redstone::builder(backend.clone()).prefix(prefix).build();
        let other = Redstone::builder(backend).prefix(neighbour).build();
        for key in &own {
            db.set(key.as_str(), &1).unwrap();
        }
        for key in &foreign {
            other.set(key.as_str(), &2).unwrap();
        }

        let listed: BTreeSet<String> = db.keys("*").unwrap().into_iter().collect();
        prop_assert_eq!(&listed, &own);

        let scanned: BTreeSet<String> = db
            .scan(ScanParams::new().count(3))
            .items()
            .collect::<redstone::Result<_>>()
            .unwrap();
        prop_assert_eq!(&scanned, &own);
    }

    #[test]
    fn string_lists_round_trip_in_order(
        items in proptest::collection::vec(".{0,12}", 1..15),
    ) {
        let db = Redstone::builder(MemoryBackend::new()).build();

        db.rpush("l", &items).unwrap();
        let back: Vec<String> = db
            .lrange::<String>("l", 0, -1)
            .unwrap()
            .into_iter()
            .collect::<redstone::Result<_>>()
            .unwrap();

        prop_assert_eq!(back, items);
    }
}
