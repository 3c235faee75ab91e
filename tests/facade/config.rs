//! Configuration-driven construction tests

use std::io::Write;

use crate::common::*;
use redstone::{Encoding, ErrorKind, Redstone, RedstoneConfig};

#[test]
fn default_toml_parses_to_defaults() {
    let config = RedstoneConfig::from_toml_str(RedstoneConfig::default_toml()).unwrap();
    assert_eq!(config, RedstoneConfig::default());
}

#[test]
fn standalone_from_file() {
    init_tracing();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
prefix = "svc:"
encoding = "msgpack"

[retry]
max_retries = 2
initial_backoff_ms = 1
max_backoff_ms = 4
"#
    )
    .unwrap();

    let config = RedstoneConfig::from_file(file.path()).unwrap();
    assert_eq!(config.encoding, Encoding::MessagePack);

    let db = Redstone::standalone(&config).unwrap();
    assert_eq!(db.key_codec().prefix(), Some("svc:"));
    assert_eq!(db.value_codec().encoding(), Encoding::MessagePack);
    assert_eq!(db.executor().retry_policy().max_retries(), 2);

    db.set("k", &vec![1u8, 2, 3]).unwrap();
    assert_eq!(db.get::<Vec<u8>>("k").unwrap(), Some(vec![1, 2, 3]));
    assert_eq!(db.backend().keyspace().len(), 1);
}

#[test]
fn sharded_from_config() {
    init_tracing();
    let config = RedstoneConfig::from_toml_str(
        r#"
[backend]
shards = 3
max_connections = 2
"#,
    )
    .unwrap();

    let db = Redstone::sharded(&config).unwrap();
    assert_eq!(db.backend().shard_count(), 3);

    db.set("a", &1).unwrap();
    assert_eq!(db.get::<i32>("a").unwrap(), Some(1));
}

#[test]
fn max_connections_applies_to_standalone() {
    init_tracing();
    let mut config = RedstoneConfig::default();
    config.backend.max_connections = Some(1);

    let db = Redstone::standalone(&config).unwrap();
    let nested = db.execute(|_handle| Ok(db.ping())).unwrap();

    assert_eq!(nested.unwrap_err().kind(), ErrorKind::Connection);
}

#[test]
fn invalid_config_is_usage_error() {
    let err = RedstoneConfig::from_toml_str("encoding = \"yaml\"").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);

    let err = RedstoneConfig::from_toml_str("[backend]\nshards = 0").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Usage);

    let missing = std::path::Path::new("/nonexistent/redstone.toml");
    assert_eq!(
        RedstoneConfig::from_file(missing).unwrap_err().kind(),
        ErrorKind::Usage
    );
}

#[test]
fn config_round_trips_through_toml() {
    let mut config = RedstoneConfig::default();
    config.prefix = Some("app:".into());
    config.retry.max_retries = 5;

    let text = config.to_toml().unwrap();
    assert_eq!(RedstoneConfig::from_toml_str(&text).unwrap(), config);
}
