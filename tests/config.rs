use std::fs;

use assert_matches::assert_matches;

use geonames_loader::config::{Config, ConfigLoader};
use geonames_loader::dialect::Dialect;
use geonames_loader::error::LoaderError;

#[test]
fn explicitly_named_config_must_exist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let err = Config::load(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, LoaderError::MissingConfig(_));
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("geonames-load.json");
    fs::write(
        &path,
        r#"{
            "dialect": "mysql",
            "database": "world.db",
            "filters": { "featureClass": ["P"] },
            "sources": { "archive": "https://example.org/DE.zip" },
            "large_batch_size": 500
        }"#,
    )
    .unwrap();

    let config = Config::load(Some(path.to_str().unwrap())).unwrap();
    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.dialect, Dialect::Mysql);
    assert_eq!(resolved.database, "world.db");
    assert_eq!(resolved.sources.archive, "https://example.org/DE.zip");
    // untouched sources keep their defaults
    assert!(resolved.sources.timezones.contains("timeZones.txt"));
    assert_eq!(resolved.large_batch_size, 500);
    assert!(!resolved.filters.is_empty());
}

#[test]
fn malformed_json_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();
    let err = Config::load(Some(path.to_str().unwrap())).unwrap_err();
    assert_matches!(err, LoaderError::ConfigParse(_));
}
