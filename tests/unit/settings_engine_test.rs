//! Integration-level unit tests for the SettingsEngine public API.
//!
//! These tests exercise the SettingsEngine through its public trait interface,
//! validating default loading, dotted-key updates, persistence, and reset.

use serde_json::json;
use syncmarks::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use syncmarks::types::errors::SettingsError;
use syncmarks::types::settings::{StorageBackend, SyncSettings};
use tempfile::TempDir;

/// Helper: create a SettingsEngine backed by a temp directory that lives for the
/// duration of the test (the caller holds the `TempDir` handle).
fn engine_in_temp(dir: &TempDir) -> SettingsEngine {
    let path = dir
        .path()
        .join("settings.json")
        .to_string_lossy()
        .to_string();
    SettingsEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let loaded = engine.load().unwrap();
    assert_eq!(loaded, SyncSettings::default());
    assert_eq!(loaded.feed.collection, "bookmarks");
    assert_eq!(loaded.storage.backend, StorageBackend::Sqlite);
    assert_eq!(loaded.rpc.max_requests_per_second, 200);
}

#[test]
fn test_set_value_persists_across_engines() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    engine.set_value("feed.channel_capacity", json!(8)).unwrap();
    engine.set_value("storage.backend", json!("rest")).unwrap();
    engine.set_value("storage.rest_url", json!("http://localhost:54321")).unwrap();
    assert_eq!(engine.get_settings().feed.channel_capacity, 8);

    let mut reopened = engine_in_temp(&dir);
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded.feed.channel_capacity, 8);
    assert_eq!(loaded.storage.backend, StorageBackend::Rest);
    assert_eq!(loaded.storage.rest_url.as_deref(), Some("http://localhost:54321"));
}

#[test]
fn test_set_value_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let result = engine.set_value("feed.nonexistent", json!(1));
    assert!(matches!(result, Err(SettingsError::InvalidKey(_))));
    assert_eq!(engine.get_settings(), &SyncSettings::default());
}

#[test]
fn test_set_value_wrong_type_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let result = engine.set_value("auth.session_ttl_secs", json!("an hour"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    let result = engine.set_value("storage.backend", json!("postgres"));
    assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    assert_eq!(engine.get_settings().auth.session_ttl_secs, 3600);
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.set_value("auth.provider", json!("github")).unwrap();

    engine.reset().unwrap();
    assert_eq!(engine.get_settings(), &SyncSettings::default());

    let mut reopened = engine_in_temp(&dir);
    assert_eq!(reopened.load().unwrap().auth.provider, "google");
}

#[test]
fn test_malformed_file_is_a_serialization_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();
    let mut engine = engine_in_temp(&dir);

    assert!(matches!(engine.load(), Err(SettingsError::SerializationError(_))));
}

#[test]
fn test_missing_logging_section_uses_default_filter() {
    let dir = TempDir::new().unwrap();
    let mut tree = serde_json::to_value(SyncSettings::default()).unwrap();
    tree.as_object_mut().unwrap().remove("logging");
    std::fs::write(dir.path().join("settings.json"), tree.to_string()).unwrap();

    let mut engine = engine_in_temp(&dir);
    assert_eq!(engine.load().unwrap().logging.filter, "syncmarks=info");
}
