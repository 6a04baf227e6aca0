// Integration tests for the on-disk storage documents of a browser profile
use std::fs;
use std::path::{Path, PathBuf};

use reddsimp::{
    default_settings, open_profile_store, reconcile, sync_storage_path, SchemaOutcome, SettingsMap,
};

fn fixtures_path() -> PathBuf {
    Path::new("tests/fixtures").to_path_buf()
}

fn read_document(path: &Path) -> SettingsMap {
    let bytes = fs::read(path).expect("storage document should exist");
    serde_json::from_slice(&bytes).expect("storage document should be valid JSON")
}

#[test]
fn test_first_run_creates_the_sync_document() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let profile = dir.path().join("abcd1234.default-release");
    fs::create_dir_all(&profile).expect("Failed to create profile dir");

    let mut store = open_profile_store(&profile);
    let outcome = reconcile(&mut store).expect("reconcile should succeed");
    assert_eq!(outcome, SchemaOutcome::FirstInstall);

    // The defaults land in the sync document; local stays untouched.
    let sync_path = sync_storage_path(&profile);
    assert!(sync_path.exists(), "sync document should be created");
    assert_eq!(read_document(&sync_path), default_settings());
    assert!(!reddsimp::local_storage_path(&profile).exists());
}

#[test]
fn test_legacy_document_is_migrated_on_disk() {
    use serde_json::Value;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let profile = dir.path().join("abcd1234.default-release");
    let sync_path = sync_storage_path(&profile);
    fs::create_dir_all(sync_path.parent().unwrap()).expect("Failed to create data dir");
    fs::copy(fixtures_path().join("storage-sync-v1.json"), &sync_path)
        .expect("Failed to copy fixture");

    let mut store = open_profile_store(&profile);
    let outcome = reconcile(&mut store).expect("reconcile should succeed");
    assert_eq!(outcome, SchemaOutcome::Migrated);

    let document = read_document(&sync_path);
    assert_eq!(document.len(), default_settings().len());
    // Choices from the old release survive the rewrite...
    assert_eq!(document.get("hide_header"), Some(&Value::Bool(true)));
    assert_eq!(document.get("hide_sidebar_contents"), Some(&Value::Bool(true)));
    assert_eq!(document.get("hide_trending_topics"), Some(&Value::Bool(false)));
    // ...keys the old release never knew arrive with their defaults...
    assert_eq!(document.get("hide_geolocation"), Some(&Value::Bool(false)));
    assert_eq!(document.get("hide_recent_posts"), Some(&Value::Bool(false)));
    // ...and its retired key is dropped.
    assert!(!document.contains_key("hide_chat_button"));

    let popup = document
        .get("popup_settings")
        .and_then(Value::as_object)
        .expect("popup state should be an object");
    assert_eq!(popup.get("dark_mode"), Some(&Value::Bool(true)));
    assert!(popup.contains_key("tree_states"));

    // A second pass over the rewritten document is a no-op.
    let outcome = reconcile(&mut store).expect("reconcile should succeed");
    assert_eq!(outcome, SchemaOutcome::Unchanged);
}

#[test]
fn test_unreadable_sync_document_falls_back_to_local() {
    use reddsimp::{local_storage_path, BackendKind};

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let profile = dir.path().join("abcd1234.default-release");
    let sync_path = sync_storage_path(&profile);
    // A directory where the document should be makes every read fail
    // without looking like a missing file.
    fs::create_dir_all(&sync_path).expect("Failed to create blocking dir");

    let mut store = open_profile_store(&profile);
    let outcome = reconcile(&mut store).expect("reconcile should fail over");
    assert_eq!(outcome, SchemaOutcome::FirstInstall);
    assert_eq!(store.active_kind(), BackendKind::Local);

    let local_path = local_storage_path(&profile);
    assert!(local_path.exists(), "defaults should land in the local document");
    assert_eq!(read_document(&local_path), default_settings());
}

#[test]
fn test_malformed_sync_document_surfaces_without_failover() {
    use reddsimp::{BackendKind, Error};

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let profile = dir.path().join("abcd1234.default-release");
    let sync_path = sync_storage_path(&profile);
    fs::create_dir_all(sync_path.parent().unwrap()).expect("Failed to create data dir");
    fs::write(&sync_path, b"{ not json").expect("Failed to write document");

    let mut store = open_profile_store(&profile);
    let err = store.get_all().expect_err("corrupt document should error");
    match err {
        Error::MalformedDocument { path, .. } => assert_eq!(path, sync_path),
        other => panic!("Expected MalformedDocument, got {other:?}"),
    }
    // Corruption is not an availability problem; the store stays on sync.
    assert_eq!(store.active_kind(), BackendKind::Sync);
}

#[test]
fn test_settings_persist_across_sessions() {
    use reddsimp::Runtime;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let profile = dir.path().join("abcd1234.default-release");
    fs::create_dir_all(&profile).expect("Failed to create profile dir");

    // First session: install defaults, flip one flag, pick dark mode.
    let mut runtime = Runtime::new(open_profile_store(&profile));
    let outcome = runtime.startup().expect("startup should succeed");
    assert_eq!(outcome, SchemaOutcome::FirstInstall);
    runtime.open_popup().expect("popup should open");
    runtime
        .popup_set_leaf("hide_header", true)
        .expect("leaf toggle should persist");
    runtime
        .popup_set_dark_mode(true)
        .expect("dark mode should persist");
    drop(runtime);

    // Second session over the same profile sees the persisted choices.
    let mut runtime = Runtime::new(open_profile_store(&profile));
    let outcome = runtime.startup().expect("startup should succeed");
    assert_eq!(outcome, SchemaOutcome::Unchanged);

    let page = runtime
        .open_page(reddsimp::Document::top_level())
        .expect("page should open");
    assert_eq!(
        runtime.page(page).unwrap().document().attribute("hide_header"),
        Some("true")
    );
    runtime.open_popup().expect("popup should open");
    let popup = runtime.popup().unwrap();
    assert_eq!(popup.leaf("hide_header"), Some(true));
    assert!(popup.dark_mode());
}
