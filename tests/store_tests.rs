// SPDX-License-Identifier: MIT

//! File-backed credential store tests: round-trip, merge behavior against
//! foreign config keys, clear semantics, and corrupt-file handling.

use serde_json::{json, Value};

use whoopsync::store::{CredentialStore, FileStore};
use whoopsync::Error;

mod common;

fn store_in(dir: &tempfile::TempDir) -> FileStore {
    FileStore::new(dir.path().join("config.json"))
}

#[tokio::test]
async fn test_missing_file_loads_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    assert!(store.load().await.expect("load").is_none());
}

#[tokio::test]
async fn test_save_load_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    let creds = common::credentials(Some(3600));
    store.save(&creds).await.expect("save");

    let loaded = store.load().await.expect("load").expect("present");
    assert_eq!(loaded, creds);
}

#[tokio::test]
async fn test_save_preserves_foreign_config_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        serde_json::to_string_pretty(&json!({
            "location": {"canonical_name": "Portland, OR", "latitude": 45.5, "longitude": -122.6}
        }))
        .expect("serialize"),
    )
    .expect("seed config");

    let store = FileStore::new(path.clone());
    store.save(&common::credentials(None)).await.expect("save");

    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(
        document["location"]["canonical_name"],
        json!("Portland, OR"),
        "save must merge, not clobber"
    );
    assert!(document["whoop"]["access_token"].is_string());
}

#[tokio::test]
async fn test_clear_removes_only_the_credential_section() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    let store = FileStore::new(path.clone());

    std::fs::write(
        &path,
        serde_json::to_string(&json!({"location": {"canonical_name": "X"}})).expect("serialize"),
    )
    .expect("seed config");
    store.save(&common::credentials(None)).await.expect("save");

    store.clear().await.expect("clear");

    assert!(store.load().await.expect("load").is_none());
    let document: Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert!(document.get("whoop").is_none());
    assert_eq!(document["location"]["canonical_name"], json!("X"));
}

#[tokio::test]
async fn test_load_rejects_corrupt_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json").expect("seed corrupt file");

    let store = FileStore::new(path);
    let err = store.load().await.unwrap_err();
    assert!(matches!(err, Error::Persistence(_)), "got: {err:?}");
}

#[tokio::test]
async fn test_save_recovers_from_corrupt_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{not json").expect("seed corrupt file");

    // Read-modify-write tolerates the unreadable document and starts fresh.
    let store = FileStore::new(path);
    let creds = common::credentials(None);
    store.save(&creds).await.expect("save");

    let loaded = store.load().await.expect("load").expect("present");
    assert_eq!(loaded.access_token, creds.access_token);
}

#[tokio::test]
async fn test_clear_on_missing_file_is_a_noop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = store_in(&dir);

    store.clear().await.expect("clear");
    assert!(!dir.path().join("config.json").exists());
}
