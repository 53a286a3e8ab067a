#![allow(clippy::unwrap_used)]

use std::fs;

use kubecloud_core::{FileStorage, KeyValueStore};
use pretty_assertions::assert_eq;

#[test]
fn values_survive_a_new_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");

    let first = FileStorage::new(&path);
    first.set("user", r#"{"id":"1"}"#).unwrap();
    first.set("token", "\"mock-token-1\"").unwrap();

    let second = FileStorage::new(&path);
    assert_eq!(second.get("user").unwrap().as_deref(), Some(r#"{"id":"1"}"#));
    assert_eq!(second.get("token").unwrap().as_deref(), Some("\"mock-token-1\""));

    second.remove("token").unwrap();
    assert_eq!(first.get("token").unwrap(), None);
    assert!(first.get("user").unwrap().is_some());
}

#[test]
fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("absent.json"));

    assert_eq!(storage.get("user").unwrap(), None);
    storage.remove("user").unwrap();
    assert!(!storage.path().exists());
}

#[test]
fn corrupt_file_is_replaced_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    fs::write(&path, "{{{ definitely not json").unwrap();

    let storage = FileStorage::new(&path);
    assert_eq!(storage.get("user").unwrap(), None);

    storage.set("user", "value").unwrap();
    let on_disk: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(on_disk, serde_json::json!({ "user": "value" }));
}

#[test]
fn parent_directories_are_created() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deeper").join("session.json");

    FileStorage::new(&path).set("token", "\"t\"").unwrap();

    assert!(path.exists());
}
