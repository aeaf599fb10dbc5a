//! File backend: on-disk layout and scalar-only payloads.

mod common;

use keystash::{CacheStore, EntryId, FileCacheStore};
use serde_json::json;
use std::collections::HashMap;
use tempfile::TempDir;

fn create_test_cache() -> (TempDir, FileCacheStore) {
    common::init_logging();
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let cache = FileCacheStore::new(temp_dir.path()).unwrap();
    (temp_dir, cache)
}

fn file_name(id: &EntryId) -> &str {
    match id {
        EntryId::File(name) => name,
        EntryId::Row(id) => panic!("file store returned row id {id}"),
    }
}

#[test]
fn test_store() {
    let (temp, cache) = create_test_cache();
    let id = cache.store("testtype", "testkey", &json!("testdata"), 0).unwrap();
    let name = file_name(&id);

    assert!(!name.is_empty());
    assert!(temp.path().join("testtype").is_dir());
    let path = temp.path().join("testtype").join(name);
    assert_eq!(std::fs::read_to_string(path).unwrap(), "testdata");
}

#[test]
fn test_get() {
    let (_temp, cache) = create_test_cache();
    cache.store("testtype", "testkey", &json!("testdata"), 0).unwrap();
    let entry = cache.get(Some("testtype"), Some("testkey")).unwrap().unwrap();
    assert_eq!(entry.data, json!("testdata"));
}

#[test]
fn test_get_all() {
    let (_temp, cache) = create_test_cache();
    let expected = [("testtype1", "testdata1"), ("testtype2", "testdata2")];
    for (cache_type, data) in expected {
        cache.store(cache_type, "testkey", &json!(data), 0).unwrap();
    }

    let found: HashMap<String, String> = cache
        .get_all("testkey", &["testtype1", "testtype2", "testtype3"], "")
        .unwrap()
        .into_iter()
        .map(|(t, entry)| (t, entry.data.as_str().unwrap().to_string()))
        .collect();

    let expected: HashMap<String, String> = expected
        .iter()
        .map(|(t, d)| (t.to_string(), d.to_string()))
        .collect();
    assert_eq!(found, expected);
}

#[test]
fn test_scalars_round_trip_as_text() {
    let (_temp, cache) = create_test_cache();
    let cases = [
        (json!(33), "33"),
        (json!(true), "1"),
        (json!(false), ""),
        (json!("teststring!"), "teststring!"),
    ];
    for (i, (payload, text)) in cases.into_iter().enumerate() {
        let key = format!("key{i}");
        cache.store("scalars", &key, &payload, 0).unwrap();
        let entry = cache.get(Some("scalars"), Some(&key)).unwrap().unwrap();
        assert_eq!(entry.data, json!(text));
    }
}

#[test]
fn test_expiry_is_ignored() {
    let (_temp, cache) = create_test_cache();
    cache.store("testtype", "testkey", &json!("stale"), 1).unwrap();

    assert!(cache.get(Some("testtype"), Some("testkey")).unwrap().is_some());
    assert_eq!(cache.get_all("testkey", &["testtype"], "").unwrap().len(), 1);
}

#[test]
fn test_delete_only_target() {
    let (temp, cache) = create_test_cache();
    let target = cache.store("testtype1", "testkey1", &json!("testdata1"), 0).unwrap();
    let same_type = cache.store("testtype1", "testkey2", &json!("testdata2"), 0).unwrap();
    let same_key = cache.store("testtype2", "testkey1", &json!("testdata3"), 0).unwrap();

    assert!(cache.delete(Some("testtype1"), Some("testkey1")).unwrap());

    assert!(!temp.path().join("testtype1").join(file_name(&target)).exists());
    assert!(temp.path().join("testtype1").join(file_name(&same_type)).exists());
    assert!(temp.path().join("testtype2").join(file_name(&same_key)).exists());
}

#[test]
fn test_key_hash_is_stable_across_instances() {
    let (temp, cache) = create_test_cache();
    let first = cache.store("t", "some key", &json!("v"), 0).unwrap();
    drop(cache);

    let reopened = FileCacheStore::new(temp.path()).unwrap();
    assert_eq!(
        reopened.entry_path("t", "some key").unwrap(),
        temp.path().join("t").join(file_name(&first))
    );
    assert_eq!(
        reopened.get(Some("t"), Some("some key")).unwrap().unwrap().data,
        json!("v")
    );
}
