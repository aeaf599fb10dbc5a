//! Behavior every backend shares, exercised through `dyn CacheStore`.

mod common;

use common::all_stores;
use keystash::cache::unix_now;
use serde_json::json;
use std::time::Duration;

#[test]
fn test_store_then_get() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        cache
            .store("testtype", "testkey", &json!("testdata"), unix_now() + 10)
            .unwrap();

        let entry = cache
            .get(Some("testtype"), Some("testkey"))
            .unwrap()
            .unwrap_or_else(|| panic!("{name}: entry missing"));
        assert_eq!(entry.key, "testkey", "{name}");
        assert_eq!(entry.data, json!("testdata"), "{name}");
    }
}

#[test]
fn test_store_replaces_previous_value() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        cache.store("t1", "k1", &json!("first"), unix_now() + 100).unwrap();
        cache.store("t1", "k1", &json!("x"), unix_now() + 100).unwrap();

        let entry = cache.get(Some("t1"), Some("k1")).unwrap().unwrap();
        assert_eq!(entry.data, json!("x"), "{name}");
        assert_eq!(cache.size(Some("t1")).unwrap(), 1, "{name}");
    }
}

#[test]
fn test_get_missing_is_none() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        assert!(
            cache.get(Some("nothing"), Some("here")).unwrap().is_none(),
            "{name}"
        );
    }
}

#[test]
fn test_get_all_with_prefix() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        cache.store("pfx_a", "k", &json!("va"), unix_now() + 100).unwrap();

        let found = cache.get_all("k", &["a", "b"], "pfx_").unwrap();
        assert_eq!(found.len(), 1, "{name}");
        assert!(found.contains_key("a"), "{name}");
        assert!(!found.contains_key("b"), "{name}");
        assert_eq!(found["a"].data, json!("va"), "{name}");
    }
}

#[test]
fn test_delete_is_idempotent() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        cache.store("t", "k", &json!("v"), unix_now() + 100).unwrap();

        assert!(cache.delete(Some("t"), Some("k")).unwrap(), "{name}");
        assert!(cache.delete(Some("t"), Some("k")).unwrap(), "{name}");
        assert!(cache.get(Some("t"), Some("k")).unwrap().is_none(), "{name}");
    }
}

#[test]
fn test_delete_leaves_neighbours() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        let expiry = unix_now() + 100;
        cache.store("testtype1", "testkey1", &json!("testdata1"), expiry).unwrap();
        cache.store("testtype1", "testkey2", &json!("testdata2"), expiry).unwrap();
        cache.store("testtype2", "testkey1", &json!("testdata3"), expiry).unwrap();
        cache.store("testtype2", "testkey2", &json!("testdata3"), expiry).unwrap();

        assert!(cache.delete(Some("testtype1"), Some("testkey1")).unwrap());

        assert!(cache.get(Some("testtype1"), Some("testkey1")).unwrap().is_none(), "{name}");
        assert!(cache.get(Some("testtype1"), Some("testkey2")).unwrap().is_some(), "{name}");
        assert!(cache.get(Some("testtype2"), Some("testkey1")).unwrap().is_some(), "{name}");
        assert!(cache.get(Some("testtype2"), Some("testkey2")).unwrap().is_some(), "{name}");
    }
}

#[test]
fn test_size_per_type() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        for key in ["testkey1", "testkey2", "testkey3", "testkey4"] {
            cache.store("testtype", key, &json!("data"), unix_now() + 100).unwrap();
        }
        assert_eq!(cache.size(Some("testtype")).unwrap(), 4, "{name}");
        assert_eq!(cache.size(Some("othertype")).unwrap(), 0, "{name}");
    }
}

#[test]
fn test_store_for_ttl() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        cache
            .store_for("t", "k", &json!("v"), Duration::from_secs(60))
            .unwrap();
        assert!(cache.get(Some("t"), Some("k")).unwrap().is_some(), "{name}");
    }
}

#[test]
fn test_gc_reports_success() {
    let (_temp, stores) = all_stores();
    for (name, cache) in &stores {
        assert!(cache.gc(None).unwrap(), "{name}");
        assert!(cache.gc(Some("t")).unwrap(), "{name}");
    }
}
