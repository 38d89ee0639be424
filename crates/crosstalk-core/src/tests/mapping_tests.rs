use super::entry;
use crate::error::BridgeError;
use crate::mapping::{is_matrix_id, MappingStore};
use crosstalk_api::types::MappingEntry;

#[tokio::test]
async fn resolve_returns_matrix_ids_unchanged() {
    let store = MappingStore::new();
    assert_eq!(
        store.resolve("@alice:srv").await,
        Some("@alice:srv".to_string())
    );
    assert!(is_matrix_id("@alice:srv"));
    assert!(!is_matrix_id("201"));
}

#[tokio::test]
async fn resolve_by_canonical_and_alt_number() {
    let store = MappingStore::new();
    store
        .upsert(entry("201", "@alice:srv", &["91201"]))
        .await
        .expect("upsert");
    assert_eq!(store.resolve("201").await, Some("@alice:srv".to_string()));
    assert_eq!(store.resolve("91201").await, Some("@alice:srv".to_string()));
    assert_eq!(store.resolve("999").await, None);
}

#[tokio::test]
async fn reverse_resolve_surfaces_canonical_number_only() {
    let store = MappingStore::new();
    store
        .upsert(entry("201", "@alice:srv", &["91201"]))
        .await
        .expect("upsert");
    assert_eq!(store.reverse_resolve("@alice:srv").await, "201");
    // Unknown identities fall back to the raw Matrix id.
    assert_eq!(store.reverse_resolve("@carol:srv").await, "@carol:srv");
}

#[tokio::test]
async fn reverse_resolve_is_case_insensitive() {
    let store = MappingStore::new();
    store
        .upsert(entry("201", "@Alice:srv", &[]))
        .await
        .expect("upsert");
    assert_eq!(store.reverse_resolve("@alice:srv").await, "201");
}

#[tokio::test]
async fn reupsert_swaps_alt_number_resolvability() {
    let store = MappingStore::new();
    store
        .upsert(entry("201", "@alice:srv", &["91201"]))
        .await
        .expect("first upsert");
    store
        .upsert(entry("201", "@alice:srv", &["95555"]))
        .await
        .expect("second upsert");
    assert_eq!(store.resolve("91201").await, None);
    assert_eq!(store.resolve("95555").await, Some("@alice:srv".to_string()));
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn upsert_requires_canonical_number() {
    let store = MappingStore::new();
    let result = store.upsert(entry("", "@alice:srv", &[])).await;
    assert!(matches!(result, Err(BridgeError::Validation(_))));
}

#[tokio::test]
async fn bulk_load_skips_invalid_entries() {
    let store = MappingStore::new();
    let entries = vec![
        entry("201", "@alice:srv", &[]),
        entry("", "@broken:srv", &[]),
        entry("202", "@bob:srv", &[]),
    ];
    let applied = store.bulk_load(entries).await;
    assert_eq!(applied, 2);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn get_reports_mapping_not_found() {
    let store = MappingStore::new();
    assert!(matches!(store.get("404").await, Err(BridgeError::NotFound)));
}

#[tokio::test]
async fn list_is_sorted_and_detached() {
    let store = MappingStore::new();
    store
        .upsert(entry("202", "@bob:srv", &[]))
        .await
        .expect("bob");
    store
        .upsert(entry("201", "@alice:srv", &[]))
        .await
        .expect("alice");
    let mut listed = store.list().await;
    assert_eq!(listed[0].number, "201");
    assert_eq!(listed[1].number, "202");
    listed[0].matrix_id = "@mutated:srv".to_string();
    assert_eq!(store.resolve("201").await, Some("@alice:srv".to_string()));
}

#[tokio::test]
async fn display_name_does_not_shadow_canonical_number() {
    let store = MappingStore::new();
    store
        .upsert(MappingEntry {
            number: "201".to_string(),
            matrix_id: "@alice:srv".to_string(),
            display_name: Some("Alice".to_string()),
            alt_numbers: vec![],
        })
        .await
        .expect("upsert");
    assert_eq!(store.reverse_resolve("@alice:srv").await, "201");
}
