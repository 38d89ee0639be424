use super::harness;
use crate::rooms::{normalize_local, pair_key, parse_pair_key};

#[test]
fn pair_key_is_order_independent() {
    assert_eq!(pair_key("@alice:srv", "@bob:srv"), "alice|bob");
    assert_eq!(pair_key("@bob:srv", "@alice:srv"), "alice|bob");
    assert_eq!(pair_key("@Bob:other", "alice"), "alice|bob");
}

#[test]
fn normalize_strips_sigil_and_domain() {
    assert_eq!(normalize_local("@Alice:srv"), "alice");
    assert_eq!(normalize_local("bob"), "bob");
}

#[test]
fn pair_key_parses_back() {
    assert_eq!(
        parse_pair_key("alice|bob"),
        Some(("alice".to_string(), "bob".to_string()))
    );
    assert_eq!(parse_pair_key("noseparator"), None);
    assert_eq!(parse_pair_key("|bob"), None);
}

#[tokio::test]
async fn ensure_room_is_symmetric_and_creates_once() {
    let h = harness();
    let first = h
        .bridge
        .ensure_room("@alice:srv", "@bob:srv")
        .await
        .expect("first ensure");
    let second = h
        .bridge
        .ensure_room("@bob:srv", "@alice:srv")
        .await
        .expect("second ensure");
    assert_eq!(first, second);
    assert_eq!(h.matrix.created_rooms().await, 1);
    // Both participants end up joined so the room shows in both syncs.
    let members = h.matrix.room_members(&first).await;
    assert_eq!(members, vec!["@alice:srv".to_string(), "@bob:srv".to_string()]);
}

#[tokio::test]
async fn ensure_room_discovers_alias_without_cache() {
    let h = harness();
    let room = h
        .bridge
        .ensure_room("@alice:srv", "@bob:srv")
        .await
        .expect("create");
    // A second manager instance has a cold cache and must find the room
    // through the alias registry, not a second creation.
    let other = crate::rooms::DirectRoomManager::new(
        h.matrix.clone(),
        std::time::Duration::from_secs(60),
    );
    let rediscovered = other
        .ensure_room("@alice:srv", "@bob:srv")
        .await
        .expect("rediscover");
    assert_eq!(room, rediscovered);
    assert_eq!(h.matrix.created_rooms().await, 1);
}

#[tokio::test]
async fn concurrent_first_time_calls_converge() {
    let h = harness();
    let manager = std::sync::Arc::new(crate::rooms::DirectRoomManager::new(
        h.matrix.clone(),
        std::time::Duration::from_secs(60),
    ));
    let a = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.ensure_room("@alice:srv", "@bob:srv").await })
    };
    let b = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.ensure_room("@bob:srv", "@alice:srv").await })
    };
    let first = a.await.expect("join").expect("ensure a");
    let second = b.await.expect("join").expect("ensure b");
    assert_eq!(first, second);
    assert_eq!(h.matrix.created_rooms().await, 1);
}
