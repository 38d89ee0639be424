use super::harness;
use crate::push::{DeviceTokenRecord, DeviceTokenStore};
use crosstalk_api::types::{
    NotificationContent, NotificationCounts, PushDevice, PushNotification, PushTweaks,
};

fn record(token: &str) -> DeviceTokenRecord {
    DeviceTokenRecord {
        selector: "default".to_string(),
        message_token: token.to_string(),
        message_app_id: "app.softphone.message".to_string(),
        call_token: format!("{}-call", token),
        call_app_id: "app.softphone.call".to_string(),
    }
}

fn device(pushkey: &str) -> PushDevice {
    PushDevice {
        pushkey: pushkey.to_string(),
        app_id: "bridge.push".to_string(),
        tweaks: None,
    }
}

fn notification(devices: Vec<PushDevice>) -> PushNotification {
    PushNotification {
        event_id: Some("$e42".to_string()),
        room_id: Some("!r1:srv".to_string()),
        sender_display_name: Some("Alice".to_string()),
        content: Some(NotificationContent {
            msgtype: Some("m.text".to_string()),
            body: Some("ping".to_string()),
        }),
        counts: Some(NotificationCounts { unread: Some(3) }),
        devices,
    }
}

#[tokio::test]
async fn missing_registration_rejects_only_that_device() {
    let h = harness();
    h.tokens
        .upsert("known", record("tok-known"))
        .await
        .expect("register");
    let rejected = h
        .bridge
        .translate_push(&notification(vec![device("known"), device("absent")]))
        .await;
    assert_eq!(rejected, vec!["absent".to_string()]);
    let sent = h.gateway.sent.lock().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].token, "tok-known");
}

#[tokio::test]
async fn payload_carries_notification_fields() {
    let h = harness();
    h.tokens
        .upsert("key", record("tok"))
        .await
        .expect("register");
    let rejected = h
        .bridge
        .translate_push(&notification(vec![device("key")]))
        .await;
    assert!(rejected.is_empty());
    let sent = h.gateway.sent.lock().await;
    let payload = &sent[0];
    assert_eq!(payload.verb, "notify");
    assert_eq!(payload.app_id, "app.softphone.message");
    assert_eq!(payload.body, "ping");
    assert_eq!(payload.content_type, "text/plain");
    assert_eq!(payload.badge, 3);
    assert_eq!(payload.sender, "Alice");
    assert_eq!(payload.dedup_id, "$e42");
    assert_eq!(payload.thread_id, "!r1:srv");
    assert_eq!(payload.sound, "default");
}

#[tokio::test]
async fn sound_tweak_overrides_default() {
    let h = harness();
    h.tokens
        .upsert("key", record("tok"))
        .await
        .expect("register");
    let mut notif = notification(vec![PushDevice {
        pushkey: "key".to_string(),
        app_id: "bridge.push".to_string(),
        tweaks: Some(PushTweaks {
            sound: Some("chime".to_string()),
        }),
    }]);
    notif.counts = None;
    let rejected = h.bridge.translate_push(&notif).await;
    assert!(rejected.is_empty());
    let sent = h.gateway.sent.lock().await;
    assert_eq!(sent[0].sound, "chime");
    assert_eq!(sent[0].badge, 0);
}

#[tokio::test]
async fn invalidated_token_lands_in_rejected_set() {
    let h = harness();
    h.tokens
        .upsert("stale", record("tok-stale"))
        .await
        .expect("register");
    h.gateway.mark_invalid("tok-stale").await;
    let rejected = h
        .bridge
        .translate_push(&notification(vec![device("stale")]))
        .await;
    assert_eq!(rejected, vec!["stale".to_string()]);
}

#[tokio::test]
async fn transient_gateway_failure_keeps_device_registered() {
    let h = harness();
    h.tokens
        .upsert("flaky", record("tok-flaky"))
        .await
        .expect("register");
    h.gateway.mark_failing("tok-flaky").await;
    let rejected = h
        .bridge
        .translate_push(&notification(vec![device("flaky")]))
        .await;
    assert!(rejected.is_empty());
    assert!(h.gateway.sent.lock().await.is_empty());
}

#[tokio::test]
async fn media_notifications_use_the_file_content_type() {
    let h = harness();
    h.tokens
        .upsert("key", record("tok"))
        .await
        .expect("register");
    let mut notif = notification(vec![device("key")]);
    notif.content = Some(NotificationContent {
        msgtype: Some("m.image".to_string()),
        body: Some("photo.jpg".to_string()),
    });
    h.bridge.translate_push(&notif).await;
    let sent = h.gateway.sent.lock().await;
    assert_eq!(
        sent[0].content_type,
        crosstalk_api::types::FILE_TRANSFER_CONTENT_TYPE
    );
}

#[tokio::test]
async fn device_registration_stores_record_and_registers_pusher() {
    let h = harness();
    super::seed_pair(&h).await;
    h.bridge
        .register_push_device("201", "key-1", record("tok-1"))
        .await
        .expect("register");
    let stored = h
        .tokens
        .lookup("key-1")
        .await
        .expect("lookup")
        .expect("record");
    assert_eq!(stored.message_token, "tok-1");
    let pushers = h.matrix.pushers().await;
    assert_eq!(
        pushers,
        vec![(
            "@alice:srv".to_string(),
            "key-1".to_string(),
            "app.softphone.message".to_string()
        )]
    );
}

#[tokio::test]
async fn device_registration_requires_a_known_identifier() {
    let h = harness();
    let result = h
        .bridge
        .register_push_device("999", "key-1", record("tok-1"))
        .await;
    assert!(matches!(
        result,
        Err(crate::error::BridgeError::NotFound)
    ));
}

#[tokio::test]
async fn token_store_admin_operations() {
    let h = harness();
    let store = h.bridge.device_tokens();
    store.upsert("a", record("tok-a")).await.expect("upsert a");
    store.upsert("b", record("tok-b")).await.expect("upsert b");
    assert_eq!(store.list().await.expect("list").len(), 2);
    store.delete("a").await.expect("delete");
    assert!(store.lookup("a").await.expect("lookup").is_none());
    store.reset().await.expect("reset");
    assert!(store.list().await.expect("list").is_empty());
}
