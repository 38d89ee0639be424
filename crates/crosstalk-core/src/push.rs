use crate::error::BridgeError;
use async_trait::async_trait;
use crosstalk_api::types::{
    PushNotification, PushPayload, FILE_TRANSFER_CONTENT_TYPE, TEXT_CONTENT_TYPE,
};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceTokenRecord {
    pub selector: String,
    pub message_token: String,
    pub message_app_id: String,
    pub call_token: String,
    pub call_app_id: String,
}

/// Push-registration records, owned by an external store and consumed
/// read-only by the translator.
#[async_trait]
pub trait DeviceTokenStore: Send + Sync {
    async fn lookup(&self, key: &str) -> Result<Option<DeviceTokenRecord>, BridgeError>;
    async fn upsert(&self, key: &str, record: DeviceTokenRecord) -> Result<(), BridgeError>;
    async fn list(&self) -> Result<Vec<(String, DeviceTokenRecord)>, BridgeError>;
    async fn delete(&self, key: &str) -> Result<(), BridgeError>;
    async fn reset(&self) -> Result<(), BridgeError>;
}

#[derive(Default)]
pub struct InMemoryTokenStore {
    inner: RwLock<HashMap<String, DeviceTokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceTokenStore for InMemoryTokenStore {
    async fn lookup(&self, key: &str) -> Result<Option<DeviceTokenRecord>, BridgeError> {
        let guard = self.inner.read().await;
        Ok(guard.get(key).cloned())
    }

    async fn upsert(&self, key: &str, record: DeviceTokenRecord) -> Result<(), BridgeError> {
        let mut guard = self.inner.write().await;
        guard.insert(key.to_string(), record);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<(String, DeviceTokenRecord)>, BridgeError> {
        let guard = self.inner.read().await;
        let mut entries: Vec<(String, DeviceTokenRecord)> = guard
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries)
    }

    async fn delete(&self, key: &str) -> Result<(), BridgeError> {
        let mut guard = self.inner.write().await;
        guard.remove(key);
        Ok(())
    }

    async fn reset(&self) -> Result<(), BridgeError> {
        let mut guard = self.inner.write().await;
        guard.clear();
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushDelivery {
    Accepted,
    TokenRejected,
}

/// Destination push service.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, payload: &PushPayload) -> Result<PushDelivery, BridgeError>;
}

pub struct PushTranslator {
    tokens: Arc<dyn DeviceTokenStore>,
    gateway: Arc<dyn PushGateway>,
    default_sound: String,
}

impl PushTranslator {
    pub fn new(
        tokens: Arc<dyn DeviceTokenStore>,
        gateway: Arc<dyn PushGateway>,
        default_sound: String,
    ) -> Self {
        Self {
            tokens,
            gateway,
            default_sound,
        }
    }

    /// Returns the device keys the calling protocol should stop notifying:
    /// keys with no registration record and keys the destination service
    /// reported as no longer valid. Transient delivery failures are logged
    /// and the device stays registered.
    pub async fn translate(&self, notification: &PushNotification) -> Vec<String> {
        let mut rejected = Vec::new();
        for device in notification.devices.iter() {
            let record = match self.tokens.lookup(&device.pushkey).await {
                Ok(Some(record)) => record,
                Ok(None) => {
                    rejected.push(device.pushkey.clone());
                    continue;
                }
                Err(err) => {
                    warn!("token lookup for {} failed: {}", device.pushkey, err);
                    continue;
                }
            };
            let sound = device
                .tweaks
                .as_ref()
                .and_then(|t| t.sound.clone())
                .unwrap_or_else(|| self.default_sound.clone());
            let content = notification.content.as_ref();
            let msgtype = content
                .and_then(|c| c.msgtype.as_deref())
                .unwrap_or("m.text");
            let payload = PushPayload {
                verb: "notify".to_string(),
                app_id: record.message_app_id,
                token: record.message_token,
                body: content
                    .and_then(|c| c.body.clone())
                    .unwrap_or_default(),
                content_type: content_type_for(msgtype).to_string(),
                badge: notification
                    .counts
                    .as_ref()
                    .and_then(|c| c.unread)
                    .unwrap_or(0),
                sender: notification
                    .sender_display_name
                    .clone()
                    .unwrap_or_default(),
                dedup_id: notification.event_id.clone().unwrap_or_default(),
                thread_id: notification.room_id.clone().unwrap_or_default(),
                sound,
            };
            match self.gateway.send(&payload).await {
                Ok(PushDelivery::Accepted) => {}
                Ok(PushDelivery::TokenRejected) => rejected.push(device.pushkey.clone()),
                Err(err) => {
                    warn!("push delivery for {} failed: {}", device.pushkey, err);
                }
            }
        }
        rejected
    }
}

fn content_type_for(msgtype: &str) -> &'static str {
    match msgtype {
        "m.image" | "m.video" | "m.audio" | "m.file" => FILE_TRANSFER_CONTENT_TYPE,
        _ => TEXT_CONTENT_TYPE,
    }
}
