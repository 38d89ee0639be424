pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod fetch;
pub mod mapping;
pub mod matrix;
pub mod push;
pub mod rooms;
pub mod send;
pub mod time;

use auth::{Authenticator, CredentialValidator};
use config::BridgeConfig;
use crosstalk_api::types::{FetchResult, MappingEntry, PushNotification, SendRequest};
use crosstalk_api::validation::{validate_send_request, ValidationLimits};
use error::BridgeError;
use fetch::{FetchEngine, SyncPosition};
use mapping::MappingStore;
use matrix::MatrixClient;
use push::{DeviceTokenRecord, DeviceTokenStore, PushGateway, PushTranslator};
use rooms::DirectRoomManager;
use send::{ContentFetcher, SendEngine, SendOutcome};
use std::sync::Arc;
use std::time::Duration;

/// The bridge core: identity resolution, direct-room management and the
/// send/fetch translation engines, wired over injected collaborators.
pub struct Bridge {
    config: BridgeConfig,
    client: Arc<dyn MatrixClient>,
    mappings: Arc<MappingStore>,
    tokens: Arc<dyn DeviceTokenStore>,
    rooms: Arc<DirectRoomManager>,
    send: SendEngine,
    fetch: FetchEngine,
    push: PushTranslator,
    auth: Authenticator,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        client: Arc<dyn MatrixClient>,
        fetcher: Arc<dyn ContentFetcher>,
        validator: Arc<dyn CredentialValidator>,
        tokens: Arc<dyn DeviceTokenStore>,
        gateway: Arc<dyn PushGateway>,
    ) -> Self {
        let mappings = Arc::new(MappingStore::new());
        let rooms = Arc::new(DirectRoomManager::new(
            client.clone(),
            Duration::from_secs(config.room_cache_ttl_secs),
        ));
        let send = SendEngine::new(
            client.clone(),
            mappings.clone(),
            rooms.clone(),
            fetcher,
            config.max_attachment_bytes,
        );
        let fetch = FetchEngine::new(
            config.homeserver_domain.clone(),
            client.clone(),
            mappings.clone(),
            Duration::from_secs(config.participant_cache_ttl_secs),
        );
        let push = PushTranslator::new(
            tokens.clone(),
            gateway,
            config.default_push_sound.clone(),
        );
        let auth = Authenticator::new(
            validator,
            mappings.clone(),
            Duration::from_secs(config.auth_cache_ttl_secs),
        );
        Self {
            config,
            client,
            mappings,
            tokens,
            rooms,
            send,
            fetch,
            push,
            auth,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub async fn send_message(&self, request: &SendRequest) -> Result<SendOutcome, BridgeError> {
        let limits = ValidationLimits {
            max_body_bytes: self.config.max_body_bytes,
            ..ValidationLimits::default()
        };
        validate_send_request(request, &limits)
            .map_err(|e| BridgeError::Validation(e.to_string()))?;
        self.send
            .send(
                &request.from,
                &request.to,
                &request.body,
                &request.content_type,
            )
            .await
    }

    pub async fn fetch_since(&self, matrix_id: &str) -> Result<FetchResult, BridgeError> {
        self.fetch.fetch_since(matrix_id).await
    }

    pub async fn sync_position(&self, matrix_id: &str) -> Option<SyncPosition> {
        self.fetch.position(matrix_id).await
    }

    pub async fn translate_push(&self, notification: &PushNotification) -> Vec<String> {
        self.push.translate(notification).await
    }

    pub async fn authenticate(
        &self,
        identifier: &str,
        secret: &str,
    ) -> Result<String, BridgeError> {
        self.auth.authenticate(identifier, secret).await
    }

    pub async fn ensure_room(
        &self,
        participant_a: &str,
        participant_b: &str,
    ) -> Result<String, BridgeError> {
        self.rooms.ensure_room(participant_a, participant_b).await
    }

    pub async fn resolve(&self, identifier: &str) -> Option<String> {
        self.mappings.resolve(identifier).await
    }

    pub async fn reverse_resolve(&self, matrix_id: &str) -> String {
        self.mappings.reverse_resolve(matrix_id).await
    }

    pub async fn upsert_mapping(&self, entry: MappingEntry) -> Result<(), BridgeError> {
        self.mappings.upsert(entry).await
    }

    pub async fn list_mappings(&self) -> Vec<MappingEntry> {
        self.mappings.list().await
    }

    pub async fn bulk_load_mappings(&self, entries: Vec<MappingEntry>) -> usize {
        self.mappings.bulk_load(entries).await
    }

    /// Stores a device's push registration and registers the matching push
    /// target with the chat server.
    pub async fn register_push_device(
        &self,
        identifier: &str,
        pushkey: &str,
        record: DeviceTokenRecord,
    ) -> Result<(), BridgeError> {
        let matrix_id = self
            .mappings
            .resolve(identifier)
            .await
            .ok_or(BridgeError::NotFound)?;
        self.tokens.upsert(pushkey, record.clone()).await?;
        self.client
            .register_pusher(&matrix_id, pushkey, &record.message_app_id)
            .await
            .map_err(BridgeError::from)
    }

    pub fn device_tokens(&self) -> Arc<dyn DeviceTokenStore> {
        self.tokens.clone()
    }
}

#[cfg(test)]
mod tests;
