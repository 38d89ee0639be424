use crate::cache::TtlCache;
use crate::content::MessageContent;
use crate::error::BridgeError;
use crate::mapping::MappingStore;
use crate::matrix::{MatrixClient, MatrixError, SyncUpdate};
use crate::rooms::{normalize_local, parse_pair_key};
use crate::time::now_ms;
use crosstalk_api::types::{
    Attachment, FetchResult, FileEnvelope, Message, FILE_TRANSFER_CONTENT_TYPE, TEXT_CONTENT_TYPE,
};
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncPosition {
    pub token: String,
    pub observed_ms: u64,
}

/// Retrieves new events for a user since their last known position and
/// translates them into the external message schema.
pub struct FetchEngine {
    homeserver_domain: String,
    client: Arc<dyn MatrixClient>,
    mappings: Arc<MappingStore>,
    positions: RwLock<HashMap<String, SyncPosition>>,
    // Remote party per (room, viewer): viewer-relative but otherwise stable.
    participants: TtlCache<(String, String), String>,
}

impl FetchEngine {
    pub fn new(
        homeserver_domain: String,
        client: Arc<dyn MatrixClient>,
        mappings: Arc<MappingStore>,
        participant_cache_ttl: Duration,
    ) -> Self {
        Self {
            homeserver_domain,
            client,
            mappings,
            positions: RwLock::new(HashMap::new()),
            participants: TtlCache::new(participant_cache_ttl),
        }
    }

    pub async fn fetch_since(&self, matrix_id: &str) -> Result<FetchResult, BridgeError> {
        let since = {
            let positions = self.positions.read().await;
            positions.get(matrix_id).map(|p| p.token.clone())
        };
        let update = match self.client.sync(matrix_id, since.as_deref()).await {
            Ok(update) => update,
            Err(MatrixError::UnknownToken) => {
                warn!(
                    "sync token for {} no longer recognized, resyncing from the start",
                    matrix_id
                );
                {
                    let mut positions = self.positions.write().await;
                    positions.remove(matrix_id);
                }
                self.client
                    .sync(matrix_id, None)
                    .await
                    .map_err(BridgeError::from)?
            }
            Err(err) => return Err(err.into()),
        };
        // Persist before translating so the next call continues from here
        // even if the caller never comes back for this result.
        {
            let mut positions = self.positions.write().await;
            positions.insert(
                matrix_id.to_string(),
                SyncPosition {
                    token: update.next_batch.clone(),
                    observed_ms: now_ms(),
                },
            );
        }
        self.translate(matrix_id, since, update).await
    }

    pub async fn position(&self, matrix_id: &str) -> Option<SyncPosition> {
        let positions = self.positions.read().await;
        positions.get(matrix_id).cloned()
    }

    async fn translate(
        &self,
        matrix_id: &str,
        since: Option<String>,
        update: SyncUpdate,
    ) -> Result<FetchResult, BridgeError> {
        let viewer = self.mappings.reverse_resolve(matrix_id).await;
        let mut sent = Vec::new();
        let mut received = Vec::new();
        for room in update.rooms.iter() {
            for event in room.timeline.iter() {
                if event.event_type != "m.room.message" {
                    continue;
                }
                let content = MessageContent::decode(&event.content);
                let (body, content_type) = self.render(&content);
                if same_user(&event.sender, matrix_id) {
                    let remote = self.remote_party(&room.room_id, matrix_id).await;
                    sent.push(Message {
                        id: event.event_id.clone(),
                        from: viewer.clone(),
                        to: remote,
                        body,
                        content_type,
                        timestamp_ms: event.origin_server_ts,
                    });
                } else {
                    let remote = self.mappings.reverse_resolve(&event.sender).await;
                    received.push(Message {
                        id: event.event_id.clone(),
                        from: remote,
                        to: viewer.clone(),
                        body,
                        content_type,
                        timestamp_ms: event.origin_server_ts,
                    });
                }
            }
        }
        Ok(FetchResult {
            sent,
            received,
            from_token: since,
            next_token: update.next_batch,
        })
    }

    /// Media events become file-transfer envelopes; anything that cannot be
    /// converted degrades to the event's textual body instead of failing
    /// the whole fetch.
    fn render(&self, content: &MessageContent) -> (String, String) {
        let Some(media) = content.media() else {
            return (content.text_body(), TEXT_CONTENT_TYPE.to_string());
        };
        let Some(url) = media
            .url
            .as_deref()
            .and_then(|uri| self.client.media_url(uri))
        else {
            debug!("media event without retrievable content, degrading to text");
            return (content.text_body(), TEXT_CONTENT_TYPE.to_string());
        };
        let envelope = FileEnvelope {
            body: media.body.clone(),
            attachments: vec![Attachment {
                url,
                content_type: media.info.mimetype.clone(),
                size: media.info.size,
                filename: media.filename.clone().or_else(|| {
                    if media.body.is_empty() {
                        None
                    } else {
                        Some(media.body.clone())
                    }
                }),
                thumbnail_url: media
                    .info
                    .thumbnail_url
                    .as_deref()
                    .and_then(|uri| self.client.media_url(uri)),
            }],
        };
        match serde_json::to_string(&envelope) {
            Ok(encoded) => (encoded, FILE_TRANSFER_CONTENT_TYPE.to_string()),
            Err(err) => {
                warn!("file envelope encoding failed, degrading to text: {}", err);
                (content.text_body(), TEXT_CONTENT_TYPE.to_string())
            }
        }
    }

    /// For a sent event the remote party is whoever else shares the room.
    /// The pair-key alias set at creation time is parsed for the side that
    /// is not the viewer; rooms provisioned outside that convention fall
    /// back to the raw room id.
    async fn remote_party(&self, room_id: &str, viewer: &str) -> String {
        let key = (room_id.to_string(), viewer.to_string());
        if let Some(display) = self.participants.get(&key).await {
            return display;
        }
        let display = self.lookup_remote(room_id, viewer).await;
        self.participants.set(key, display.clone()).await;
        display
    }

    async fn lookup_remote(&self, room_id: &str, viewer: &str) -> String {
        let aliases = match self.client.room_aliases(viewer, room_id).await {
            Ok(aliases) => aliases,
            Err(err) => {
                debug!("alias lookup for {} failed: {}", room_id, err);
                return room_id.to_string();
            }
        };
        let viewer_local = normalize_local(viewer);
        for alias in aliases.iter() {
            let localpart = alias
                .strip_prefix('#')
                .and_then(|rest| rest.split(':').next())
                .unwrap_or_default();
            let Some((left, right)) = parse_pair_key(localpart) else {
                continue;
            };
            let other = if left == viewer_local {
                right
            } else if right == viewer_local {
                left
            } else {
                continue;
            };
            let other_id = format!("@{}:{}", other, self.homeserver_domain);
            return self.mappings.reverse_resolve(&other_id).await;
        }
        room_id.to_string()
    }
}

fn same_user(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
