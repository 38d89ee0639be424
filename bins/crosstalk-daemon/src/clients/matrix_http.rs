use async_trait::async_trait;
use crosstalk_core::content::MessageContent;
use crosstalk_core::matrix::{
    JoinedRoom, MatrixClient, MatrixError, SyncUpdate, TimelineEvent,
};
use crosstalk_matrix_client::types::{CreateRoomRequest, PusherRequest};
use crosstalk_matrix_client::{MatrixClientError, MatrixHttpClient};
use serde_json::json;

/// Adapts the raw client-server API client to the core's wire-client seam.
pub struct HttpMatrix {
    inner: MatrixHttpClient,
    domain: String,
}

impl HttpMatrix {
    pub fn new(inner: MatrixHttpClient, domain: &str) -> Self {
        Self {
            inner,
            domain: domain.to_string(),
        }
    }
}

fn map_error(err: MatrixClientError) -> MatrixError {
    match err.errcode() {
        Some("M_ROOM_IN_USE") => return MatrixError::AliasTaken,
        Some("M_UNKNOWN_POS") => return MatrixError::UnknownToken,
        Some("M_UNKNOWN_TOKEN") | Some("M_FORBIDDEN") => return MatrixError::Unauthorized,
        Some("M_NOT_FOUND") => return MatrixError::NotFound,
        _ => {}
    }
    match err.status() {
        Some(401) | Some(403) => MatrixError::Unauthorized,
        Some(404) => MatrixError::NotFound,
        Some(status) => MatrixError::Status(status),
        None => MatrixError::Transport(err.to_string()),
    }
}

#[async_trait]
impl MatrixClient for HttpMatrix {
    async fn send_message(
        &self,
        as_user: &str,
        room_id: &str,
        content: &MessageContent,
    ) -> Result<String, MatrixError> {
        let response = self
            .inner
            .send_message(as_user, room_id, &content.encode())
            .await
            .map_err(map_error)?;
        Ok(response.event_id)
    }

    async fn sync(&self, as_user: &str, since: Option<&str>) -> Result<SyncUpdate, MatrixError> {
        let response = self.inner.sync(as_user, since).await.map_err(map_error)?;
        let mut rooms = Vec::with_capacity(response.rooms.join.len());
        for (room_id, state) in response.rooms.join.into_iter() {
            rooms.push(JoinedRoom {
                room_id,
                timeline: state
                    .timeline
                    .events
                    .into_iter()
                    .map(|event| TimelineEvent {
                        event_id: event.event_id,
                        sender: event.sender,
                        event_type: event.event_type,
                        content: event.content,
                        origin_server_ts: event.origin_server_ts,
                    })
                    .collect(),
            });
        }
        Ok(SyncUpdate {
            next_batch: response.next_batch,
            rooms,
        })
    }

    async fn create_direct_room(
        &self,
        as_user: &str,
        invite: &str,
        alias_localpart: &str,
    ) -> Result<String, MatrixError> {
        let request = CreateRoomRequest {
            is_direct: true,
            preset: "trusted_private_chat".to_string(),
            room_alias_name: alias_localpart.to_string(),
            invite: vec![invite.to_string()],
        };
        let response = self
            .inner
            .create_room(as_user, &request)
            .await
            .map_err(map_error)?;
        Ok(response.room_id)
    }

    async fn join_room(&self, as_user: &str, room_id: &str) -> Result<(), MatrixError> {
        self.inner
            .join_room(as_user, room_id)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    async fn resolve_alias(&self, alias_localpart: &str) -> Result<Option<String>, MatrixError> {
        let alias = format!("#{}:{}", alias_localpart, self.domain);
        match self.inner.resolve_alias(&alias).await {
            Ok(response) => Ok(response.map(|r| r.room_id)),
            Err(err) => match map_error(err) {
                MatrixError::NotFound => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn room_aliases(
        &self,
        as_user: &str,
        room_id: &str,
    ) -> Result<Vec<String>, MatrixError> {
        let response = self
            .inner
            .room_aliases(as_user, room_id)
            .await
            .map_err(map_error)?;
        Ok(response.aliases)
    }

    async fn upload_media(
        &self,
        as_user: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, MatrixError> {
        let response = self
            .inner
            .upload(as_user, content_type, bytes)
            .await
            .map_err(map_error)?;
        Ok(response.content_uri)
    }

    async fn register_pusher(
        &self,
        as_user: &str,
        pushkey: &str,
        app_id: &str,
    ) -> Result<(), MatrixError> {
        let request = PusherRequest {
            pushkey: pushkey.to_string(),
            app_id: app_id.to_string(),
            kind: "http".to_string(),
            app_display_name: "crosstalk".to_string(),
            device_display_name: "crosstalk".to_string(),
            lang: "en".to_string(),
            data: json!({}),
        };
        self.inner
            .set_pusher(as_user, &request)
            .await
            .map_err(map_error)?;
        Ok(())
    }

    fn media_url(&self, content_uri: &str) -> Option<String> {
        self.inner.media_url(content_uri)
    }
}
