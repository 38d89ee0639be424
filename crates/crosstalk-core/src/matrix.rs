use crate::content::MessageContent;
use crate::error::BridgeError;
use crate::time::now_ms;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("unknown sync token")]
    UnknownToken,
    #[error("unauthorized")]
    Unauthorized,
    #[error("alias taken")]
    AliasTaken,
    #[error("not found")]
    NotFound,
    #[error("transport {0}")]
    Transport(String),
    #[error("status {0}")]
    Status(u16),
}

impl From<MatrixError> for BridgeError {
    fn from(err: MatrixError) -> Self {
        match err {
            MatrixError::Unauthorized => BridgeError::Auth,
            other => BridgeError::Matrix(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimelineEvent {
    pub event_id: String,
    pub sender: String,
    pub event_type: String,
    pub content: Value,
    pub origin_server_ts: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoinedRoom {
    pub room_id: String,
    pub timeline: Vec<TimelineEvent>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncUpdate {
    pub next_batch: String,
    pub rooms: Vec<JoinedRoom>,
}

/// Wire client for the chat server. Every call names the acting identity
/// explicitly; implementations must not keep a mutable "acting as" field.
#[async_trait]
pub trait MatrixClient: Send + Sync {
    async fn send_message(
        &self,
        as_user: &str,
        room_id: &str,
        content: &MessageContent,
    ) -> Result<String, MatrixError>;

    async fn sync(&self, as_user: &str, since: Option<&str>) -> Result<SyncUpdate, MatrixError>;

    async fn create_direct_room(
        &self,
        as_user: &str,
        invite: &str,
        alias_localpart: &str,
    ) -> Result<String, MatrixError>;

    async fn join_room(&self, as_user: &str, room_id: &str) -> Result<(), MatrixError>;

    async fn resolve_alias(&self, alias_localpart: &str) -> Result<Option<String>, MatrixError>;

    async fn room_aliases(&self, as_user: &str, room_id: &str)
        -> Result<Vec<String>, MatrixError>;

    async fn upload_media(
        &self,
        as_user: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, MatrixError>;

    async fn register_pusher(
        &self,
        as_user: &str,
        pushkey: &str,
        app_id: &str,
    ) -> Result<(), MatrixError>;

    /// Resolves an internal content reference to a URL the softphone side
    /// can retrieve. Returns `None` for references it cannot translate.
    fn media_url(&self, content_uri: &str) -> Option<String>;
}

struct RoomState {
    members: HashSet<String>,
    invited: HashSet<String>,
    alias: Option<String>,
}

struct StoredEvent {
    seq: u64,
    room_id: String,
    event: TimelineEvent,
}

#[derive(Default)]
struct MatrixState {
    seq: u64,
    next_room: u64,
    next_upload: u64,
    aliases: HashMap<String, String>,
    rooms: HashMap<String, RoomState>,
    events: Vec<StoredEvent>,
    uploads: HashMap<String, (String, Vec<u8>)>,
    pushers: Vec<(String, String, String)>,
    denied: HashSet<String>,
    created_rooms: u64,
}

/// In-memory chat server used by tests and local runs. Alias uniqueness is
/// enforced the way the real server enforces it, so racing room creations
/// behave as they do against the wire.
pub struct InMemoryMatrix {
    domain: String,
    state: Mutex<MatrixState>,
}

impl InMemoryMatrix {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            state: Mutex::new(MatrixState::default()),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub async fn deny(&self, user: &str) {
        let mut state = self.state.lock().await;
        state.denied.insert(user.to_string());
    }

    pub async fn created_rooms(&self) -> u64 {
        let state = self.state.lock().await;
        state.created_rooms
    }

    pub async fn room_members(&self, room_id: &str) -> Vec<String> {
        let state = self.state.lock().await;
        let mut members: Vec<String> = state
            .rooms
            .get(room_id)
            .map(|room| room.members.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub async fn uploads(&self) -> Vec<(String, String)> {
        let state = self.state.lock().await;
        state
            .uploads
            .iter()
            .map(|(uri, (content_type, _))| (uri.clone(), content_type.clone()))
            .collect()
    }

    pub async fn pushers(&self) -> Vec<(String, String, String)> {
        let state = self.state.lock().await;
        state.pushers.clone()
    }

    /// Seeds a room that was not created through the alias convention,
    /// e.g. a manually provisioned one.
    pub async fn seed_room(&self, room_id: &str, members: &[&str]) {
        let mut state = self.state.lock().await;
        state.rooms.insert(
            room_id.to_string(),
            RoomState {
                members: members.iter().map(|m| m.to_string()).collect(),
                invited: HashSet::new(),
                alias: None,
            },
        );
    }

    fn check_allowed(state: &MatrixState, user: &str) -> Result<(), MatrixError> {
        if state.denied.contains(user) {
            return Err(MatrixError::Unauthorized);
        }
        Ok(())
    }

    fn parse_token(token: &str) -> Result<u64, MatrixError> {
        token
            .strip_prefix('s')
            .and_then(|raw| raw.parse::<u64>().ok())
            .ok_or(MatrixError::UnknownToken)
    }
}

#[async_trait]
impl MatrixClient for InMemoryMatrix {
    async fn send_message(
        &self,
        as_user: &str,
        room_id: &str,
        content: &MessageContent,
    ) -> Result<String, MatrixError> {
        let mut state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        if !state.rooms.contains_key(room_id) {
            return Err(MatrixError::NotFound);
        }
        state.seq += 1;
        let event_id = format!("$e{}", state.seq);
        let event = TimelineEvent {
            event_id: event_id.clone(),
            sender: as_user.to_string(),
            event_type: "m.room.message".to_string(),
            content: content.encode(),
            origin_server_ts: now_ms(),
        };
        let seq = state.seq;
        state.events.push(StoredEvent {
            seq,
            room_id: room_id.to_string(),
            event,
        });
        Ok(event_id)
    }

    async fn sync(&self, as_user: &str, since: Option<&str>) -> Result<SyncUpdate, MatrixError> {
        let state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        let floor = match since {
            Some(token) => Self::parse_token(token)?,
            None => 0,
        };
        let mut rooms: Vec<JoinedRoom> = Vec::new();
        for stored in state.events.iter().filter(|e| e.seq > floor) {
            let joined = state
                .rooms
                .get(&stored.room_id)
                .map(|room| room.members.contains(as_user))
                .unwrap_or(false);
            if !joined {
                continue;
            }
            match rooms.iter_mut().find(|r| r.room_id == stored.room_id) {
                Some(room) => room.timeline.push(stored.event.clone()),
                None => rooms.push(JoinedRoom {
                    room_id: stored.room_id.clone(),
                    timeline: vec![stored.event.clone()],
                }),
            }
        }
        Ok(SyncUpdate {
            next_batch: format!("s{}", state.seq),
            rooms,
        })
    }

    async fn create_direct_room(
        &self,
        as_user: &str,
        invite: &str,
        alias_localpart: &str,
    ) -> Result<String, MatrixError> {
        let mut state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        if state.aliases.contains_key(alias_localpart) {
            return Err(MatrixError::AliasTaken);
        }
        state.next_room += 1;
        let room_id = format!("!r{}:{}", state.next_room, self.domain);
        state
            .aliases
            .insert(alias_localpart.to_string(), room_id.clone());
        let mut members = HashSet::new();
        members.insert(as_user.to_string());
        let mut invited = HashSet::new();
        invited.insert(invite.to_string());
        state.rooms.insert(
            room_id.clone(),
            RoomState {
                members,
                invited,
                alias: Some(alias_localpart.to_string()),
            },
        );
        state.created_rooms += 1;
        Ok(room_id)
    }

    async fn join_room(&self, as_user: &str, room_id: &str) -> Result<(), MatrixError> {
        let mut state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        let room = state
            .rooms
            .get_mut(room_id)
            .ok_or(MatrixError::NotFound)?;
        room.invited.remove(as_user);
        room.members.insert(as_user.to_string());
        Ok(())
    }

    async fn resolve_alias(&self, alias_localpart: &str) -> Result<Option<String>, MatrixError> {
        let state = self.state.lock().await;
        Ok(state.aliases.get(alias_localpart).cloned())
    }

    async fn room_aliases(
        &self,
        as_user: &str,
        room_id: &str,
    ) -> Result<Vec<String>, MatrixError> {
        let state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        let room = state.rooms.get(room_id).ok_or(MatrixError::NotFound)?;
        Ok(room
            .alias
            .iter()
            .map(|localpart| format!("#{}:{}", localpart, self.domain))
            .collect())
    }

    async fn upload_media(
        &self,
        as_user: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, MatrixError> {
        let mut state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        state.next_upload += 1;
        let uri = format!("mxc://{}/m{}", self.domain, state.next_upload);
        state
            .uploads
            .insert(uri.clone(), (content_type.to_string(), bytes));
        Ok(uri)
    }

    async fn register_pusher(
        &self,
        as_user: &str,
        pushkey: &str,
        app_id: &str,
    ) -> Result<(), MatrixError> {
        let mut state = self.state.lock().await;
        Self::check_allowed(&state, as_user)?;
        state
            .pushers
            .push((as_user.to_string(), pushkey.to_string(), app_id.to_string()));
        Ok(())
    }

    fn media_url(&self, content_uri: &str) -> Option<String> {
        let rest = content_uri.strip_prefix("mxc://")?;
        Some(format!("https://{}/_media/{}", self.domain, rest))
    }
}
