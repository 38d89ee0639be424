use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub errcode: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SendResponse {
    pub event_id: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CreateRoomRequest {
    pub is_direct: bool,
    pub preset: String,
    pub room_alias_name: String,
    pub invite: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CreateRoomResponse {
    pub room_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AliasResponse {
    pub room_id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AliasesResponse {
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UploadResponse {
    pub content_uri: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PusherRequest {
    pub pushkey: String,
    pub app_id: String,
    pub kind: String,
    pub app_display_name: String,
    pub device_display_name: String,
    pub lang: String,
    pub data: Value,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ClientEvent {
    pub event_id: String,
    pub sender: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub origin_server_ts: u64,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<ClientEvent>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct JoinedRoomState {
    #[serde(default)]
    pub timeline: Timeline,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SyncRooms {
    #[serde(default)]
    pub join: HashMap<String, JoinedRoomState>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SyncResponse {
    pub next_batch: String,
    #[serde(default)]
    pub rooms: SyncRooms,
}
