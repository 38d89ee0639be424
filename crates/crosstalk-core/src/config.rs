use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Homeserver domain used to rebuild full user ids from pair-key sides.
    pub homeserver_domain: String,
    /// TTL for the pair-key to room-id cache. Zero disables the cache.
    pub room_cache_ttl_secs: u64,
    /// TTL for the per (room, viewer) remote-party cache. Zero disables it.
    pub participant_cache_ttl_secs: u64,
    /// TTL for validated credentials. Zero disables the cache.
    pub auth_cache_ttl_secs: u64,
    /// Ceiling for attachment downloads on the send path.
    pub max_attachment_bytes: usize,
    pub max_body_bytes: usize,
    pub default_push_sound: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            homeserver_domain: "localhost".to_string(),
            room_cache_ttl_secs: 30 * 60,
            participant_cache_ttl_secs: 30 * 60,
            auth_cache_ttl_secs: 5 * 60,
            max_attachment_bytes: 32 * 1024 * 1024,
            max_body_bytes: 64 * 1024,
            default_push_sound: "default".to_string(),
        }
    }
}
