use crate::cache::TtlCache;
use crate::error::BridgeError;
use crate::matrix::{MatrixClient, MatrixError};
use log::debug;
use std::sync::Arc;
use std::time::Duration;

pub const PAIR_KEY_SEPARATOR: char = '|';

/// Strips the sigil and domain and lowercases, so `@Alice:srv` and
/// `alice` normalize to the same local identity.
pub fn normalize_local(identity: &str) -> String {
    let trimmed = identity.trim().trim_start_matches('@');
    let local = trimmed.split(':').next().unwrap_or(trimmed);
    local.to_ascii_lowercase()
}

/// Deterministic, order-independent key for a participant pair. Doubles as
/// the room-alias localpart, which is what makes room discovery idempotent.
pub fn pair_key(a: &str, b: &str) -> String {
    let mut sides = [normalize_local(a), normalize_local(b)];
    sides.sort();
    format!("{}{}{}", sides[0], PAIR_KEY_SEPARATOR, sides[1])
}

pub fn parse_pair_key(key: &str) -> Option<(String, String)> {
    let (left, right) = key.split_once(PAIR_KEY_SEPARATOR)?;
    if left.is_empty() || right.is_empty() {
        return None;
    }
    Some((left.to_string(), right.to_string()))
}

/// Returns the single canonical room for a participant pair, creating it if
/// absent. The server's alias uniqueness constraint is the serialization
/// point for concurrent callers; the cache is a performance layer only.
pub struct DirectRoomManager {
    client: Arc<dyn MatrixClient>,
    cache: TtlCache<String, String>,
}

impl DirectRoomManager {
    pub fn new(client: Arc<dyn MatrixClient>, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: TtlCache::new(cache_ttl),
        }
    }

    pub async fn ensure_room(
        &self,
        participant_a: &str,
        participant_b: &str,
    ) -> Result<String, BridgeError> {
        let key = pair_key(participant_a, participant_b);
        if let Some(room_id) = self.cache.get(&key).await {
            return Ok(room_id);
        }
        if let Some(room_id) = self.client.resolve_alias(&key).await.map_err(BridgeError::from)? {
            self.cache.set(key, room_id.clone()).await;
            return Ok(room_id);
        }
        let room_id = match self
            .client
            .create_direct_room(participant_a, participant_b, &key)
            .await
        {
            Ok(room_id) => room_id,
            // Lost the creation race; the alias now resolves.
            Err(MatrixError::AliasTaken) => {
                debug!("alias {} taken, re-resolving", key);
                self.client
                    .resolve_alias(&key)
                    .await
                    .map_err(BridgeError::from)?
                    .ok_or_else(|| BridgeError::Matrix(format!("alias {} unresolvable", key)))?
            }
            Err(err) => return Err(err.into()),
        };
        // Without this join the room never shows up in B's own sync.
        self.client
            .join_room(participant_b, &room_id)
            .await
            .map_err(BridgeError::from)?;
        self.cache.set(key, room_id.clone()).await;
        Ok(room_id)
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}
