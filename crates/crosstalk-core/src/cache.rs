use crate::time::now_ms;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::sync::RwLock;

/// Time-bounded key-value store with lazy expiry. Expired entries count as
/// misses and stay in the map until overwritten or cleared. A zero TTL
/// disables caching entirely: sets are dropped and every read misses.
pub struct TtlCache<K, V> {
    ttl_ms: u64,
    inner: RwLock<HashMap<K, (V, u64)>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl_ms: ttl.as_millis() as u64,
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub async fn set(&self, key: K, value: V) {
        if self.ttl_ms == 0 {
            return;
        }
        let expires_at = now_ms().saturating_add(self.ttl_ms);
        let mut guard = self.inner.write().await;
        guard.insert(key, (value, expires_at));
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        if self.ttl_ms == 0 {
            return None;
        }
        let guard = self.inner.read().await;
        match guard.get(key) {
            Some((value, expires_at)) if now_ms() < *expires_at => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.clear();
    }

    pub async fn len(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
