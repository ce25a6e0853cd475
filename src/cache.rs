use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::model::{CacheEntry, EnrichedUtxo, Network};

fn cache_key(address: &str, network: Network) -> String {
    format!("{network}:{address}")
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub size: u32,
    pub expired: u32,
}

/// TTL-scoped mapping `(address, network) -> enriched-UTXO list`.
///
/// A single mutex guards the map: the cache is not on the request hot path
/// once entries are warm, so one coarse lock is sufficient here.
pub struct UtxoCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl_ms: i64,
}

impl UtxoCache {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    /// Returns the cached list, or `None` on a miss. Expired entries are
    /// removed as a side effect of the read, not just of `cleanup`.
    pub async fn get(&self, address: &str, network: Network, now_ms: i64) -> Option<Vec<EnrichedUtxo>> {
        let key = cache_key(address, network);
        let mut entries = self.entries.lock().await;

        let expired = match entries.get(&key) {
            Some(entry) => now_ms > entry.expires_at_ms,
            None => return None,
        };

        if expired {
            entries.remove(&key);
            return None;
        }

        entries.get(&key).map(|entry| entry.utxos.clone())
    }

    pub async fn set(&self, address: &str, network: Network, utxos: Vec<EnrichedUtxo>, now_ms: i64) {
        let key = cache_key(address, network);
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            CacheEntry {
                utxos,
                expires_at_ms: now_ms + self.ttl_ms,
            },
        );
    }

    pub async fn invalidate(&self, address: &str, network: Network) {
        let key = cache_key(address, network);
        self.entries.lock().await.remove(&key);
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Scans all entries, deletes expired ones, returns the count removed.
    pub async fn cleanup(&self, now_ms: i64) -> u32 {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now_ms <= entry.expires_at_ms);
        (before - entries.len()) as u32
    }

    /// Definitionally `get != none`; triggers the same expiry side effect.
    pub async fn has(&self, address: &str, network: Network, now_ms: i64) -> bool {
        self.get(address, network, now_ms).await.is_some()
    }

    pub async fn size(&self) -> u32 {
        self.entries.lock().await.len() as u32
    }

    pub async fn stats(&self, now_ms: i64) -> CacheStats {
        let entries = self.entries.lock().await;
        let expired = entries
            .values()
            .filter(|entry| now_ms > entry.expires_at_ms)
            .count() as u32;
        CacheStats {
            size: entries.len() as u32,
            expired,
        }
    }
}
