use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::model::{LockReason, UtxoLock};

pub const PAYMENT_LOCK_TTL_MS: i64 = 60_000;

/// Per-UTXO advisory lock table, keyed by `"{tx_id}:{index}"`. Locks are
/// advisory: the chain remains the true source of truth, these only prevent
/// two concurrent payments from this process picking the same input.
pub struct LockTable {
    locks: Mutex<HashMap<String, UtxoLock>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn lock(&self, outpoint_key: &str, reason: LockReason, now_ms: i64, ttl_ms: i64) {
        let mut locks = self.locks.lock().await;
        locks.insert(
            outpoint_key.to_string(),
            UtxoLock {
                outpoint_key: outpoint_key.to_string(),
                locked_at_ms: now_ms,
                expires_at_ms: now_ms + ttl_ms,
                reason,
            },
        );
    }

    /// Idempotent: unlocking an already-unlocked outpoint is a no-op.
    pub async fn unlock(&self, outpoint_key: &str) {
        self.locks.lock().await.remove(outpoint_key);
    }

    pub async fn unlock_many(&self, outpoint_keys: &[String]) {
        let mut locks = self.locks.lock().await;
        for key in outpoint_keys {
            locks.remove(key);
        }
    }

    /// Auto-expires a stale lock on read.
    pub async fn is_locked(&self, outpoint_key: &str, now_ms: i64) -> bool {
        let mut locks = self.locks.lock().await;
        match locks.get(outpoint_key) {
            Some(lock) if now_ms > lock.expires_at_ms => {
                locks.remove(outpoint_key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Explicit sweep used at payment entry.
    pub async fn cleanup_expired_locks(&self, now_ms: i64) -> u32 {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| now_ms <= lock.expires_at_ms);
        (before - locks.len()) as u32
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new()
    }
}
