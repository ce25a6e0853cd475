use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use tokio::time::{sleep, Duration};

use crate::cache::UtxoCache;
use crate::chain_client::ChainClient;
use crate::config;
use crate::consolidator::{ConsolidationRecommendation, ConsolidationResult, Consolidator, TransactionBuilder};
use crate::errors::{ConfigError, ManagerError};
use crate::fetcher::UtxoFetcher;
use crate::locks::{LockTable, PAYMENT_LOCK_TTL_MS};
use crate::mass::MassEstimator;
use crate::model::{LockReason, Network, SelectedUtxos, UTXOManagerConfig, WalletHealth};
use crate::selector::Selector;

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Top-level entry point: config validation at construction, the lock table,
/// `select_for_payment`, `wallet_health`, `consolidate_if_needed`,
/// `wait_for_maturity`, and cache/lock passthroughs.
pub struct UtxoManager {
    config: UTXOManagerConfig,
    cache: Arc<UtxoCache>,
    fetcher: UtxoFetcher,
    mass_estimator: MassEstimator,
    locks: LockTable,
}

impl UtxoManager {
    pub fn new(chain: Arc<dyn ChainClient>, config: UTXOManagerConfig) -> Result<Self, ConfigError> {
        config::validate(&config)?;

        let cache = Arc::new(UtxoCache::new(config.cache_expiry_ms));
        let fetcher = UtxoFetcher::new(chain, cache.clone(), config.min_utxo_age_blocks);
        let mass_estimator = MassEstimator::new(config);

        Ok(Self {
            config,
            cache,
            fetcher,
            mass_estimator,
            locks: LockTable::new(),
        })
    }

    /// Returns `UTXOManagerConfig::default()`, not the instance's live merged
    /// config (see DESIGN.md open question 5). Callers
    /// that need the live config should use [`UtxoManager::config`].
    pub fn default_config(&self) -> UTXOManagerConfig {
        UTXOManagerConfig::default()
    }

    pub fn config(&self) -> UTXOManagerConfig {
        self.config
    }

    /// The full payment flow: sweep expired locks, fetch,
    /// filter locked outpoints, derive limits, delegate to the Selector,
    /// lock the winners.
    pub async fn select_for_payment(
        &self,
        address: &str,
        amount: u64,
        network: Network,
    ) -> Result<SelectedUtxos, ManagerError> {
        let now = now_ms();
        self.locks.cleanup_expired_locks(now).await;

        let utxos = self.fetcher.fetch(address, network, false, now).await?;
        if utxos.is_empty() {
            return Err(ManagerError::NoUtxosAvailable(address.to_string()));
        }

        let mut available = Vec::with_capacity(utxos.len());
        for utxo in utxos {
            if !self.locks.is_locked(&utxo.outpoint.key(), now).await {
                available.push(utxo);
            }
        }
        if available.is_empty() {
            return Err(ManagerError::AllUtxosLocked(address.to_string()));
        }

        // Recipient + change output.
        let max_inputs = self.mass_estimator.max_inputs(2);
        let max_mass = (self.mass_estimator.estimate(max_inputs, 2).max_allowed_mass as f64 * 0.9) as u32;

        let selector = Selector::new(self.config.min_utxo_age_blocks);
        let selected = selector.select_optimal(&available, amount, max_inputs, max_mass)?;

        for utxo in &selected.utxos {
            self.locks
                .lock(&utxo.outpoint.key(), LockReason::Payment, now, PAYMENT_LOCK_TTL_MS)
                .await;
        }

        Ok(selected)
    }

    pub async fn wallet_health(&self, address: &str, network: Network) -> WalletHealth {
        let utxos = self
            .fetcher
            .fetch(address, network, false, now_ms())
            .await
            .unwrap_or_default();

        let total_balance: u64 = utxos.iter().map(|u| u.amount()).sum();
        let utxo_count = utxos.len() as u32;

        let (oldest, newest, average) = if utxos.is_empty() {
            (0, 0, 0)
        } else {
            let ages: Vec<u64> = utxos.iter().map(|u| u.age_in_blocks()).collect();
            let oldest = *ages.iter().max().unwrap();
            let newest = *ages.iter().min().unwrap();
            let average = ages.iter().sum::<u64>() / ages.len() as u64;
            (oldest, newest, average)
        };

        let consolidator = Consolidator::new(&self.fetcher, self.config);
        let fragmentation_score = consolidator.fragmentation_score(&utxos);
        let needs_consolidation = fragmentation_score >= 50;

        let mut amounts: Vec<u64> = utxos.iter().map(|u| u.amount()).collect();
        amounts.sort_unstable_by(|a, b| b.cmp(a));
        let estimated_max_payment = amounts
            .into_iter()
            .take(self.config.max_inputs_per_tx as usize)
            .sum();

        WalletHealth {
            address: address.to_string(),
            total_balance,
            utxo_count,
            fragmentation_score,
            oldest_age_blocks: oldest,
            newest_age_blocks: newest,
            average_age_blocks: average,
            needs_consolidation,
            estimated_max_payment,
        }
    }

    pub async fn consolidate_if_needed(
        &self,
        address: &str,
        network: Network,
        builder: &dyn TransactionBuilder,
    ) -> ConsolidationResult {
        let consolidator = Consolidator::new(&self.fetcher, self.config);
        let now = now_ms();
        if !consolidator.should_consolidate(address, network, now).await {
            return ConsolidationResult {
                success: false,
                utxos_consolidated: 0,
                transaction_id: None,
                amount_sompi: 0,
            };
        }
        consolidator.consolidate(address, network, builder, now).await
    }

    pub async fn consolidation_recommendations(&self, address: &str, network: Network) -> ConsolidationRecommendation {
        let consolidator = Consolidator::new(&self.fetcher, self.config);
        consolidator.recommendations(address, network, now_ms()).await
    }

    /// Polls with `force_refresh = true` every 2s, returning `true` as soon as
    /// any UTXO reaches `min_age`, `false` after `timeout_ms`.
    pub async fn wait_for_maturity(&self, address: &str, network: Network, min_age: u64, timeout_ms: i64) -> bool {
        let deadline = now_ms() + timeout_ms;
        loop {
            let now = now_ms();
            if let Ok(utxos) = self.fetcher.fetch(address, network, true, now).await {
                if utxos.iter().any(|u| u.age_in_blocks() >= min_age) {
                    return true;
                }
            }
            if now_ms() >= deadline {
                return false;
            }
            sleep(Duration::from_secs(2)).await;
        }
    }

    pub async fn invalidate_cache(&self, address: &str, network: Network) {
        self.fetcher.invalidate(address, network).await;
    }

    pub async fn clear_cache(&self) {
        self.fetcher.clear().await;
    }

    pub async fn lock(&self, outpoint_key: &str, reason: LockReason) {
        self.locks.lock(outpoint_key, reason, now_ms(), PAYMENT_LOCK_TTL_MS).await;
    }

    pub async fn unlock(&self, outpoint_key: &str) {
        self.locks.unlock(outpoint_key).await;
    }

    pub async fn unlock_many(&self, outpoint_keys: &[String]) {
        self.locks.unlock_many(outpoint_keys).await;
    }

    pub async fn is_locked(&self, outpoint_key: &str) -> bool {
        self.locks.is_locked(outpoint_key, now_ms()).await
    }

    pub async fn cleanup_expired_locks(&self) -> u32 {
        self.locks.cleanup_expired_locks(now_ms()).await
    }

    /// Releases locks on the caller's behalf after a submit outcome is known,
    /// classifies the underlying chain error, and performs the single
    /// automatic retry allowed for orphan/network errors by
    /// invalidating the cache and signalling the caller to re-enter the
    /// payment flow after a short delay. Lock release happens unconditionally
    /// before classification: release is mandatory on every failure
    /// path past the lock point.
    pub async fn handle_submit_outcome(
        &self,
        address: &str,
        network: Network,
        selected: &SelectedUtxos,
        outcome: Result<String, crate::errors::SubmitError>,
    ) -> SubmitOutcome {
        let keys: Vec<String> = selected.utxos.iter().map(|u| u.outpoint.key()).collect();
        self.unlock_many(&keys).await;

        match outcome {
            Ok(transaction_id) => {
                info!("payment to {address} submitted as {transaction_id}");
                self.invalidate_cache(address, network).await;
                SubmitOutcome::Success { transaction_id }
            }
            Err(err) => {
                use crate::errors::SubmitErrorKind;
                match err.kind {
                    SubmitErrorKind::Orphan | SubmitErrorKind::Network => {
                        warn!("submit failed for {address} ({:?}), invalidating cache and retrying once", err.kind);
                        self.invalidate_cache(address, network).await;
                        sleep(Duration::from_secs(if err.kind == SubmitErrorKind::Orphan { 2 } else { 3 })).await;
                        SubmitOutcome::RetryOnce
                    }
                    other => {
                        error!("submit failed for {address}: {err}");
                        SubmitOutcome::Failed(other)
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    Success { transaction_id: String },
    RetryOnce,
    Failed(crate::errors::SubmitErrorKind),
}
