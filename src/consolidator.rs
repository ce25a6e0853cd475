use async_trait::async_trait;
use log::{info, warn};

use crate::errors::SubmitError;
use crate::fetcher::UtxoFetcher;
use crate::mass::MassEstimator;
use crate::model::{EnrichedUtxo, Network, UTXOManagerConfig};

/// Consolidation-specific maturity bar: stricter than `min_utxo_age_blocks`
/// by design, since consolidation is discretionary housekeeping rather than
/// payment-critical (see DESIGN.md open question 1).
const CONSOLIDATION_MIN_AGE_BLOCKS: u64 = 10;
const SMALL_UTXO_THRESHOLD_SOMPI: u64 = 100_000_000; // 1 KAS
const BASE_FEE_SOMPI: u64 = 10_000;

/// Transaction-builder callback injected by the caller. The core never signs
/// or serializes transactions itself; it only holds this trait boundary.
#[async_trait]
pub trait TransactionBuilder: Send + Sync {
    async fn build_and_submit(
        &self,
        recipient_addr: &str,
        amount_sompi: u64,
        selected: &[EnrichedUtxo],
    ) -> Result<String, SubmitError>;
}

#[derive(Debug, Clone)]
pub struct ConsolidationResult {
    pub success: bool,
    pub utxos_consolidated: u32,
    pub transaction_id: Option<String>,
    pub amount_sompi: u64,
}

impl ConsolidationResult {
    fn empty() -> Self {
        Self {
            success: false,
            utxos_consolidated: 0,
            transaction_id: None,
            amount_sompi: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConsolidationRecommendation {
    pub should_consolidate: bool,
    pub fragmentation_score: u32,
    pub candidate_count: u32,
    pub estimated_savings: u64,
    pub recommendation: String,
}

/// Detects fragmentation and picks small mature UTXOs to merge into a single
/// output via an injected builder callback.
pub struct Consolidator<'a> {
    fetcher: &'a UtxoFetcher,
    mass_estimator: MassEstimator,
    config: UTXOManagerConfig,
}

impl<'a> Consolidator<'a> {
    pub fn new(fetcher: &'a UtxoFetcher, config: UTXOManagerConfig) -> Self {
        Self {
            fetcher,
            mass_estimator: MassEstimator::new(config),
            config,
        }
    }

    fn candidates(utxos: &[EnrichedUtxo]) -> Vec<EnrichedUtxo> {
        let mut candidates: Vec<EnrichedUtxo> = utxos
            .iter()
            .filter(|u| u.age_in_blocks() >= CONSOLIDATION_MIN_AGE_BLOCKS && u.amount() < SMALL_UTXO_THRESHOLD_SOMPI)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.age_in_blocks().cmp(&a.age_in_blocks()));
        candidates
    }

    /// Mature + small candidates sorted by descending age, capped at
    /// `max_inputs_per_tx` and then shrunk until the mass estimator is
    /// satisfied for `(n, 1)`.
    fn select_candidates(&self, utxos: &[EnrichedUtxo]) -> Vec<EnrichedUtxo> {
        let mut candidates = Self::candidates(utxos);
        candidates.truncate(self.config.max_inputs_per_tx as usize);

        while !candidates.is_empty() && !self.mass_estimator.within_limit(candidates.len() as u32, 1) {
            candidates.pop();
        }
        candidates
    }

    pub async fn should_consolidate(&self, address: &str, network: Network, now_ms: i64) -> bool {
        let utxos = match self.fetcher.fetch(address, network, false, now_ms).await {
            Ok(utxos) => utxos,
            Err(_) => return false,
        };
        Self::candidates(&utxos).len() as u32 >= self.config.consolidation_threshold
    }

    pub fn fragmentation_score(&self, utxos: &[EnrichedUtxo]) -> u32 {
        let n = utxos.len();
        if n == 0 {
            return 0;
        }

        let utxo_count_score = (n as f64 / 20.0).min(1.0) * 40.0;

        let small = utxos.iter().filter(|u| u.amount() < SMALL_UTXO_THRESHOLD_SOMPI).count();
        let small_utxo_score = (small as f64 / n as f64) * 30.0;

        // Amounts scaled down to stay within safe precision for the square-root step.
        let scaled: Vec<f64> = utxos.iter().map(|u| u.amount() as f64 / 1_000_000.0).collect();
        let mean = scaled.iter().sum::<f64>() / n as f64;
        let variance_score = if mean > 0.0 {
            let variance = scaled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            let stddev = variance.sqrt();
            (stddev / mean).min(1.0) * 30.0
        } else {
            0.0
        };

        (utxo_count_score + small_utxo_score + variance_score).round() as u32
    }

    pub async fn recommendations(&self, address: &str, network: Network, now_ms: i64) -> ConsolidationRecommendation {
        let utxos = self.fetcher.fetch(address, network, false, now_ms).await.unwrap_or_default();
        let candidates = Self::candidates(&utxos);
        let score = self.fragmentation_score(&utxos);
        let should_consolidate = candidates.len() as u32 >= self.config.consolidation_threshold;

        let estimated_savings = if should_consolidate {
            candidates.len().saturating_sub(1) as u64 * 200
        } else {
            0
        };

        let recommendation = if should_consolidate {
            format!(
                "{} small mature utxos found; consolidating would reduce future mass usage by roughly {estimated_savings} bytes per payment",
                candidates.len()
            )
        } else {
            "wallet is not significantly fragmented".to_string()
        };

        ConsolidationRecommendation {
            should_consolidate,
            fragmentation_score: score,
            candidate_count: candidates.len() as u32,
            estimated_savings,
            recommendation,
        }
    }

    /// Sums candidate amounts, subtracts the flat base fee, and invokes the
    /// injected builder. Best-effort: swallows build failures and returns a
    /// zero-count result rather than propagating.
    pub async fn consolidate(
        &self,
        address: &str,
        network: Network,
        builder: &dyn TransactionBuilder,
        now_ms: i64,
    ) -> ConsolidationResult {
        let utxos = match self.fetcher.fetch(address, network, false, now_ms).await {
            Ok(utxos) => utxos,
            Err(err) => {
                warn!("consolidation fetch failed for {address}: {err}");
                return ConsolidationResult::empty();
            }
        };

        let candidates = self.select_candidates(&utxos);
        if candidates.is_empty() {
            return ConsolidationResult::empty();
        }

        let total: u64 = candidates.iter().map(|u| u.amount()).sum();
        let amount_sompi = match total.checked_sub(BASE_FEE_SOMPI) {
            Some(amount) if amount > 0 => amount,
            _ => return ConsolidationResult::empty(),
        };

        match builder.build_and_submit(address, amount_sompi, &candidates).await {
            Ok(transaction_id) => {
                info!("consolidated {} utxos into {transaction_id}", candidates.len());
                self.fetcher.invalidate(address, network).await;
                ConsolidationResult {
                    success: true,
                    utxos_consolidated: candidates.len() as u32,
                    transaction_id: Some(transaction_id),
                    amount_sompi,
                }
            }
            Err(err) => {
                warn!("consolidation build failed for {address}: {err}");
                ConsolidationResult::empty()
            }
        }
    }
}
