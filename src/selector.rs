use std::time::Instant;

use log::debug;

use crate::errors::SelectionError;
use crate::model::{EnrichedUtxo, SelectedUtxos};
use crate::strategies::STRATEGY_ORDER;

/// Outcome of the static pre-flight validator, used by UIs to produce
/// actionable error messages before a real selection is attempted.
#[derive(Debug, Clone)]
pub struct Validation {
    pub possible: bool,
    pub reason: Option<String>,
    pub suggestions: Vec<String>,
}

/// Filters candidates by maturity, runs strategies in the fixed fallback
/// order, and returns the first success with provenance.
pub struct Selector {
    min_utxo_age_blocks: u64,
}

impl Selector {
    pub fn new(min_utxo_age_blocks: u64) -> Self {
        Self { min_utxo_age_blocks }
    }

    pub fn select_optimal(
        &self,
        candidates: &[EnrichedUtxo],
        target: u64,
        max_inputs: u32,
        max_mass: u32,
    ) -> Result<SelectedUtxos, SelectionError> {
        let started_at = Instant::now();
        let mature: Vec<EnrichedUtxo> = candidates.iter().filter(|u| !u.is_fresh()).cloned().collect();

        if mature.is_empty() {
            let oldest_fresh_age = candidates.iter().map(|u| u.age_in_blocks()).max().unwrap_or(0);
            let estimated_wait_blocks = self.min_utxo_age_blocks.saturating_sub(oldest_fresh_age);
            return Err(SelectionError::NoMatureUtxos {
                total: candidates.len() as u32,
                mature: 0,
                estimated_wait_blocks,
            });
        }

        let mut strategies_attempted = Vec::with_capacity(STRATEGY_ORDER.len());
        for strategy in STRATEGY_ORDER {
            strategies_attempted.push(strategy.name());
            if let Some(result) = strategy.select(&mature, target, max_inputs, max_mass, self.min_utxo_age_blocks) {
                debug!(
                    "selector: {} succeeded with {} utxos, total {}",
                    strategy.name(),
                    result.utxos.len(),
                    result.total_amount
                );
                let elapsed_ms = started_at.elapsed().as_millis() as i64;
                return Ok(SelectedUtxos::from_result(result, elapsed_ms, strategies_attempted));
            }
        }

        Err(SelectionError::NoStrategySatisfies {
            target,
            available: mature.iter().map(|u| u.amount()).sum(),
            mature_count: mature.len() as u32,
            strategies_tried: strategies_attempted,
        })
    }

    /// Detects, in order: empty list; total < target; sum of the top
    /// `min(max_inputs, n)` UTXOs by amount < target.
    pub fn validate(candidates: &[EnrichedUtxo], target: u64, max_inputs: u32) -> Validation {
        if candidates.is_empty() {
            return Validation {
                possible: false,
                reason: Some("no utxos available".to_string()),
                suggestions: vec!["wait for incoming funds".to_string()],
            };
        }

        let total: u64 = candidates.iter().map(|u| u.amount()).sum();
        if total < target {
            return Validation {
                possible: false,
                reason: Some(format!("total balance {total} is below target {target}")),
                suggestions: vec!["reduce the payment amount".to_string()],
            };
        }

        let mut amounts: Vec<u64> = candidates.iter().map(|u| u.amount()).collect();
        amounts.sort_unstable_by(|a, b| b.cmp(a));
        let top_n = amounts.into_iter().take(max_inputs as usize).sum::<u64>();
        if top_n < target {
            return Validation {
                possible: false,
                reason: Some(format!(
                    "top {max_inputs} utxos sum to {top_n}, below target {target}"
                )),
                suggestions: vec!["raise max_inputs_per_tx or consolidate first".to_string()],
            };
        }

        Validation {
            possible: true,
            reason: None,
            suggestions: Vec::new(),
        }
    }
}
