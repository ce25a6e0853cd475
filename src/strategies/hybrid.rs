use crate::model::{EnrichedUtxo, SelectionResult};
use crate::strategies::greedy::greedy_select;

const NAME: &str = "hybrid";

const AGE_WEIGHT: f64 = 0.40;
const AMOUNT_WEIGHT: f64 = 0.30;
const MASS_WEIGHT: f64 = 0.30;

/// Fixed age-score ceiling: distinct from `min_utxo_age_blocks` (see
/// DESIGN.md open question 3). This is a scoring curve shape, not a
/// maturity gate.
const AGE_SCORE_CEILING_BLOCKS: u64 = 10;
const MASS_SCORE_CAP_BYTES: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub age_score: f64,
    pub amount_score: f64,
    pub mass_score: f64,
    pub weighted_score: f64,
}

fn age_score(utxo: &EnrichedUtxo, min_age: u64) -> f64 {
    if utxo.is_fresh() {
        return 0.0;
    }
    let age = utxo.age_in_blocks();
    if age >= AGE_SCORE_CEILING_BLOCKS {
        return 100.0;
    }
    // Linear interpolation from (min_age -> 0) to (AGE_SCORE_CEILING_BLOCKS -> 100).
    if AGE_SCORE_CEILING_BLOCKS <= min_age {
        return 100.0;
    }
    let span = (AGE_SCORE_CEILING_BLOCKS - min_age) as f64;
    let progress = age.saturating_sub(min_age) as f64;
    (progress / span * 100.0).clamp(0.0, 100.0)
}

fn amount_score(utxo: &EnrichedUtxo, target: u64) -> f64 {
    if target == 0 || utxo.amount() >= target {
        return 100.0;
    }
    ((utxo.amount() * 100 / target) as f64).min(99.0)
}

fn mass_score(utxo: &EnrichedUtxo) -> f64 {
    let contribution = (utxo.metadata.estimated_mass_contribution as f64).clamp(0.0, MASS_SCORE_CAP_BYTES);
    (1.0 - contribution / MASS_SCORE_CAP_BYTES) * 100.0
}

fn score(utxo: &EnrichedUtxo, target: u64, min_age: u64) -> ScoreBreakdown {
    let age_score = age_score(utxo, min_age);
    let amount_score = amount_score(utxo, target);
    let mass_score = mass_score(utxo);
    ScoreBreakdown {
        age_score,
        amount_score,
        mass_score,
        weighted_score: AGE_WEIGHT * age_score + AMOUNT_WEIGHT * amount_score + MASS_WEIGHT * mass_score,
    }
}

/// Scores each candidate on the three weighted axes, sorts descending by
/// weighted score (stable, so ties keep original order), and runs greedy.
pub fn select(
    candidates: &[EnrichedUtxo],
    target: u64,
    max_inputs: u32,
    max_mass: u32,
    min_age: u64,
) -> Option<SelectionResult> {
    let mut scored: Vec<(EnrichedUtxo, f64)> = candidates
        .iter()
        .cloned()
        .map(|u| {
            let weighted = score(&u, target, min_age).weighted_score;
            (u, weighted)
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let sorted: Vec<EnrichedUtxo> = scored.into_iter().map(|(u, _)| u).collect();

    greedy_select(&sorted, target, max_inputs, max_mass, NAME)
}

/// Diagnostic inspector consumed by tooling: every candidate with its score
/// breakdown, in the order they would be tried.
pub fn detailed_scores(candidates: &[EnrichedUtxo], target: u64, min_age: u64) -> Vec<(EnrichedUtxo, ScoreBreakdown)> {
    let mut scored: Vec<(EnrichedUtxo, ScoreBreakdown)> = candidates
        .iter()
        .cloned()
        .map(|u| {
            let breakdown = score(&u, target, min_age);
            (u, breakdown)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.weighted_score
            .partial_cmp(&a.1.weighted_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Outpoint, ScriptPublicKey, UtxoEntryData, UtxoMetadata};

    fn utxo(amount: u64, age: u64, min_age: u64) -> EnrichedUtxo {
        EnrichedUtxo {
            outpoint: Outpoint::new("e".repeat(64), 0),
            utxo_entry: UtxoEntryData {
                amount,
                script_public_key: ScriptPublicKey { version: 0, script: String::new() },
                block_daa_score: 0,
                is_coinbase: false,
            },
            metadata: UtxoMetadata::derive(age, 0, min_age, 0),
        }
    }

    #[test]
    fn fresh_utxo_always_scores_zero_on_age_axis() {
        let u = utxo(100, 1, 10);
        assert!(u.is_fresh());
        assert_eq!(score(&u, 1_000, 10).age_score, 0.0);
    }

    #[test]
    fn amount_at_or_above_target_scores_full_on_amount_axis() {
        let u = utxo(1_000, 20, 10);
        assert_eq!(score(&u, 1_000, 10).amount_score, 100.0);
        let u2 = utxo(2_000, 20, 10);
        assert_eq!(score(&u2, 1_000, 10).amount_score, 100.0);
    }

    #[test]
    fn sub_target_amount_is_capped_below_full_score() {
        let u = utxo(999, 20, 10);
        assert!(score(&u, 1_000, 10).amount_score <= 99.0);
    }

    #[test]
    fn detailed_scores_returns_every_candidate() {
        let candidates = vec![utxo(100, 20, 10), utxo(200, 1, 10)];
        let scores = detailed_scores(&candidates, 150, 10);
        assert_eq!(scores.len(), 2);
    }
}
