use itertools::Itertools;

use crate::model::{EnrichedUtxo, SelectionResult};
use crate::strategies::greedy::greedy_select;

const NAME: &str = "age_based";
const FRESH_FALLBACK_WARNING: &str = "Had to use fresh UTXOs due to insufficient mature balance";

/// Splits candidates into mature/fresh, sorts both by descending age, and
/// tries the mature set alone before falling back to mature+fresh. Keeps the
/// storage-mass penalty off the hot path whenever possible.
pub fn select(
    candidates: &[EnrichedUtxo],
    target: u64,
    max_inputs: u32,
    max_mass: u32,
) -> Option<SelectionResult> {
    let (mature_unsorted, fresh_unsorted): (Vec<EnrichedUtxo>, Vec<EnrichedUtxo>) =
        candidates.iter().cloned().partition(|u| !u.is_fresh());

    let mature: Vec<EnrichedUtxo> = mature_unsorted
        .into_iter()
        .sorted_by_key(|u| std::cmp::Reverse(u.age_in_blocks()))
        .collect();
    let fresh: Vec<EnrichedUtxo> = fresh_unsorted
        .into_iter()
        .sorted_by_key(|u| std::cmp::Reverse(u.age_in_blocks()))
        .collect();

    if let Some(result) = greedy_select(&mature, target, max_inputs, max_mass, NAME) {
        return Some(result);
    }

    let mut widened = mature;
    widened.extend(fresh);
    let mut result = greedy_select(&widened, target, max_inputs, max_mass, NAME)?;
    result.warnings.push(FRESH_FALLBACK_WARNING.to_string());
    Some(result)
}
