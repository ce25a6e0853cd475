use crate::model::{EnrichedUtxo, SelectionResult};
use crate::strategies::greedy::greedy_select;

const NAME: &str = "amount_based";
const OVERHEAD_MASS: u32 = 100;
const ANTICIPATED_OUTPUT_MARGIN: u32 = 50;

/// Sorts by descending amount; first looks for a single UTXO that already
/// covers `target` (`find_optimal_single`), otherwise runs greedy on the
/// amount-sorted list. Favors fewer inputs, smaller transactions.
pub fn select(
    candidates: &[EnrichedUtxo],
    target: u64,
    max_inputs: u32,
    max_mass: u32,
) -> Option<SelectionResult> {
    let mut sorted: Vec<EnrichedUtxo> = candidates.to_vec();
    sorted.sort_by(|a, b| b.amount().cmp(&a.amount()));

    if let Some(single) = find_optimal_single(&sorted, target) {
        let mass = OVERHEAD_MASS + single.metadata.estimated_mass_contribution + ANTICIPATED_OUTPUT_MARGIN;
        return Some(SelectionResult {
            total_amount: single.amount(),
            estimated_mass: mass,
            strategy_name: NAME,
            warnings: Vec::new(),
            utxos: vec![single],
        });
    }

    greedy_select(&sorted, target, max_inputs, max_mass, NAME)
}

/// The smallest single UTXO whose amount already covers `target`, if any.
fn find_optimal_single(sorted_desc: &[EnrichedUtxo], target: u64) -> Option<EnrichedUtxo> {
    sorted_desc
        .iter()
        .filter(|u| u.amount() >= target)
        .min_by_key(|u| u.amount())
        .cloned()
}
