use crate::model::{EnrichedUtxo, SelectionResult};

const GREEDY_OVERHEAD_MASS: u32 = 100;
const ANTICIPATED_OUTPUT_MARGIN: u32 = 50;

/// Shared greedy accumulator used by every strategy; they differ only in the
/// order `sorted_utxos` arrives in.
///
/// The `+50` added per iteration anticipates the downstream output increment
/// when the transaction builder adds a change output; kept as a safety
/// margin (see DESIGN.md open question 2), not removed as a double-count.
pub fn greedy_select(
    sorted_utxos: &[EnrichedUtxo],
    target: u64,
    max_inputs: u32,
    max_mass: u32,
    strategy_name: &'static str,
) -> Option<SelectionResult> {
    let mut mass = GREEDY_OVERHEAD_MASS;
    let mut total: u64 = 0;
    let mut selected: Vec<EnrichedUtxo> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    for utxo in sorted_utxos {
        if selected.len() as u32 >= max_inputs {
            warnings.push("max inputs reached".to_string());
            break;
        }

        let new_mass = mass + utxo.metadata.estimated_mass_contribution + ANTICIPATED_OUTPUT_MARGIN;
        if new_mass > max_mass {
            warnings.push("mass limit reached".to_string());
            break;
        }

        selected.push(utxo.clone());
        total += utxo.amount();
        mass = new_mass;

        if total >= target {
            let fresh_count = selected.iter().filter(|u| u.is_fresh()).count();
            if fresh_count > 0 {
                warnings.push(format!("using {fresh_count} fresh utxos"));
            }
            return Some(SelectionResult {
                utxos: selected,
                total_amount: total,
                estimated_mass: mass,
                strategy_name,
                warnings,
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Outpoint, ScriptPublicKey, UtxoEntryData, UtxoMetadata};

    fn utxo(amount: u64, age: u64) -> EnrichedUtxo {
        EnrichedUtxo {
            outpoint: Outpoint::new("b".repeat(64), 0),
            utxo_entry: UtxoEntryData {
                amount,
                script_public_key: ScriptPublicKey { version: 0, script: String::new() },
                block_daa_score: 0,
                is_coinbase: false,
            },
            metadata: UtxoMetadata::derive(age, 0, 10, 0),
        }
    }

    #[test]
    fn stops_and_returns_none_when_target_unreachable() {
        let utxos = vec![utxo(50_000_000, 20)];
        assert!(greedy_select(&utxos, 200_000_000, 5, 90_000, "test").is_none());
    }

    #[test]
    fn succeeds_once_total_reaches_target() {
        let utxos = vec![utxo(100_000_000, 20), utxo(100_000_000, 20)];
        let result = greedy_select(&utxos, 150_000_000, 5, 90_000, "test").unwrap();
        assert_eq!(result.utxos.len(), 2);
        assert_eq!(result.total_amount, 200_000_000);
    }

    #[test]
    fn respects_max_inputs_ceiling() {
        let utxos = vec![utxo(10, 20); 3];
        assert!(greedy_select(&utxos, 1_000, 2, 90_000, "test").is_none());
    }
}
