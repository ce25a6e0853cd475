use rstest::rstest;
use utxo_core::errors::SelectionError;
use utxo_core::model::{EnrichedUtxo, Outpoint, ScriptPublicKey, UtxoEntryData, UtxoMetadata};
use utxo_core::selector::Selector;
use utxo_core::strategies::SelectionStrategy;

const MIN_AGE: u64 = 2;
const MAX_INPUTS: u32 = 5;
const MAX_MASS: u32 = 90_000;

fn utxo(amount: u64, age: u64) -> EnrichedUtxo {
    EnrichedUtxo {
        outpoint: Outpoint::new(format!("{amount:064}"), age as u32),
        utxo_entry: UtxoEntryData {
            amount,
            script_public_key: ScriptPublicKey { version: 0, script: String::new() },
            block_daa_score: 0,
            is_coinbase: false,
        },
        metadata: UtxoMetadata::derive(age, 0, MIN_AGE, 0),
    }
}

// Scenarios A-C/E exercise one named strategy directly, matching the
// per-row phrasing ("AgeBased returns...", "AmountBased returns..."). D and F
// are phrased at the Selector level ("Selector raises ..."), so those two
// drive `Selector::select_optimal` instead.

#[test]
fn scenario_a_age_based_returns_two_oldest_mature_utxos() {
    let candidates = vec![utxo(100_000_000, 1), utxo(100_000_000, 5), utxo(100_000_000, 10), utxo(100_000_000, 3)];
    let result = SelectionStrategy::AgeBased
        .select(&candidates, 150_000_000, MAX_INPUTS, MAX_MASS, MIN_AGE)
        .unwrap();
    let ages: Vec<u64> = result.utxos.iter().map(|u| u.age_in_blocks()).collect();
    assert_eq!(ages, vec![10, 5]);
    assert_eq!(result.total_amount, 200_000_000);
    assert!(!result.warnings.iter().any(|w| w.contains("fresh")));
}

#[test]
fn scenario_b_amount_based_returns_single_covering_utxo() {
    let candidates = vec![utxo(50_000_000, 5), utxo(200_000_000, 10), utxo(30_000_000, 3)];
    let result = SelectionStrategy::AmountBased
        .select(&candidates, 150_000_000, MAX_INPUTS, MAX_MASS, MIN_AGE)
        .unwrap();
    assert_eq!(result.utxos.len(), 1);
    assert_eq!(result.utxos[0].amount(), 200_000_000);
}

// Parametrized scenarios (A, B): same shape of assertion (strategy,
// candidates, target) -> (utxo count, total amount), only the sort order
// under the hood differs between strategies.
#[rstest]
#[case::scenario_a(SelectionStrategy::AgeBased, vec![(100_000_000, 1), (100_000_000, 5), (100_000_000, 10), (100_000_000, 3)], 150_000_000, 2, 200_000_000)]
#[case::scenario_b(SelectionStrategy::AmountBased, vec![(50_000_000, 5), (200_000_000, 10), (30_000_000, 3)], 150_000_000, 1, 200_000_000)]
fn scenario_table_strategy_outcomes(
    #[case] strategy: SelectionStrategy,
    #[case] candidates: Vec<(u64, u64)>,
    #[case] target: u64,
    #[case] expected_count: usize,
    #[case] expected_total: u64,
) {
    let candidates: Vec<EnrichedUtxo> = candidates.into_iter().map(|(amount, age)| utxo(amount, age)).collect();
    let result = strategy.select(&candidates, target, MAX_INPUTS, MAX_MASS, MIN_AGE).unwrap();
    assert_eq!(result.utxos.len(), expected_count);
    assert_eq!(result.total_amount, expected_total);
}

#[test]
fn scenario_c_age_based_falls_back_to_fresh_with_warning() {
    let candidates = vec![utxo(50_000_000, 1), utxo(100_000_000, 5)];
    let result = SelectionStrategy::AgeBased
        .select(&candidates, 120_000_000, MAX_INPUTS, MAX_MASS, MIN_AGE)
        .unwrap();
    assert!(result
        .warnings
        .iter()
        .any(|w| w == "Had to use fresh UTXOs due to insufficient mature balance"));
}

#[test]
fn scenario_d_no_strategy_satisfies_reports_totals() {
    let candidates = vec![utxo(50_000_000, 5), utxo(50_000_000, 10)];
    let selector = Selector::new(MIN_AGE);
    let err = selector.select_optimal(&candidates, 200_000_000, MAX_INPUTS, MAX_MASS).unwrap_err();
    match err {
        SelectionError::NoStrategySatisfies { target, available, .. } => {
            assert_eq!(target, 200_000_000);
            assert_eq!(available, 100_000_000);
        }
        other => panic!("expected NoStrategySatisfies, got {other:?}"),
    }
    for strategy in [SelectionStrategy::Hybrid, SelectionStrategy::AgeBased, SelectionStrategy::AmountBased] {
        assert!(strategy.select(&candidates, 200_000_000, MAX_INPUTS, MAX_MASS, MIN_AGE).is_none());
    }
}

#[test]
fn scenario_f_empty_list_raises_no_mature_utxos() {
    let selector = Selector::new(MIN_AGE);
    let err = selector.select_optimal(&[], 100_000_000, MAX_INPUTS, MAX_MASS).unwrap_err();
    assert!(matches!(err, SelectionError::NoMatureUtxos { total: 0, .. }));
}

#[test]
fn boundary_single_utxo_exactly_equal_to_target_needs_no_change_warning() {
    let candidates = vec![utxo(150_000_000, 20)];
    let selector = Selector::new(MIN_AGE);
    let selected = selector.select_optimal(&candidates, 150_000_000, MAX_INPUTS, MAX_MASS).unwrap();
    assert_eq!(selected.utxos.len(), 1);
    assert_eq!(selected.total_amount, 150_000_000);
}

#[test]
fn boundary_max_inputs_one_with_many_tiny_utxos_fails_cleanly() {
    let candidates: Vec<EnrichedUtxo> = (0..10).map(|i| utxo(10_000_000, 20 + i)).collect();
    let selector = Selector::new(MIN_AGE);
    let result = selector.select_optimal(&candidates, 50_000_000, 1, MAX_MASS);
    assert!(result.is_err());
}

#[test]
fn boundary_zero_min_age_means_no_utxo_is_ever_fresh() {
    let zero_age_utxo = EnrichedUtxo {
        outpoint: Outpoint::new("0".repeat(64), 0),
        utxo_entry: UtxoEntryData {
            amount: 1,
            script_public_key: ScriptPublicKey { version: 0, script: String::new() },
            block_daa_score: 100,
            is_coinbase: false,
        },
        metadata: UtxoMetadata::derive(100, 100, 0, 0),
    };
    assert!(!zero_age_utxo.is_fresh());
}

#[test]
fn boundary_zero_inputs_and_outputs_estimate_is_just_overhead() {
    let estimator = utxo_core::mass::MassEstimator::new(utxo_core::UTXOManagerConfig::default());
    assert_eq!(estimator.estimate(0, 0).estimated_mass, 100);
}
