use std::fmt;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Which Kaspa network a request targets. Routes to a distinct REST base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    pub fn base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.kaspa.org",
            Network::Testnet => "https://api-tn10.kaspa.org",
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

/// Globally unique identity of a UTXO: a transaction id plus output index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Outpoint {
    pub transaction_id: String,
    pub index: u32,
}

impl Outpoint {
    pub fn new(transaction_id: impl Into<String>, index: u32) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            index,
        }
    }

    /// The key used for the lock table and cache entry equality: `"{tx_id}:{index}"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.transaction_id, self.index)
    }
}

impl Display for Outpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPublicKey {
    pub version: u16,
    pub script: String,
}

/// A UTXO exactly as reported by the chain REST API, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUtxo {
    pub outpoint: Outpoint,
    pub utxo_entry: UtxoEntryData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoEntryData {
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

/// Metadata derived by the fetcher at enrichment time. Never stored independently
/// of the derivation in [`UtxoMetadata::derive`]: `is_fresh` in particular must
/// always be recomputed from `age_in_blocks` and the configured age threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtxoMetadata {
    pub fetched_at_ms: i64,
    pub age_in_blocks: u64,
    pub is_fresh: bool,
    pub estimated_mass_contribution: u32,
}

/// Fixed per-input mass contribution: outpoint (36) + schnorr sig script (65) + sequence (8) + overhead (~91).
pub const UTXO_MASS_CONTRIBUTION: u32 = 200;

impl UtxoMetadata {
    pub fn derive(virtual_daa_score: u64, block_daa_score: u64, min_utxo_age_blocks: u64, now_ms: i64) -> Self {
        let age_in_blocks = virtual_daa_score.saturating_sub(block_daa_score);
        Self {
            fetched_at_ms: now_ms,
            age_in_blocks,
            is_fresh: age_in_blocks < min_utxo_age_blocks,
            estimated_mass_contribution: UTXO_MASS_CONTRIBUTION,
        }
    }
}

/// A `RawUtxo` augmented with maturity/mass metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedUtxo {
    pub outpoint: Outpoint,
    pub utxo_entry: UtxoEntryData,
    pub metadata: UtxoMetadata,
}

impl EnrichedUtxo {
    pub fn amount(&self) -> u64 {
        self.utxo_entry.amount
    }

    pub fn is_fresh(&self) -> bool {
        self.metadata.is_fresh
    }

    pub fn age_in_blocks(&self) -> u64 {
        self.metadata.age_in_blocks
    }
}

/// A cached set of enriched UTXOs for one `(address, network)` pair.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub utxos: Vec<EnrichedUtxo>,
    pub expires_at_ms: i64,
}

/// A per-UTXO advisory lock preventing two concurrent payments in this process
/// from selecting the same outpoint. The chain remains the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockReason {
    Payment,
    Consolidation,
}

#[derive(Debug, Clone)]
pub struct UtxoLock {
    pub outpoint_key: String,
    pub locked_at_ms: i64,
    pub expires_at_ms: i64,
    pub reason: LockReason,
}

/// Raw output of a selection strategy, before the selector wraps it with provenance.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub utxos: Vec<EnrichedUtxo>,
    pub total_amount: u64,
    pub estimated_mass: u32,
    pub strategy_name: &'static str,
    pub warnings: Vec<String>,
}

/// What the Selector hands back to the Manager: a `SelectionResult` plus
/// selection-process provenance.
#[derive(Debug, Clone)]
pub struct SelectedUtxos {
    pub utxos: Vec<EnrichedUtxo>,
    pub total_amount: u64,
    pub estimated_mass: u32,
    pub strategy_name: &'static str,
    pub warnings: Vec<String>,
    pub selection_time_ms: i64,
    pub strategies_attempted: Vec<&'static str>,
    /// Always 0 by construction: the Selector filters fresh UTXOs before running
    /// strategies. Kept as a telemetry hook for future instrumentation rather
    /// than dead code (see DESIGN.md open question 4).
    pub fresh_utxos_used: u32,
}

impl SelectedUtxos {
    pub fn from_result(
        result: SelectionResult,
        selection_time_ms: i64,
        strategies_attempted: Vec<&'static str>,
    ) -> Self {
        Self {
            utxos: result.utxos,
            total_amount: result.total_amount,
            estimated_mass: result.estimated_mass,
            strategy_name: result.strategy_name,
            warnings: result.warnings,
            selection_time_ms,
            strategies_attempted,
            fresh_utxos_used: 0,
        }
    }
}

/// Tunable knobs for the UTXO manager. All six map one-to-one onto environment
/// variables (see `config::UTXOManagerConfig::from_env`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UTXOManagerConfig {
    pub min_utxo_age_blocks: u64,
    pub max_inputs_per_tx: u32,
    pub consolidation_threshold: u32,
    pub mass_limit_buffer: f64,
    pub max_mass_bytes: u32,
    pub cache_expiry_ms: i64,
}

impl Default for UTXOManagerConfig {
    fn default() -> Self {
        Self {
            min_utxo_age_blocks: 10,
            max_inputs_per_tx: 5,
            consolidation_threshold: 10,
            mass_limit_buffer: 0.9,
            max_mass_bytes: 100_000,
            cache_expiry_ms: 10_000,
        }
    }
}

/// Breakdown and verdict of a hypothetical transaction's byte mass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassEstimate {
    pub estimated_mass: u32,
    pub max_allowed_mass: u32,
    pub breakdown: MassBreakdown,
    pub is_within_limit: bool,
    pub utilization_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MassBreakdown {
    pub inputs: u32,
    pub outputs: u32,
    pub overhead: u32,
}

/// A snapshot of a wallet's general UTXO-health, used by UIs and the Consolidator.
#[derive(Debug, Clone)]
pub struct WalletHealth {
    pub address: String,
    pub total_balance: u64,
    pub utxo_count: u32,
    pub fragmentation_score: u32,
    pub oldest_age_blocks: u64,
    pub newest_age_blocks: u64,
    pub average_age_blocks: u64,
    pub needs_consolidation: bool,
    pub estimated_max_payment: u64,
}
