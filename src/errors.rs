use thiserror::Error;

use crate::model::MassEstimate;

/// Failure surfaced by the fetcher after retries are exhausted.
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    #[error("fetching utxos for {address} failed after {attempts} attempts: {cause}")]
    Exhausted {
        address: String,
        attempts: u32,
        cause: String,
    },
    #[error("malformed utxo in chain response: {0}")]
    MalformedUtxo(String),
}

/// Failure surfaced by the selector.
#[derive(Debug, Error, Clone)]
pub enum SelectionError {
    #[error(
        "no mature utxos available: {total} total, {mature} mature, need to wait an estimated {estimated_wait_blocks} blocks"
    )]
    NoMatureUtxos {
        total: u32,
        mature: u32,
        estimated_wait_blocks: u64,
    },
    #[error(
        "no strategy could satisfy target {target}: {available} available across {mature_count} mature utxos, tried {strategies_tried:?}"
    )]
    NoStrategySatisfies {
        target: u64,
        available: u64,
        mature_count: u32,
        strategies_tried: Vec<&'static str>,
    },
}

/// Fatal at construction: raised by `UtxoManager::new` when `UTXOManagerConfig`
/// fails validation.
#[derive(Debug, Error, Clone)]
pub enum ConfigError {
    #[error("min_utxo_age_blocks must be >= 0")]
    InvalidMinUtxoAgeBlocks,
    #[error("max_inputs_per_tx must be >= 1, got {0}")]
    InvalidMaxInputsPerTx(u32),
    #[error("consolidation_threshold must be >= 2, got {0}")]
    InvalidConsolidationThreshold(u32),
    #[error("mass_limit_buffer must be in (0, 1], got {0}")]
    InvalidMassLimitBuffer(f64),
    #[error("max_mass_bytes must be > 0")]
    InvalidMaxMassBytes,
    #[error("cache_expiry_ms must be >= 0")]
    InvalidCacheExpiryMs,
    #[error("{0}")]
    EnvVar(String),
}

/// Surfaced when the manager's payment flow fails before or after delegating
/// to the Selector.
#[derive(Debug, Error, Clone)]
pub enum ManagerError {
    #[error("no utxos available for {0}")]
    NoUtxosAvailable(String),
    #[error("all utxos are locked for {0}")]
    AllUtxosLocked(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Chain mass ceiling rejected the transaction after submission. The caller
/// must act, the manager will not retry this one automatically.
#[derive(Debug, Error, Clone)]
#[error("transaction storage mass exceeded: {estimate:?}")]
pub struct TransactionMassError {
    pub estimate: MassEstimate,
    pub suggested_actions: Vec<String>,
}

/// Raised by a pre-flight validator or wallet-health check when a wallet's
/// UTXO set is too fragmented to safely fund a payment without consolidating.
#[derive(Debug, Error, Clone)]
#[error("utxo set is fragmented (score {score}): {action}")]
pub struct UtxoFragmentationError {
    pub score: u32,
    pub action: FragmentationAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentationAction {
    Consolidate,
    Wait,
}

impl std::fmt::Display for FragmentationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FragmentationAction::Consolidate => write!(f, "consolidate"),
            FragmentationAction::Wait => write!(f, "wait"),
        }
    }
}

/// Classification of a chain error reported back to the manager by the submission layer
/// after a broadcast attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitErrorKind {
    Mass,
    Orphan,
    InsufficientFunds,
    Network,
    Unknown,
}

impl SubmitErrorKind {
    /// Classifies a raw chain error message into one of the known kinds by
    /// substring match on the chain's response body.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("already accepted by the consensus") {
            // Treated as success by the caller, not surfaced as an error kind;
            // callers should check this before calling `classify`.
            SubmitErrorKind::Unknown
        } else if lower.contains("storage mass") || lower.contains("larger than max allowed size") {
            SubmitErrorKind::Mass
        } else if lower.contains("missing outpoint") || lower.contains("orphan") {
            SubmitErrorKind::Orphan
        } else if lower.contains("insufficient") {
            SubmitErrorKind::InsufficientFunds
        } else if lower.contains("econnrefused")
            || lower.contains("econnaborted")
            || lower.contains("websocket")
            || lower.contains("network")
        {
            SubmitErrorKind::Network
        } else {
            SubmitErrorKind::Unknown
        }
    }
}

#[derive(Debug, Error, Clone)]
#[error("transaction submit failed: {message}")]
pub struct SubmitError {
    pub kind: SubmitErrorKind,
    pub message: String,
}

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = SubmitErrorKind::classify(&message);
        Self { kind, message }
    }
}
