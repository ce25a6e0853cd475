use std::env;

use crate::errors::ConfigError;
use crate::model::UTXOManagerConfig;

/// Parses the six supported environment variables onto `UTXOManagerConfig`,
/// falling back to defaults for unset ones, then validates the result.
pub fn from_env() -> Result<UTXOManagerConfig, ConfigError> {
    let defaults = UTXOManagerConfig::default();

    let config = UTXOManagerConfig {
        min_utxo_age_blocks: parse_env_or("MIN_UTXO_AGE_BLOCKS", defaults.min_utxo_age_blocks)?,
        max_inputs_per_tx: parse_env_or("MAX_INPUTS_PER_TX", defaults.max_inputs_per_tx)?,
        consolidation_threshold: parse_env_or(
            "CONSOLIDATION_THRESHOLD",
            defaults.consolidation_threshold,
        )?,
        mass_limit_buffer: parse_env_or("MASS_LIMIT_BUFFER", defaults.mass_limit_buffer)?,
        max_mass_bytes: parse_env_or("MAX_MASS_BYTES", defaults.max_mass_bytes)?,
        cache_expiry_ms: parse_env_or("CACHE_EXPIRY_MS", defaults.cache_expiry_ms)?,
    };

    validate(&config)?;
    Ok(config)
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::EnvVar(format!("{key} is not a valid value: {raw:?}"))),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ConfigError::EnvVar(format!("{key} is not valid unicode")))
        }
    }
}

/// Fatal-at-construction validation: rejected configs never produce a `UtxoManager`.
pub fn validate(config: &UTXOManagerConfig) -> Result<(), ConfigError> {
    if config.max_inputs_per_tx < 1 {
        return Err(ConfigError::InvalidMaxInputsPerTx(config.max_inputs_per_tx));
    }
    if config.consolidation_threshold < 2 {
        return Err(ConfigError::InvalidConsolidationThreshold(
            config.consolidation_threshold,
        ));
    }
    if !(config.mass_limit_buffer > 0.0 && config.mass_limit_buffer <= 1.0) {
        return Err(ConfigError::InvalidMassLimitBuffer(config.mass_limit_buffer));
    }
    if config.max_mass_bytes == 0 {
        return Err(ConfigError::InvalidMaxMassBytes);
    }
    if config.cache_expiry_ms < 0 {
        return Err(ConfigError::InvalidCacheExpiryMs);
    }
    // min_utxo_age_blocks is unsigned already, so its ">= 0" rule holds by
    // construction; nothing to check.
    Ok(())
}
