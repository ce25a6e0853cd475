use crate::model::{MassBreakdown, MassEstimate, UTXOManagerConfig};

const PER_INPUT_MASS: u32 = 200;
const PER_OUTPUT_MASS: u32 = 50;
const OVERHEAD_MASS: u32 = 100;

/// Pure byte-mass math. Stateless and fast, strategies may call it many
/// times per selection.
pub struct MassEstimator {
    config: UTXOManagerConfig,
}

impl MassEstimator {
    pub fn new(config: UTXOManagerConfig) -> Self {
        Self { config }
    }

    fn max_allowed_mass(&self) -> u32 {
        (self.config.max_mass_bytes as f64 * self.config.mass_limit_buffer) as u32
    }

    /// `mass = inputs * 200 + outputs * 50 + 100`.
    pub fn estimate(&self, inputs: u32, outputs: u32) -> MassEstimate {
        let estimated_mass = inputs * PER_INPUT_MASS + outputs * PER_OUTPUT_MASS + OVERHEAD_MASS;
        let max_allowed_mass = self.max_allowed_mass();
        MassEstimate {
            estimated_mass,
            max_allowed_mass,
            breakdown: MassBreakdown {
                inputs: inputs * PER_INPUT_MASS,
                outputs: outputs * PER_OUTPUT_MASS,
                overhead: OVERHEAD_MASS,
            },
            is_within_limit: estimated_mass <= max_allowed_mass,
            utilization_percent: estimated_mass * 100 / self.config.max_mass_bytes,
        }
    }

    /// `floor((max_mass * buffer - outputs * 50 - 100) / 200)`, clamped to
    /// `config.max_inputs_per_tx`. Never negative.
    pub fn max_inputs(&self, outputs: u32) -> u32 {
        let budget = self.max_allowed_mass() as i64 - (outputs * PER_OUTPUT_MASS) as i64 - OVERHEAD_MASS as i64;
        let raw = if budget <= 0 { 0 } else { (budget / PER_INPUT_MASS as i64) as u32 };
        raw.min(self.config.max_inputs_per_tx)
    }

    pub fn within_limit(&self, inputs: u32, outputs: u32) -> bool {
        self.estimate(inputs, outputs).is_within_limit
    }
}
