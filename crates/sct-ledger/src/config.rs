use serde::{Deserialize, Serialize};

/// Numeric tolerances for mass-balance accounting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Allowed imbalance as a fraction of input quantity (0.005 = 0.5%).
    pub tolerance: f64,
    /// Absolute slack for float comparisons of quantities.
    pub quantity_epsilon: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tolerance: 0.005,
            quantity_epsilon: 1e-9,
        }
    }
}

impl LedgerConfig {
    /// Largest imbalance accepted for a given input quantity.
    pub fn allowed_variance(&self, input: f64) -> f64 {
        self.tolerance * input.abs() + self.quantity_epsilon
    }

    /// Whether `input ≈ output + waste` holds for these quantities.
    pub fn balances(&self, input: f64, output: f64, waste: f64) -> bool {
        (input - (output + waste)).abs() <= self.allowed_variance(input)
    }

    /// Whether a quantity is indistinguishable from zero.
    pub fn is_exhausted(&self, quantity: f64) -> bool {
        quantity <= self.quantity_epsilon
    }
}
