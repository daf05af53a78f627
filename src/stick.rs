//! Stick-breaking transform of the truncated Dirichlet process.

use ndarray::{Array1, ArrayView1};

/// Converts stick-breaking fractions into mixture weights:
/// `w[0] = v[0]` and `w[i] = v[i] * prod_{j < i} (1 - v[j])`.
///
/// With the last fraction equal to one (as the sampler keeps it) the weights
/// sum to exactly one up to rounding.
pub fn weights(stick_fractions: ArrayView1<f64>) -> Array1<f64> {
    let mut remaining = 1.0;
    stick_fractions
        .iter()
        .map(|&v| {
            let w = v * remaining;
            remaining *= 1.0 - v;
            w
        })
        .collect()
}

/// Stick mass left over after breaking off every fraction.
pub fn residual_mass(stick_fractions: ArrayView1<f64>) -> f64 {
    stick_fractions.iter().map(|&v| 1.0 - v).product()
}

/// Log of the prior mass each slot receives, `ln v[j] + sum_{i < j} ln(1 - v[i])`.
///
/// Computed in log space so long sticks do not underflow.
pub(crate) fn log_prior_mass(stick_fractions: ArrayView1<f64>) -> Vec<f64> {
    let mut ln_remaining = 0.0;
    stick_fractions
        .iter()
        .map(|&v| {
            let ln_mass = v.ln() + ln_remaining;
            ln_remaining += (-v).ln_1p();
            ln_mass
        })
        .collect()
}
