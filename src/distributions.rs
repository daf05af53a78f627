/*!
Numeric primitives shared by the sampler and the post-processing passes:
log-space normalization of a cluster row, a categorical distribution over
cluster slots, Beta and Gamma draws, the binomial log-likelihood and the
Gaussian kernel.

All functions are pure; randomness comes from the RNG passed in.

# Examples

```rust
use subclonal_dpmm::distributions::{log_normalize, Categorical};
use rand::{rngs::SmallRng, SeedableRng};
use rand_distr::Distribution;

let probs = log_normalize(&[-1000.0, -1001.0, f64::NEG_INFINITY]).unwrap();
assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
assert_eq!(probs[2], 0.0);

let cat = Categorical::new(probs).unwrap();
let mut rng = SmallRng::seed_from_u64(42);
let slot = cat.sample(&mut rng);
assert!(slot < 2);
```
*/

use rand::Rng;
use rand_distr::{Beta, BetaError, Distribution, Gamma, GammaError};
use std::f64::consts::PI;

/// Turns a row of log-weights into probabilities.
///
/// The row maximum is subtracted before exponentiating so that very negative
/// log-likelihoods do not underflow to an all-zero row. Entries equal to
/// `-inf` get probability zero. Returns `None` when the row carries no usable
/// mass: it is empty, its maximum is `-inf`, or it contains NaN.
pub fn log_normalize(log_weights: &[f64]) -> Option<Vec<f64>> {
    let max = log_weights
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() || log_weights.iter().any(|w| w.is_nan()) {
        return None;
    }
    let exp: Vec<f64> = log_weights.iter().map(|&w| (w - max).exp()).collect();
    let total: f64 = exp.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(exp.into_iter().map(|p| p / total).collect())
}

/**
A categorical distribution over cluster slots `0..probs.len()`.

The probabilities are normalized on construction. Sampling walks the
cumulative sum with a single uniform draw, so one draw consumes exactly one
uniform from the RNG.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct Categorical {
    pub probs: Vec<f64>,
}

impl Categorical {
    /// Creates a new categorical distribution from non-negative weights.
    ///
    /// Returns `None` if a weight is negative or NaN, or if the weights do
    /// not have a finite positive sum.
    pub fn new(probs: Vec<f64>) -> Option<Self> {
        if probs.iter().any(|p| !(*p >= 0.0)) {
            return None;
        }
        let sum: f64 = probs.iter().sum();
        if !(sum.is_finite() && sum > 0.0) {
            return None;
        }
        let normalized = probs.into_iter().map(|p| p / sum).collect();
        Some(Self { probs: normalized })
    }

    /// Maps a uniform draw `u` in `[0, 1)` to a slot by inverting the CDF.
    ///
    /// Rounding can leave the cumulative sum slightly below one; such draws
    /// land on the last slot with positive probability.
    pub fn index_for(&self, u: f64) -> usize {
        let mut cum = 0.0;
        let mut last_positive = 0;
        for (i, &p) in self.probs.iter().enumerate() {
            if p > 0.0 {
                last_positive = i;
            }
            cum += p;
            if u < cum {
                return i;
            }
        }
        last_positive
    }

    pub fn log_prob(&self, index: usize) -> f64 {
        self.probs
            .get(index)
            .map_or(f64::NEG_INFINITY, |p| p.ln())
    }
}

impl Distribution<usize> for Categorical {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        self.index_for(rng.gen::<f64>())
    }
}

/// Draws from `Beta(a, b)`.
pub fn sample_beta<R: Rng + ?Sized>(a: f64, b: f64, rng: &mut R) -> Result<f64, BetaError> {
    Ok(Beta::new(a, b)?.sample(rng))
}

/// Draws from a Gamma distribution given by shape and *rate*.
pub fn sample_gamma<R: Rng + ?Sized>(
    shape: f64,
    rate: f64,
    rng: &mut R,
) -> Result<f64, GammaError> {
    Ok(Gamma::new(shape, 1.0 / rate)?.sample(rng))
}

/// Binomial log-likelihood of `reads` successes out of `depth`, without the
/// binomial coefficient (it is constant across clusters).
///
/// Takes `ln(theta)` and `ln(1 - theta)` precomputed, since they are shared
/// by every mutation in a sweep. `reads` must not exceed `depth`.
#[inline]
pub fn binomial_log_likelihood(reads: u32, depth: u32, ln_theta: f64, ln_1m_theta: f64) -> f64 {
    debug_assert!(reads <= depth, "{reads} mutant reads exceed depth {depth}");
    let y = f64::from(reads);
    let failures = f64::from(depth) - y;
    // 0 * -inf is NaN; a term with no counts contributes nothing.
    let success_term = if reads == 0 { 0.0 } else { y * ln_theta };
    let failure_term = if failures == 0.0 {
        0.0
    } else {
        failures * ln_1m_theta
    };
    success_term + failure_term
}

/// Standard normal density.
#[inline]
pub fn gaussian_kernel(u: f64) -> f64 {
    (-0.5 * u * u).exp() / (2.0 * PI).sqrt()
}
