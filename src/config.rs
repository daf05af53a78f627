/*!
Configuration bundle for a sampler run and its post-processing.

All options have defaults; the consuming `set_*` methods allow chaining.

```rust
use subclonal_dpmm::config::Config;

let config = Config::default()
    .set_iterations(2_000)
    .set_burn_in(1_000)
    .set_seed(42);
assert_eq!(config.burn_in(), 1_000);
assert!(config.validate().is_ok());
```
*/

use crate::error::{Error, Result};

pub const DEFAULT_ITERATIONS: usize = 20_000;
pub const DEFAULT_MAX_CLUSTERS: usize = 30;
pub const DEFAULT_BANDWIDTH: f64 = 0.01;
pub const DEFAULT_MAX_VAF: f64 = 1.0;
pub const DEFAULT_CUTOFF_WEIGHT: f64 = 0.05;
pub const DEFAULT_HYPER_A: f64 = 0.01;
pub const DEFAULT_HYPER_B: f64 = 0.01;
pub const DEFAULT_GRID_POINTS: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Total number of Gibbs iterations, including the initial state.
    pub iterations: usize,
    /// Truncation width `C` of the stick-breaking approximation.
    pub max_clusters: usize,
    /// Iterations discarded before post-processing. `None` means a quarter of `iterations`.
    pub burn_in: Option<usize>,
    /// Gaussian kernel bandwidth of the posterior density estimate.
    pub bandwidth: f64,
    /// Upper end of the density grid.
    pub max_vaf: f64,
    /// Minimum mean weight for a cluster to be reported as supported.
    pub cutoff_weight: f64,
    /// Shape of the Gamma prior on the concentration parameter.
    pub hyper_a: f64,
    /// Rate of the Gamma prior on the concentration parameter.
    pub hyper_b: f64,
    /// Resolution of the density grid.
    pub grid_points: usize,
    /// Show a progress bar while sampling.
    pub verbose: bool,
    /// Seed of the chain RNG. `None` draws one from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            max_clusters: DEFAULT_MAX_CLUSTERS,
            burn_in: None,
            bandwidth: DEFAULT_BANDWIDTH,
            max_vaf: DEFAULT_MAX_VAF,
            cutoff_weight: DEFAULT_CUTOFF_WEIGHT,
            hyper_a: DEFAULT_HYPER_A,
            hyper_b: DEFAULT_HYPER_B,
            grid_points: DEFAULT_GRID_POINTS,
            verbose: false,
            seed: None,
        }
    }
}

impl Config {
    pub fn set_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn set_max_clusters(mut self, max_clusters: usize) -> Self {
        self.max_clusters = max_clusters;
        self
    }

    pub fn set_burn_in(mut self, burn_in: usize) -> Self {
        self.burn_in = Some(burn_in);
        self
    }

    pub fn set_bandwidth(mut self, bandwidth: f64) -> Self {
        self.bandwidth = bandwidth;
        self
    }

    pub fn set_max_vaf(mut self, max_vaf: f64) -> Self {
        self.max_vaf = max_vaf;
        self
    }

    pub fn set_cutoff_weight(mut self, cutoff_weight: f64) -> Self {
        self.cutoff_weight = cutoff_weight;
        self
    }

    pub fn set_hyperparameters(mut self, hyper_a: f64, hyper_b: f64) -> Self {
        self.hyper_a = hyper_a;
        self.hyper_b = hyper_b;
        self
    }

    pub fn set_grid_points(mut self, grid_points: usize) -> Self {
        self.grid_points = grid_points;
        self
    }

    pub fn set_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Effective burn-in: the configured value or a quarter of the iterations.
    pub fn burn_in(&self) -> usize {
        self.burn_in.unwrap_or(self.iterations / 4)
    }

    /// Checks every option and returns the first violated rule.
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::config("iterations", "must be at least 1"));
        }
        if self.max_clusters < 2 {
            return Err(Error::config(
                "max_clusters",
                format!("must be at least 2 (got {})", self.max_clusters),
            ));
        }
        let burn_in = self.burn_in();
        if burn_in >= self.iterations {
            return Err(Error::config(
                "burn_in",
                format!(
                    "must be smaller than iterations (got {} >= {})",
                    burn_in, self.iterations
                ),
            ));
        }
        check_positive("bandwidth", self.bandwidth)?;
        check_positive("max_vaf", self.max_vaf)?;
        check_positive("hyper_a", self.hyper_a)?;
        check_positive("hyper_b", self.hyper_b)?;
        if !(0.0..1.0).contains(&self.cutoff_weight) {
            return Err(Error::config(
                "cutoff_weight",
                format!("must lie in [0, 1) (got {})", self.cutoff_weight),
            ));
        }
        if self.grid_points < 2 {
            return Err(Error::config(
                "grid_points",
                format!("must be at least 2 (got {})", self.grid_points),
            ));
        }
        Ok(())
    }
}

pub(crate) fn check_positive(parameter: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::config(
            parameter,
            format!("must be a positive finite number (got {value})"),
        ))
    }
}
