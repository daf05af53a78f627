/*!
End-to-end fit: validate input, run the chain, post-process.

```rust
use subclonal_dpmm::config::Config;
use subclonal_dpmm::fit::fit;

let reads = [20, 22, 25, 48, 50, 52];
let depths = [100; 6];
let config = Config::default()
    .set_iterations(200)
    .set_burn_in(100)
    .set_max_clusters(8)
    .set_seed(42);
let result = fit(&reads, &depths, &config).unwrap();
assert_eq!(result.density.len(), 512);
assert_eq!(result.history.len(), 200);
```
*/

use ndarray::Array2;

use crate::config::Config;
use crate::core::{progress_bar, IterationObserver};
use crate::density::{self, DensityRecord};
use crate::error::Result;
use crate::gibbs::DpGibbsSampler;
use crate::history::{IterationHistory, SamplerState};
use crate::observations::Observations;
use crate::summary::{self, ClusterSummary};

/// Everything a presentation layer needs to redraw the results without
/// resampling.
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    pub observations: Observations,
    pub history: IterationHistory,
    /// Stick-breaking weights of every iteration, `iterations × max_clusters`.
    pub stick_weights: Array2<f64>,
    pub density: DensityRecord,
    pub clusters: ClusterSummary,
    /// Effective burn-in used for post-processing.
    pub burn_in: usize,
    /// Seed the chain ran with.
    pub seed: u64,
}

impl Fit {
    /// Supported clusters as `(weight, frequency)` pairs, ascending by frequency.
    pub fn supported_clusters(&self) -> Vec<(f64, f64)> {
        self.clusters
            .supported
            .iter()
            .map(|c| (c.weight, c.frequency))
            .collect()
    }
}

/// Fits the model to mutant read counts and depths.
///
/// Progress is shown on a progress bar when `config.verbose` is set.
pub fn fit(mutant_reads: &[u32], depths: &[u32], config: &Config) -> Result<Fit> {
    if config.verbose {
        let mut pb = progress_bar(config.iterations);
        fit_with_observer(mutant_reads, depths, config, &mut pb)
    } else {
        fit_with_observer(mutant_reads, depths, config, &mut ())
    }
}

/// Like [`fit`], notifying `observer` after every iteration.
pub fn fit_with_observer<O>(
    mutant_reads: &[u32],
    depths: &[u32],
    config: &Config,
    observer: &mut O,
) -> Result<Fit>
where
    O: IterationObserver<SamplerState> + ?Sized,
{
    let observations = Observations::new(mutant_reads, depths)?;
    config.validate()?;
    log::debug!("fitting with {config:?}");

    let mut sampler = DpGibbsSampler::new(observations.clone(), config)?;
    let seed = sampler.seed;
    let history = sampler.run(config.iterations, observer)?;

    let burn_in = config.burn_in();
    let density = density::estimate_on_grid(
        &history,
        burn_in,
        config.bandwidth,
        config.max_vaf,
        config.grid_points,
    )?;
    let clusters = summary::summarize(&history, burn_in, config.cutoff_weight)?;
    log::info!(
        "{} supported clusters at frequencies {:?}",
        clusters.n_supported(),
        clusters
            .supported
            .iter()
            .map(|c| c.frequency)
            .collect::<Vec<_>>()
    );

    Ok(Fit {
        stick_weights: history.weights(),
        observations,
        history,
        density,
        clusters,
        burn_in,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_zero_reads_fail_before_sampling() {
        struct Count(usize);

        impl IterationObserver<SamplerState> for Count {
            fn on_iteration(&mut self, _iteration: usize, _total: usize, _state: &SamplerState) {
                self.0 += 1;
            }
        }

        let mut count = Count(0);
        let config = Config::default().set_iterations(10).set_seed(1);
        let err = fit_with_observer(&[4, 0, 7], &[10, 10, 10], &config, &mut count).unwrap_err();
        assert_eq!(err, Error::ZeroMutantReads { index: 1 });
        assert_eq!(count.0, 0);
    }

    #[test]
    fn test_bundle_shapes() {
        let reads = [10, 11, 12, 30, 31, 29];
        let depths = [40, 40, 40, 60, 60, 60];
        let config = Config::default()
            .set_iterations(60)
            .set_burn_in(20)
            .set_max_clusters(6)
            .set_grid_points(128)
            .set_seed(9);
        let result = fit(&reads, &depths, &config).unwrap();
        assert_eq!(result.seed, 9);
        assert_eq!(result.burn_in, 20);
        assert_eq!(result.history.len(), 60);
        assert_eq!(result.stick_weights.shape(), &[60, 6]);
        assert_eq!(result.density.len(), 128);
        assert_eq!(result.clusters.all.len(), 6);
        assert_eq!(result.supported_clusters().len(), result.clusters.n_supported());
        assert_eq!(result.observations.vafs()[3], 0.5);
    }
}
