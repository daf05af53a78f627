/*!
# Gibbs sampler for the truncated Dirichlet process mixture of binomials

Each mutation's mutant read count is modelled as `Binomial(depth, theta_c)`
where `c` is its cluster slot. Slots are weighted by a stick-breaking prior
truncated at `max_clusters` sticks, whose concentration parameter carries a
`Gamma(hyper_a, hyper_b)` prior.

One sweep (`step`) updates, in order:

1. the cluster slot of every mutation, drawn from its normalized
   `log prior mass + binomial log-likelihood` row,
2. the stick fractions, `v_h ~ Beta(1 + n_h, alpha + n_{>h})`,
3. the VAF parameter of every occupied slot,
   `theta_c ~ Gamma(sum of mutant reads, rate = sum of depths)`,
4. the concentration, `alpha ~ Gamma(C + a - 1, b - sum ln(1 - v_h))`.

Step 1 runs in parallel over mutations against a frozen snapshot of the
previous iteration. The uniforms it consumes are drawn from the chain RNG up
front, so a seeded chain is reproducible regardless of thread scheduling.

## Example

```rust
use subclonal_dpmm::config::Config;
use subclonal_dpmm::gibbs::DpGibbsSampler;
use subclonal_dpmm::observations::Observations;

let obs = Observations::new(&[10, 12, 48, 51], &[40, 40, 100, 100]).unwrap();
let config = Config::default().set_iterations(50).set_max_clusters(5);
let mut sampler = DpGibbsSampler::new(obs, &config).unwrap().set_seed(42);
let history = sampler.run(50, &mut ()).unwrap();
assert_eq!(history.len(), 50);
```
*/

use ndarray::Array1;
use rand::rngs::SmallRng;
use rand::{thread_rng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::Config;
use crate::core::{progress_bar, run_chain, IterationObserver, MarkovChain};
use crate::distributions::{
    binomial_log_likelihood, log_normalize, sample_beta, sample_gamma, Categorical,
};
use crate::error::{Error, Result};
use crate::history::{IterationHistory, SamplerState};
use crate::observations::Observations;
use crate::stick;

/// Stick fractions drawn as exactly one are replaced by this value.
pub const STICK_FRACTION_CAP: f64 = 0.9999;
/// Upper bound for a cluster VAF parameter.
pub const CLUSTER_VAF_CAP: f64 = 0.999;
/// Stick fraction of every slot but the last in iteration 1.
pub const INITIAL_STICK_FRACTION: f64 = 0.5;
/// Concentration parameter in iteration 1.
pub const INITIAL_CONCENTRATION: f64 = 1.0;

/// A single chain of the Dirichlet process Gibbs sampler.
pub struct DpGibbsSampler {
    observations: Observations,
    max_clusters: usize,
    hyper_a: f64,
    hyper_b: f64,
    /// Current state of the Markov chain.
    pub current_state: SamplerState,
    /// 1-based number of the current iteration.
    iteration: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
    /// RNG for this chain.
    pub rng: SmallRng,
}

impl DpGibbsSampler {
    /// Creates a chain positioned at iteration 1, drawn from the priors.
    ///
    /// The seed is taken from `config.seed`, or drawn from the thread RNG
    /// and kept in `seed` so the run can be replayed.
    pub fn new(observations: Observations, config: &Config) -> Result<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| thread_rng().gen::<u64>());
        let mut rng = SmallRng::seed_from_u64(seed);
        let current_state = initial_state(&observations, config.max_clusters, &mut rng);
        log::debug!(
            "initialized chain for {} mutations with {} cluster slots (seed {})",
            observations.len(),
            config.max_clusters,
            seed
        );
        Ok(Self {
            observations,
            max_clusters: config.max_clusters,
            hyper_a: config.hyper_a,
            hyper_b: config.hyper_b,
            current_state,
            iteration: 1,
            seed,
            rng,
        })
    }

    /// Re-seeds the chain and redraws iteration 1 from the priors.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self.current_state = initial_state(&self.observations, self.max_clusters, &mut self.rng);
        self.iteration = 1;
        self
    }

    pub fn observations(&self) -> &Observations {
        &self.observations
    }

    /// 1-based number of the iteration `current_state` belongs to.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Records the current state and then `iterations - 1` further sweeps.
    pub fn run<O>(&mut self, iterations: usize, observer: &mut O) -> Result<IterationHistory>
    where
        O: IterationObserver<SamplerState> + ?Sized,
    {
        if iterations == 0 {
            return Err(Error::config("iterations", "must be at least 1"));
        }
        log::info!(
            "running {} Gibbs iterations over {} mutations (seed {})",
            iterations,
            self.observations.len(),
            self.seed
        );
        let mut history =
            IterationHistory::with_capacity(self.max_clusters, self.observations.len(), iterations);
        history.push(self.current_state.clone())?;
        observer.on_iteration(1, iterations, &self.current_state);

        run_chain(self, iterations - 1, 2, iterations, observer, |state| {
            history.push(state.clone())
        })?;
        observer.on_finish();

        if let Some(last) = history.last() {
            log::info!(
                "finished sampling; {} occupied clusters at the last iteration (alpha = {:.4})",
                last.occupied_clusters(),
                last.concentration
            );
        }
        Ok(history)
    }

    /// Same as [`run`](Self::run), reporting progress on a terminal progress bar.
    pub fn run_progress(&mut self, iterations: usize) -> Result<IterationHistory> {
        let mut pb = progress_bar(iterations);
        self.run(iterations, &mut pb)
    }

    /// Draws a new cluster slot for every mutation given the current state.
    fn reassign(&mut self, iteration: usize) -> Result<Vec<usize>> {
        let state = &self.current_state;
        let ln_prior = stick::log_prior_mass(state.stick_fractions.view());
        let ln_theta: Vec<(f64, f64)> = state
            .cluster_vafs
            .iter()
            .map(|&theta| (theta.ln(), (-theta).ln_1p()))
            .collect();
        let uniforms: Vec<f64> = (0..self.observations.len())
            .map(|_| self.rng.gen::<f64>())
            .collect();

        self.observations
            .mutant_reads()
            .par_iter()
            .zip(self.observations.depths().par_iter())
            .zip(uniforms.par_iter())
            .enumerate()
            .map(|(mutation, ((&reads, &depth), &u))| {
                let row: Vec<f64> = ln_prior
                    .iter()
                    .zip(&ln_theta)
                    .map(|(&ln_mass, &(ln_t, ln_1m_t))| {
                        ln_mass + binomial_log_likelihood(reads, depth, ln_t, ln_1m_t)
                    })
                    .collect();
                let probs = log_normalize(&row).ok_or(Error::DegenerateAssignment {
                    iteration,
                    mutation,
                })?;
                Ok(Categorical { probs }.index_for(u))
            })
            .collect()
    }

    /// `v_h ~ Beta(1 + n_h, alpha + n_{>h})` for every stick but the last.
    fn update_stick_fractions(
        &mut self,
        counts: &[usize],
        concentration: f64,
        iteration: usize,
    ) -> Result<Array1<f64>> {
        let mut fractions = Array1::ones(self.max_clusters);
        for (h, (a, b)) in stick_beta_params(counts, concentration).into_iter().enumerate() {
            let v = sample_beta(a, b, &mut self.rng).map_err(|e| Error::Distribution {
                iteration,
                message: format!("stick fraction {h} ~ Beta({a}, {b}): {e}"),
            })?;
            fractions[h] = cap_stick_fraction(v);
        }
        Ok(fractions)
    }

    /// Resamples the VAF parameter of every occupied slot; empty slots keep theirs.
    fn update_cluster_vafs(&mut self, assignment: &[usize], iteration: usize) -> Result<Array1<f64>> {
        let mut reads = vec![0u64; self.max_clusters];
        let mut depths = vec![0u64; self.max_clusters];
        for (&slot, (y, n)) in assignment.iter().zip(self.observations.iter()) {
            reads[slot] += u64::from(y);
            depths[slot] += u64::from(n);
        }

        let mut vafs = self.current_state.cluster_vafs.clone();
        for slot in 0..self.max_clusters {
            if depths[slot] == 0 {
                continue;
            }
            let shape = reads[slot] as f64;
            let rate = depths[slot] as f64;
            let theta = sample_gamma(shape, rate, &mut self.rng).map_err(|e| {
                Error::Distribution {
                    iteration,
                    message: format!("cluster VAF {slot} ~ Gamma({shape}, rate {rate}): {e}"),
                }
            })?;
            vafs[slot] = theta.min(CLUSTER_VAF_CAP);
        }
        Ok(vafs)
    }

    fn update_concentration(&mut self, fractions: &Array1<f64>, iteration: usize) -> Result<f64> {
        let (shape, rate) = concentration_params(fractions, self.hyper_a, self.hyper_b);
        sample_gamma(shape, rate, &mut self.rng).map_err(|e| Error::Distribution {
            iteration,
            message: format!("concentration ~ Gamma({shape}, rate {rate}): {e}"),
        })
    }
}

/// Beta parameters `(1 + n_h, alpha + n_{>h})` of every stick but the last,
/// given the slot occupancy `counts`.
pub(crate) fn stick_beta_params(counts: &[usize], concentration: f64) -> Vec<(f64, f64)> {
    let mut above = counts.iter().sum::<usize>();
    counts
        .iter()
        .take(counts.len().saturating_sub(1))
        .map(|&n| {
            above -= n;
            (1.0 + n as f64, concentration + above as f64)
        })
        .collect()
}

/// A fraction of exactly one would zero the weight of every later slot.
pub(crate) fn cap_stick_fraction(v: f64) -> f64 {
    if v >= 1.0 {
        STICK_FRACTION_CAP
    } else {
        v
    }
}

/// Gamma shape and rate `(C + a - 1, b - sum_{h < C-1} ln(1 - v_h))` of the
/// concentration given the stick fractions of all `C` slots.
pub(crate) fn concentration_params(fractions: &Array1<f64>, hyper_a: f64, hyper_b: f64) -> (f64, f64) {
    let n_sticks = fractions.len();
    let shape = n_sticks as f64 + hyper_a - 1.0;
    let rate = hyper_b
        - fractions
            .iter()
            .take(n_sticks.saturating_sub(1))
            .map(|&v| (-v).ln_1p())
            .sum::<f64>();
    (shape, rate)
}

impl MarkovChain for DpGibbsSampler {
    type State = SamplerState;

    /// Performs one full sweep, producing the next iteration from the current one.
    fn step(&mut self) -> Result<&SamplerState> {
        let iteration = self.iteration + 1;

        let assignment = self.reassign(iteration)?;
        let mut counts = vec![0usize; self.max_clusters];
        for &slot in &assignment {
            counts[slot] += 1;
        }
        log::trace!("iteration {iteration}: cluster occupancy {counts:?}");

        let stick_fractions =
            self.update_stick_fractions(&counts, self.current_state.concentration, iteration)?;
        let cluster_vafs = self.update_cluster_vafs(&assignment, iteration)?;
        let concentration = self.update_concentration(&stick_fractions, iteration)?;

        self.current_state = SamplerState {
            stick_fractions,
            cluster_vafs,
            concentration,
            assignment,
        };
        self.iteration = iteration;
        Ok(&self.current_state)
    }

    fn current_state(&self) -> &SamplerState {
        &self.current_state
    }
}

/// Iteration 1: VAF parameters uniform on `[0, max observed VAF)`, every
/// stick fraction 0.5 except the last, concentration 1, and assignments
/// drawn from the resulting prior weights.
fn initial_state(observations: &Observations, max_clusters: usize, rng: &mut SmallRng) -> SamplerState {
    let max_vaf = observations.max_vaf();
    let cluster_vafs: Array1<f64> = (0..max_clusters)
        .map(|_| rng.gen_range(0.0..max_vaf))
        .collect();
    let mut stick_fractions = Array1::from_elem(max_clusters, INITIAL_STICK_FRACTION);
    stick_fractions[max_clusters - 1] = 1.0;
    // The last stick is 1, so the prior weights already sum to one.
    let prior = Categorical {
        probs: stick::weights(stick_fractions.view()).to_vec(),
    };
    let assignment = (0..observations.len())
        .map(|_| prior.index_for(rng.gen::<f64>()))
        .collect();
    SamplerState {
        stick_fractions,
        cluster_vafs,
        concentration: INITIAL_CONCENTRATION,
        assignment,
    }
}

/// Runs a chain of `config.iterations` iterations from the priors.
///
/// Input and configuration are validated before any sampling work; with
/// `config.verbose` a progress bar is shown.
pub fn run(observations: &Observations, config: &Config) -> Result<IterationHistory> {
    let mut sampler = DpGibbsSampler::new(observations.clone(), config)?;
    if config.verbose {
        sampler.run_progress(config.iterations)
    } else {
        sampler.run(config.iterations, &mut ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    fn two_cluster_observations() -> Observations {
        let mut reads = Vec::new();
        let mut depths = Vec::new();
        for i in 0..40 {
            reads.push(24 + (i % 3) as u32);
            depths.push(100);
            reads.push(49 + (i % 3) as u32);
            depths.push(100);
        }
        Observations::new(&reads, &depths).unwrap()
    }

    fn small_config() -> Config {
        Config::default()
            .set_iterations(200)
            .set_max_clusters(10)
            .set_seed(42)
    }

    #[test]
    fn test_initial_state_follows_priors() {
        let obs = two_cluster_observations();
        let sampler = DpGibbsSampler::new(obs.clone(), &small_config()).unwrap();
        let state = sampler.current_state();
        assert_eq!(sampler.iteration(), 1);
        assert_eq!(state.concentration, 1.0);
        assert_eq!(state.stick_fractions[9], 1.0);
        assert!(state
            .stick_fractions
            .iter()
            .take(9)
            .all(|&v| v == INITIAL_STICK_FRACTION));
        assert!(state
            .cluster_vafs
            .iter()
            .all(|&t| (0.0..obs.max_vaf()).contains(&t)));
        assert_eq!(state.assignment.len(), obs.len());
    }

    #[test]
    fn test_step_keeps_invariants() {
        let mut sampler = DpGibbsSampler::new(two_cluster_observations(), &small_config()).unwrap();
        for _ in 0..50 {
            let state = sampler.step().unwrap();
            assert_eq!(state.stick_fractions[9], 1.0);
            assert!(state
                .stick_fractions
                .iter()
                .all(|&v| (0.0..=1.0).contains(&v)));
            assert!(state.stick_fractions.iter().take(9).all(|&v| v < 1.0));
            assert!(state
                .cluster_vafs
                .iter()
                .all(|&t| (0.0..=CLUSTER_VAF_CAP).contains(&t)));
            assert!(state.concentration > 0.0);
            assert!(state.assignment.iter().all(|&c| c < 10));
            assert_abs_diff_eq!(state.weights().sum(), 1.0, epsilon = 1e-9);
        }
        assert_eq!(sampler.iteration(), 51);
    }

    #[test]
    fn test_stick_beta_params_count_later_slots() {
        let params = stick_beta_params(&[3, 0, 5, 2], 0.5);
        assert_eq!(params, vec![(4.0, 7.5), (1.0, 7.5), (6.0, 2.5)]);
        assert_eq!(stick_beta_params(&[0, 0], 2.0), vec![(1.0, 2.0)]);
    }

    #[test]
    fn test_concentration_params() {
        let fractions = arr1(&[0.5, 0.75, 1.0]);
        let (shape, rate) = concentration_params(&fractions, 0.01, 0.01);
        assert_abs_diff_eq!(shape, 2.01, epsilon = 1e-12);
        // -ln(0.5) - ln(0.25) = ln(8); the last stick is left out.
        assert_abs_diff_eq!(rate, 0.01 + 8.0f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_saturated_stick_draw_is_capped() {
        assert_eq!(cap_stick_fraction(1.0), STICK_FRACTION_CAP);
        assert_eq!(cap_stick_fraction(0.999_99), 0.999_99);

        // All mutations in slot 0 and a vanishing concentration push every
        // Beta draw to exactly one.
        let mut sampler =
            DpGibbsSampler::new(two_cluster_observations(), &small_config()).unwrap();
        let mut counts = vec![0usize; 10];
        counts[0] = 80;
        let fractions = sampler.update_stick_fractions(&counts, 1e-300, 2).unwrap();
        assert_eq!(fractions[0], STICK_FRACTION_CAP);
        assert!(fractions.iter().take(9).all(|&v| v == STICK_FRACTION_CAP));
        assert_eq!(fractions[9], 1.0);
    }

    #[test]
    fn test_empty_slots_keep_their_parameter() {
        let mut sampler = DpGibbsSampler::new(two_cluster_observations(), &small_config()).unwrap();
        let before = sampler.current_state().cluster_vafs.clone();
        let after = sampler.step().unwrap().clone();
        for (slot, &n) in after.cluster_counts().iter().enumerate() {
            if n == 0 {
                assert_eq!(after.cluster_vafs[slot], before[slot]);
            }
        }
    }

    #[test]
    fn test_same_seed_same_history() {
        let obs = two_cluster_observations();
        let config = small_config().set_iterations(100);
        let first = run(&obs, &config).unwrap();
        let second = run(&obs, &config).unwrap();
        assert_eq!(first, second);

        let other = run(&obs, &config.clone().set_seed(7)).unwrap();
        assert_ne!(first, other);
    }

    #[test]
    fn test_set_seed_replays_chain() {
        let obs = two_cluster_observations();
        let config = Config::default().set_iterations(30).set_max_clusters(6);
        let mut a = DpGibbsSampler::new(obs.clone(), &config).unwrap().set_seed(3);
        let mut b = DpGibbsSampler::new(obs, &config).unwrap().set_seed(3);
        assert_eq!(a.seed, 3);
        assert_eq!(a.run(30, &mut ()).unwrap(), b.run(30, &mut ()).unwrap());
    }

    #[test]
    fn test_history_length_and_first_state() {
        let obs = two_cluster_observations();
        let mut sampler = DpGibbsSampler::new(obs, &small_config()).unwrap();
        let initial = sampler.current_state().clone();
        let history = sampler.run(25, &mut ()).unwrap();
        assert_eq!(history.len(), 25);
        assert_eq!(history.get(0), Some(&initial));
        assert_eq!(history.last(), Some(sampler.current_state()));
    }

    #[test]
    fn test_invalid_config_fails_before_sampling() {
        let obs = two_cluster_observations();
        let err = DpGibbsSampler::new(obs, &small_config().set_max_clusters(1)).err();
        assert!(matches!(
            err,
            Some(Error::InvalidConfig {
                parameter: "max_clusters",
                ..
            })
        ));
    }

    #[test]
    fn test_degenerate_row_is_reported() {
        let obs = Observations::new(&[5, 5], &[10, 10]).unwrap();
        let mut sampler =
            DpGibbsSampler::new(obs, &Config::default().set_max_clusters(2).set_seed(1)).unwrap();
        sampler.current_state.cluster_vafs = Array1::from_elem(2, f64::NAN);
        let err = sampler.step().unwrap_err();
        assert!(matches!(
            err,
            Error::DegenerateAssignment { iteration: 2, .. }
        ));
    }

    #[test]
    fn test_cancellation_returns_no_history() {
        struct StopAt(usize);

        impl IterationObserver<SamplerState> for StopAt {
            fn on_iteration(&mut self, _iteration: usize, _total: usize, _state: &SamplerState) {
                self.0 = self.0.saturating_sub(1);
            }

            fn should_stop(&self) -> bool {
                self.0 == 0
            }
        }

        let mut sampler = DpGibbsSampler::new(two_cluster_observations(), &small_config()).unwrap();
        let err = sampler.run(100, &mut StopAt(10)).unwrap_err();
        assert_eq!(err, Error::Cancelled { iteration: 11 });
    }
}
