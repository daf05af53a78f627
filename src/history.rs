/*!
Sampler state of a single iteration and the append-only history of a run.

The history is written only by the sampler; post-processing borrows it
immutably. Matrix views (`iterations × clusters`) are provided for
downstream plotting.
*/

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::{Error, Result};
use crate::stick;

/// Latent variables of one Gibbs iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerState {
    /// Stick-breaking fractions; the last one is always 1.
    pub stick_fractions: Array1<f64>,
    /// VAF parameter of each cluster slot.
    pub cluster_vafs: Array1<f64>,
    /// Dirichlet process concentration parameter.
    pub concentration: f64,
    /// Cluster slot (0-based) of each mutation.
    pub assignment: Vec<usize>,
}

impl SamplerState {
    pub fn max_clusters(&self) -> usize {
        self.stick_fractions.len()
    }

    /// Mixture weights derived from the stick fractions.
    pub fn weights(&self) -> Array1<f64> {
        stick::weights(self.stick_fractions.view())
    }

    /// Number of mutations assigned to each slot.
    pub fn cluster_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.max_clusters()];
        for &slot in &self.assignment {
            counts[slot] += 1;
        }
        counts
    }

    pub fn occupied_clusters(&self) -> usize {
        self.cluster_counts().iter().filter(|&&n| n > 0).count()
    }
}

/// All iterations of one chain, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationHistory {
    max_clusters: usize,
    n_mutations: usize,
    states: Vec<SamplerState>,
}

impl IterationHistory {
    pub fn new(max_clusters: usize, n_mutations: usize) -> Self {
        Self {
            max_clusters,
            n_mutations,
            states: Vec::new(),
        }
    }

    pub fn with_capacity(max_clusters: usize, n_mutations: usize, iterations: usize) -> Self {
        Self {
            max_clusters,
            n_mutations,
            states: Vec::with_capacity(iterations),
        }
    }

    /// Appends the next iteration. States of the wrong shape are rejected.
    pub fn push(&mut self, state: SamplerState) -> Result<()> {
        check_len("stick fractions", self.max_clusters, state.stick_fractions.len())?;
        check_len("cluster VAFs", self.max_clusters, state.cluster_vafs.len())?;
        check_len("assignments", self.n_mutations, state.assignment.len())?;
        if let Some(&slot) = state.assignment.iter().find(|&&s| s >= self.max_clusters) {
            return Err(Error::ShapeMismatch {
                what: "cluster slots",
                expected: self.max_clusters,
                found: slot + 1,
            });
        }
        self.states.push(state);
        Ok(())
    }

    pub fn max_clusters(&self) -> usize {
        self.max_clusters
    }

    pub fn n_mutations(&self) -> usize {
        self.n_mutations
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn get(&self, iteration: usize) -> Option<&SamplerState> {
        self.states.get(iteration)
    }

    pub fn last(&self) -> Option<&SamplerState> {
        self.states.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SamplerState> {
        self.states.iter()
    }

    pub fn states(&self) -> &[SamplerState] {
        &self.states
    }

    /// Iterations from `burn_in` to the end.
    pub fn retained(&self, burn_in: usize) -> Result<&[SamplerState]> {
        if burn_in >= self.states.len() {
            return Err(Error::config(
                "burn_in",
                format!(
                    "must be smaller than the number of recorded iterations (got {} >= {})",
                    burn_in,
                    self.states.len()
                ),
            ));
        }
        Ok(&self.states[burn_in..])
    }

    fn stack(&self, row: impl Fn(&SamplerState) -> ArrayView1<'_, f64>) -> Array2<f64> {
        let mut out = Array2::zeros((self.states.len(), self.max_clusters));
        for (mut dst, state) in out.rows_mut().into_iter().zip(&self.states) {
            dst.assign(&row(state));
        }
        out
    }

    /// Stick fractions, `iterations × max_clusters`.
    pub fn stick_fractions(&self) -> Array2<f64> {
        self.stack(|s| s.stick_fractions.view())
    }

    /// Cluster VAF parameters, `iterations × max_clusters`.
    pub fn cluster_vafs(&self) -> Array2<f64> {
        self.stack(|s| s.cluster_vafs.view())
    }

    /// Stick-breaking weights, `iterations × max_clusters`.
    pub fn weights(&self) -> Array2<f64> {
        let mut out = Array2::zeros((self.states.len(), self.max_clusters));
        for (mut dst, state) in out.rows_mut().into_iter().zip(&self.states) {
            dst.assign(&state.weights());
        }
        out
    }

    pub fn concentrations(&self) -> Array1<f64> {
        self.states.iter().map(|s| s.concentration).collect()
    }

    /// Cluster slot of each mutation, `iterations × mutations`.
    pub fn assignments(&self) -> Array2<usize> {
        let mut out = Array2::zeros((self.states.len(), self.n_mutations));
        for (mut dst, state) in out.rows_mut().into_iter().zip(&self.states) {
            dst.assign(&ArrayView1::from(&state.assignment[..]));
        }
        out
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            what,
            expected,
            found,
        })
    }
}

impl<'a> IntoIterator for &'a IterationHistory {
    type Item = &'a SamplerState;
    type IntoIter = std::slice::Iter<'a, SamplerState>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    fn state(assignment: Vec<usize>) -> SamplerState {
        SamplerState {
            stick_fractions: arr1(&[0.5, 0.5, 1.0]),
            cluster_vafs: arr1(&[0.1, 0.2, 0.3]),
            concentration: 1.0,
            assignment,
        }
    }

    #[test]
    fn test_state_counts() {
        let s = state(vec![0, 2, 2, 0, 0]);
        assert_eq!(s.cluster_counts(), vec![3, 0, 2]);
        assert_eq!(s.occupied_clusters(), 2);
        assert_abs_diff_eq!(s.weights(), arr1(&[0.5, 0.25, 0.25]));
    }

    #[test]
    fn test_push_checks_shape() {
        let mut history = IterationHistory::new(3, 2);
        assert!(history.push(state(vec![0, 1])).is_ok());
        assert!(matches!(
            history.push(state(vec![0])),
            Err(Error::ShapeMismatch {
                what: "assignments",
                expected: 2,
                found: 1
            })
        ));
        assert!(matches!(
            history.push(state(vec![0, 3])),
            Err(Error::ShapeMismatch {
                what: "cluster slots",
                ..
            })
        ));
        let mut wide = state(vec![0, 0]);
        wide.cluster_vafs = arr1(&[0.1, 0.2]);
        assert!(history.push(wide).is_err());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_matrix_views() {
        let mut history = IterationHistory::new(3, 2);
        history.push(state(vec![0, 1])).unwrap();
        let mut second = state(vec![2, 2]);
        second.concentration = 2.0;
        second.stick_fractions = arr1(&[0.25, 0.0, 1.0]);
        history.push(second).unwrap();

        assert_eq!(history.stick_fractions().shape(), &[2, 3]);
        assert_eq!(history.cluster_vafs()[[1, 2]], 0.3);
        assert_abs_diff_eq!(history.weights()[[1, 2]], 0.75);
        assert_eq!(history.concentrations(), arr1(&[1.0, 2.0]));
        assert_eq!(history.assignments()[[1, 0]], 2);
    }

    #[test]
    fn test_retained_window() {
        let mut history = IterationHistory::new(3, 1);
        for _ in 0..4 {
            history.push(state(vec![1])).unwrap();
        }
        assert_eq!(history.retained(1).unwrap().len(), 3);
        assert!(history.retained(4).is_err());
    }
}
