//! Thresholded summary of the cluster slots over the retained iterations.

use ndarray::Axis;

use crate::error::{Error, Result};
use crate::history::IterationHistory;

/// Posterior mean weight and VAF of one cluster slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterEstimate {
    /// Slot index in the truncated stick.
    pub slot: usize,
    pub weight: f64,
    /// Mean cluster VAF parameter, i.e. the estimated cellular frequency.
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    /// Slots whose mean weight exceeds the cutoff, ascending by frequency.
    pub supported: Vec<ClusterEstimate>,
    /// Every slot, ascending by frequency.
    pub all: Vec<ClusterEstimate>,
    pub cutoff_weight: f64,
}

impl ClusterSummary {
    pub fn n_supported(&self) -> usize {
        self.supported.len()
    }
}

/// Averages stick-breaking weights and VAF parameters of every slot over the
/// iterations from `burn_in` on, and keeps the slots whose mean weight
/// exceeds `cutoff_weight`.
///
/// Both lists are sorted ascending by frequency; ties keep slot order.
pub fn summarize(
    history: &IterationHistory,
    burn_in: usize,
    cutoff_weight: f64,
) -> Result<ClusterSummary> {
    if !(0.0..1.0).contains(&cutoff_weight) {
        return Err(Error::config(
            "cutoff_weight",
            format!("must lie in [0, 1) (got {cutoff_weight})"),
        ));
    }
    let n_retained = history.retained(burn_in)?.len();
    let empty = || Error::config("burn_in", format!("no mean over {n_retained} retained iterations"));

    let weights = history.weights();
    let vafs = history.cluster_vafs();
    let retained = burn_in..history.len();
    let mean_weights = weights
        .slice_axis(Axis(0), retained.clone().into())
        .mean_axis(Axis(0))
        .ok_or_else(empty)?;
    let mean_vafs = vafs
        .slice_axis(Axis(0), retained.into())
        .mean_axis(Axis(0))
        .ok_or_else(empty)?;

    let mut all: Vec<ClusterEstimate> = mean_weights
        .iter()
        .zip(mean_vafs.iter())
        .enumerate()
        .map(|(slot, (&weight, &frequency))| ClusterEstimate {
            slot,
            weight,
            frequency,
        })
        .collect();
    all.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

    let supported: Vec<ClusterEstimate> = all
        .iter()
        .filter(|c| c.weight > cutoff_weight)
        .copied()
        .collect();
    log::debug!(
        "{} of {} cluster slots exceed the weight cutoff {}",
        supported.len(),
        all.len(),
        cutoff_weight
    );

    Ok(ClusterSummary {
        supported,
        all,
        cutoff_weight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::SamplerState;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, Array1};

    fn state(sticks: Array1<f64>, vafs: Array1<f64>) -> SamplerState {
        SamplerState {
            stick_fractions: sticks,
            cluster_vafs: vafs,
            concentration: 1.0,
            assignment: vec![0, 0],
        }
    }

    #[test]
    fn test_single_dominant_slot() {
        let mut history = IterationHistory::new(4, 2);
        for (i, theta) in [0.9, 0.8, 0.3, 0.32, 0.34].iter().enumerate() {
            // Slot 1 takes the whole stick; slot 0 breaks off nothing.
            let sticks = arr1(&[0.0, 1.0, 0.5, 1.0]);
            let vafs = arr1(&[0.05 * i as f64, *theta, 0.6, 0.7]);
            history.push(state(sticks, vafs)).unwrap();
        }
        let summary = summarize(&history, 2, 0.05).unwrap();
        assert_eq!(summary.n_supported(), 1);
        let cluster = summary.supported[0];
        assert_eq!(cluster.slot, 1);
        assert_eq!(cluster.weight, 1.0);
        assert_abs_diff_eq!(cluster.frequency, 0.32, epsilon = 1e-12);
        assert_eq!(summary.all.len(), 4);
    }

    #[test]
    fn test_sorted_by_frequency_with_stable_ties() {
        let mut history = IterationHistory::new(4, 2);
        history
            .push(state(arr1(&[0.4, 0.5, 0.5, 1.0]), arr1(&[0.5, 0.2, 0.5, 0.1])))
            .unwrap();
        let summary = summarize(&history, 0, 0.1).unwrap();
        let slots: Vec<usize> = summary.all.iter().map(|c| c.slot).collect();
        assert_eq!(slots, vec![3, 1, 0, 2]);
        // Weights: 0.4, 0.3, 0.15, 0.15.
        let supported: Vec<usize> = summary.supported.iter().map(|c| c.slot).collect();
        assert_eq!(supported, vec![3, 1, 0, 2]);

        let summary = summarize(&history, 0, 0.2).unwrap();
        let supported: Vec<usize> = summary.supported.iter().map(|c| c.slot).collect();
        assert_eq!(supported, vec![1, 0]);
        assert_eq!(summary.n_supported(), summary.supported.len());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut history = IterationHistory::new(2, 2);
        history
            .push(state(arr1(&[0.5, 1.0]), arr1(&[0.1, 0.2])))
            .unwrap();
        assert!(summarize(&history, 1, 0.05).is_err());
        assert!(summarize(&history, 0, 1.0).is_err());
    }
}
