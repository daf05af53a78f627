/*!
Posterior density of the VAF from the retained iterations of a chain.

Each retained iteration contributes one curve: a Gaussian kernel density
estimate of its cluster VAF parameters, weighted by the normalized
stick-breaking weights. The curves are stacked into a `grid × iterations`
matrix and reduced to a pointwise mean with a 95% credible band.
*/

use ndarray::{Array1, Array2, Axis, Zip};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::QuantileExt;
use noisy_float::types::n64;
use rayon::prelude::*;

use crate::config::{check_positive, DEFAULT_GRID_POINTS};
use crate::distributions::gaussian_kernel;
use crate::error::{Error, Result};
use crate::history::{IterationHistory, SamplerState};

pub const LOWER_QUANTILE: f64 = 0.025;
pub const UPPER_QUANTILE: f64 = 0.975;

/// Posterior density of the VAF on a regular grid.
///
/// All four arrays have the grid resolution as their length.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityRecord {
    pub grid: Array1<f64>,
    pub mean: Array1<f64>,
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
}

impl DensityRecord {
    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Grid point with the highest mean density.
    pub fn mode(&self) -> Option<f64> {
        self.mean.argmax().ok().map(|i| self.grid[i])
    }
}

/// Density estimate on the default 512-point grid over `[0, max_vaf]`.
pub fn estimate(
    history: &IterationHistory,
    burn_in: usize,
    bandwidth: f64,
    max_vaf: f64,
) -> Result<DensityRecord> {
    estimate_on_grid(history, burn_in, bandwidth, max_vaf, DEFAULT_GRID_POINTS)
}

/// Density estimate on a grid of `grid_points` points spanning `[0, max_vaf]`
/// inclusive of both ends.
pub fn estimate_on_grid(
    history: &IterationHistory,
    burn_in: usize,
    bandwidth: f64,
    max_vaf: f64,
    grid_points: usize,
) -> Result<DensityRecord> {
    check_positive("bandwidth", bandwidth)?;
    check_positive("max_vaf", max_vaf)?;
    if grid_points < 2 {
        return Err(Error::config(
            "grid_points",
            format!("must be at least 2 (got {grid_points})"),
        ));
    }
    let retained = history.retained(burn_in)?;
    let grid = Array1::linspace(0.0, max_vaf, grid_points);
    log::debug!(
        "estimating density from {} retained iterations on {} grid points",
        retained.len(),
        grid_points
    );

    let curves = retained
        .par_iter()
        .enumerate()
        .map(|(k, state)| weighted_kde(state, &grid, bandwidth, burn_in + k + 1))
        .collect::<Result<Vec<_>>>()?;

    let mut densities = Array2::zeros((grid_points, retained.len()));
    for (mut column, curve) in densities.columns_mut().into_iter().zip(&curves) {
        column.assign(curve);
    }

    let mean = densities
        .mean_axis(Axis(1))
        .ok_or(Error::DegenerateDensity { iteration: burn_in + 1 })?;
    let mut lower = quantile(&mut densities, LOWER_QUANTILE)?;
    let mut upper = quantile(&mut densities, UPPER_QUANTILE)?;

    // A skewed set of curves can put the mean outside the percentile band.
    let mut widened = 0usize;
    Zip::from(&mut lower)
        .and(&mut upper)
        .and(&mean)
        .for_each(|lo, hi, &m| {
            if m < *lo || m > *hi {
                widened += 1;
                *lo = lo.min(m);
                *hi = hi.max(m);
            }
        });
    if widened > 0 {
        log::warn!("credible band widened at {widened} grid points to contain the mean density");
    }

    Ok(DensityRecord {
        grid,
        mean,
        lower,
        upper,
    })
}

/// Empirical quantile across iterations at every grid point (linear interpolation).
fn quantile(densities: &mut Array2<f64>, q: f64) -> Result<Array1<f64>> {
    densities
        .quantile_axis_skipnan_mut(Axis(1), n64(q), &Linear)
        .map_err(|e| Error::DensityQuantile {
            quantile: q,
            message: e.to_string(),
        })
}

/// Kernel density estimate of one iteration's cluster VAFs on `grid`.
fn weighted_kde(
    state: &SamplerState,
    grid: &Array1<f64>,
    bandwidth: f64,
    iteration: usize,
) -> Result<Array1<f64>> {
    let weights = state.weights();
    let total = weights.sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(Error::DegenerateDensity { iteration });
    }
    let weights = weights / total;
    Ok(grid.mapv(|x| {
        weights
            .iter()
            .zip(state.cluster_vafs.iter())
            .map(|(&w, &theta)| w * gaussian_kernel((x - theta) / bandwidth))
            .sum::<f64>()
            / bandwidth
    }))
}
