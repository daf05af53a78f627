//! Error taxonomy of the sampler: invalid input, invalid configuration and
//! numerical degeneracy detected while the chain runs.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("no observations given")]
    NoObservations,
    #[error("mutant read counts and depths differ in length ({reads} vs {depths})")]
    LengthMismatch { reads: usize, depths: usize },
    #[error("mutation {index} has zero mutant reads; VAF = 0 observations are not allowed")]
    ZeroMutantReads { index: usize },
    #[error("mutation {index} has zero depth")]
    ZeroDepth { index: usize },
    #[error("mutation {index} has more mutant reads ({reads}) than total depth ({depth})")]
    ReadsExceedDepth { index: usize, reads: u32, depth: u32 },
    #[error("invalid configuration: {parameter} {reason}")]
    InvalidConfig {
        parameter: &'static str,
        reason: String,
    },
    #[error(
        "cluster probabilities of mutation {mutation} at iteration {iteration} do not form a \
         distribution (all clusters have zero or undefined mass)"
    )]
    DegenerateAssignment { iteration: usize, mutation: usize },
    #[error("kernel density weights at iteration {iteration} sum to zero or a non-finite value")]
    DegenerateDensity { iteration: usize },
    #[error("credible band quantile {quantile} could not be computed: {message}")]
    DensityQuantile { quantile: f64, message: String },
    #[error("invalid distribution parameters at iteration {iteration}: {message}")]
    Distribution { iteration: usize, message: String },
    #[error("sampler state has {found} {what}, history expects {expected}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("sampling cancelled before iteration {iteration}")]
    Cancelled { iteration: usize },
}

impl Error {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            parameter,
            reason: reason.into(),
        }
    }

    /// Whether the error was raised before any sampling work began.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::NoObservations
                | Error::LengthMismatch { .. }
                | Error::ZeroMutantReads { .. }
                | Error::ZeroDepth { .. }
                | Error::ReadsExceedDepth { .. }
                | Error::InvalidConfig { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_offending_item() {
        let err = Error::ZeroMutantReads { index: 7 };
        assert!(err.to_string().contains("mutation 7"));

        let err = Error::config("burn_in", "must be smaller than iterations (got 10 >= 10)");
        assert_eq!(
            err.to_string(),
            "invalid configuration: burn_in must be smaller than iterations (got 10 >= 10)"
        );
    }

    #[test]
    fn test_input_errors_are_classified() {
        assert!(Error::NoObservations.is_input_error());
        assert!(Error::config("bandwidth", "must be positive").is_input_error());
        assert!(!Error::DegenerateDensity { iteration: 3 }.is_input_error());
        assert!(!Error::Cancelled { iteration: 1 }.is_input_error());
        assert!(!Error::DensityQuantile {
            quantile: 0.975,
            message: "empty input".to_string(),
        }
        .is_input_error());
    }
}
