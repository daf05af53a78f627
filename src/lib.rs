/*!
Estimates subclonal tumor-cell populations from variant allele frequencies by
fitting a truncated Dirichlet process mixture of binomials with a Gibbs
sampler.

- [`gibbs`] runs the chain and records an [`history::IterationHistory`].
- [`density`] turns the retained iterations into a VAF density with a
  credible band.
- [`summary`] reports the cluster slots carrying enough posterior weight.
- [`fit::fit`] chains the three and returns everything in one bundle.
*/

pub mod config;
pub mod core;
pub mod density;
pub mod distributions;
pub mod error;
pub mod fit;
pub mod gibbs;
pub mod history;
pub mod io;
pub mod observations;
pub mod stick;
pub mod summary;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::fit::{fit, Fit};
