//! Chain abstraction, iteration observers and the loop that drives a chain
//! for a fixed number of iterations.

use indicatif::{ProgressBar, ProgressStyle};

use crate::error::{Error, Result};

pub trait MarkovChain {
    type State;

    /// Does one iteration of the chain, returning the new current state.
    fn step(&mut self) -> Result<&Self::State>;

    /// Get the current state without stepping.
    fn current_state(&self) -> &Self::State;
}

/// Side channel notified after every iteration.
///
/// Observers cannot influence the chain except by asking it to stop, which
/// is checked between iterations.
pub trait IterationObserver<S> {
    /// Called once per completed iteration (1-based count out of `total`).
    fn on_iteration(&mut self, _iteration: usize, _total: usize, _state: &S) {}

    /// Polled before each iteration; returning `true` cancels the run.
    fn should_stop(&self) -> bool {
        false
    }

    /// Called once after the last iteration.
    fn on_finish(&mut self) {}
}

/// Silent observer.
impl<S> IterationObserver<S> for () {}

impl<S> IterationObserver<S> for ProgressBar {
    fn on_iteration(&mut self, _iteration: usize, _total: usize, _state: &S) {
        self.inc(1);
    }

    fn on_finish(&mut self) {
        self.finish_with_message("Done!");
    }
}

impl<S, O: IterationObserver<S> + ?Sized> IterationObserver<S> for &mut O {
    fn on_iteration(&mut self, iteration: usize, total: usize, state: &S) {
        (**self).on_iteration(iteration, total, state);
    }

    fn should_stop(&self) -> bool {
        (**self).should_stop()
    }

    fn on_finish(&mut self) {
        (**self).on_finish();
    }
}

/// A progress bar styled for a single chain of `n_steps` iterations.
pub fn progress_bar(n_steps: usize) -> ProgressBar {
    let pb = ProgressBar::new(n_steps as u64);
    let style = ProgressStyle::default_bar()
        .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
    pb.set_style(style);
    pb.set_prefix("Gibbs");
    pb
}

/// Runs `chain` for `n_steps` iterations, handing every new state to `record`.
///
/// `first_iteration` is the 1-based number of the first step, used for
/// observer notifications and cancellation errors.
pub fn run_chain<M, O, F>(
    chain: &mut M,
    n_steps: usize,
    first_iteration: usize,
    total: usize,
    observer: &mut O,
    mut record: F,
) -> Result<()>
where
    M: MarkovChain,
    O: IterationObserver<M::State> + ?Sized,
    F: FnMut(&M::State) -> Result<()>,
{
    for k in 0..n_steps {
        let iteration = first_iteration + k;
        if observer.should_stop() {
            return Err(Error::Cancelled { iteration });
        }
        let state = chain.step()?;
        record(state)?;
        observer.on_iteration(iteration, total, state);
    }
    Ok(())
}
