//! Adaptive step-size control.
//!
//! A stepper wraps a [`Solver`](crate::Solver) and repeats a trial step,
//! shrinking it until a [`DifferencePredicate`](sinew_core::DifferencePredicate)
//! no longer flags the candidate, then proposes a larger step for the next
//! call:
//!
//! - [`StepDoubling`] compares one full step with two half steps.
//! - [`BackAndForth`] compares the state after a single step with the state
//!   before it.
//!
//! The retry loop has no bound beyond the shrink policy's floor. When the
//! predicate still disagrees and the floor has been reached, the trial is
//! accepted with [`Accuracy::Degraded`] instead of failing.

mod back_and_forth;
mod config;
mod policy;
mod step_doubling;

pub use back_and_forth::BackAndForth;
pub use config::AdaptiveConfig;
pub use policy::{ScaleGrow, ScaleShrink};
pub use step_doubling::StepDoubling;

use sinew_core::{GrowPolicy, IntegrationError, ShrinkPolicy};

/// Whether an accepted step met the requested accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub enum Accuracy {
    /// The difference predicate accepted the step.
    #[default]
    Met,

    /// The step was accepted at the minimum size although the predicate
    /// still flagged it.
    Degraded,
}

/// Outcome of one adaptive step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// Step size actually accomplished.
    pub did: f64,

    /// Suggested step size for the next call.
    pub next: f64,

    /// Number of trials rejected before acceptance.
    pub rejected: usize,

    pub accuracy: Accuracy,
}

/// Running totals kept by a stepper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde-derive", derive(serde::Serialize, serde::Deserialize))]
pub struct Counters {
    /// Trials accepted with [`Accuracy::Met`].
    pub accepted: u64,

    /// Trials rejected and retried with a smaller step.
    pub rejected: u64,

    /// Trials accepted with [`Accuracy::Degraded`].
    pub degraded: u64,
}

/// A single adaptive step with step-size control.
pub trait Stepper {
    type Model;
    type State;
    type Derivative;

    /// Number of elements the scratch buffers are sized for.
    fn len(&self) -> usize;

    /// Returns `true` if the stepper is sized for zero elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reallocates the stepper's and its solver's scratch buffers.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the buffers cannot grow.
    /// The stepper is then sized for zero elements.
    fn resize(&mut self, len: usize) -> Result<(), IntegrationError>;

    /// Advances `initial` from time `t`, trying `h_try` first.
    ///
    /// # Errors
    ///
    /// Returns an error on a cardinality mismatch, an invalid trial step, or
    /// if the underlying solver fails.
    fn step(
        &mut self,
        model: &mut [Self::Model],
        initial: &[Self::State],
        t: f64,
        h_try: f64,
        out: &mut [Self::State],
    ) -> Result<Advance, IntegrationError>;

    fn counters(&self) -> Counters;

    fn reset_counters(&mut self);
}

/// Decision taken after a trial has been compared.
enum Verdict {
    Accept(Advance),
    Retry(f64),
}

/// Shared accept/shrink bookkeeping for the adaptive loops.
fn judge<Sh, G>(
    different: bool,
    t: f64,
    h: f64,
    rejected: &mut usize,
    counters: &mut Counters,
    shrink: &Sh,
    grow: &G,
) -> Verdict
where
    Sh: ShrinkPolicy,
    G: GrowPolicy,
{
    if !different {
        counters.accepted += 1;
        return Verdict::Accept(Advance {
            did: h,
            next: grow.grow(h),
            rejected: *rejected,
            accuracy: Accuracy::Met,
        });
    }

    let smaller = shrink.shrink(h);
    if smaller < h {
        counters.rejected += 1;
        *rejected += 1;
        tracing::debug!(t, h, next = smaller, "step rejected");
        Verdict::Retry(smaller)
    } else {
        counters.degraded += 1;
        tracing::warn!(t, h, rejected = *rejected, "accepting step with accuracy not met");
        Verdict::Accept(Advance {
            did: h,
            next: h,
            rejected: *rejected,
            accuracy: Accuracy::Degraded,
        })
    }
}
