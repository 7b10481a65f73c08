use std::ops::{Add, Mul};

use crate::IntegrationError;

/// Computes the time derivative of a state sequence.
///
/// A derivative law may mutate the model, for example to accumulate and then
/// clear per-element forces, but it must leave the model ready for the next
/// evaluation: two consecutive calls with the same inputs produce the same
/// derivative.
///
/// Implementations write one derivative per state element into `out`.
/// Callers guarantee that `model`, `state` and `out` have equal lengths.
pub trait DerivativeLaw {
    type Model;
    type State;
    type Derivative;

    /// Evaluates the derivative of `state` at time `t` into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error if the law cannot produce a finite derivative.
    fn evaluate(
        &self,
        model: &mut [Self::Model],
        state: &[Self::State],
        t: f64,
        out: &mut [Self::Derivative],
    ) -> Result<(), IntegrationError>;
}

/// Advances a state sequence along a derivative sequence.
///
/// `step` must be a pure function of its inputs. Callers guarantee that all
/// slices have equal lengths and that `out` does not alias `initial`.
pub trait StepLaw<S, D> {
    /// Writes the state reached from `initial` after a step of size `h`.
    fn step(&self, initial: &[S], derivative: &[D], h: f64, out: &mut [S]);

    /// Final averaging used by the modified midpoint method.
    ///
    /// The default computes `0.5 * (previous + step(latest, derivative, h))`
    /// element by element.
    fn blend(&self, previous: &[S], latest: &[S], derivative: &[D], h: f64, out: &mut [S])
    where
        S: Clone + Add<Output = S> + Mul<f64, Output = S>,
    {
        self.step(latest, derivative, h, out);
        for (out, previous) in out.iter_mut().zip(previous) {
            *out = (previous.clone() + out.clone()) * 0.5;
        }
    }
}

/// Chooses the number of substeps for a modified midpoint step.
pub trait SubstepPolicy<M, S> {
    fn substeps(&self, model: &[M], state: &[S], t: f64) -> usize;
}

/// Proposes a smaller step after a rejected trial.
///
/// Implementations clamp the result to a floor; once `shrink(h) >= h` the
/// stepper can no longer reduce the step.
pub trait ShrinkPolicy {
    fn shrink(&self, h: f64) -> f64;
}

/// Proposes a larger step after an accepted trial, clamped to a ceiling.
pub trait GrowPolicy {
    fn grow(&self, h: f64) -> f64;
}

/// Decides whether two candidate states disagree beyond a tolerance.
pub trait DifferencePredicate<M, S> {
    fn is_different(&self, model: &[M], a: &[S], b: &[S], t: f64) -> bool;
}

impl<M, S, F> SubstepPolicy<M, S> for F
where
    F: Fn(&[M], &[S], f64) -> usize,
{
    fn substeps(&self, model: &[M], state: &[S], t: f64) -> usize {
        self(model, state, t)
    }
}

impl<F> ShrinkPolicy for F
where
    F: Fn(f64) -> f64,
{
    fn shrink(&self, h: f64) -> f64 {
        self(h)
    }
}

impl<F> GrowPolicy for F
where
    F: Fn(f64) -> f64,
{
    fn grow(&self, h: f64) -> f64 {
        self(h)
    }
}

impl<M, S, F> DifferencePredicate<M, S> for F
where
    F: Fn(&[M], &[S], &[S], f64) -> bool,
{
    fn is_different(&self, model: &[M], a: &[S], b: &[S], t: f64) -> bool {
        self(model, a, b, t)
    }
}
