//! Fixed-order, fixed-step explicit solvers.
//!
//! A solver advances a state sequence by one step of size `h` using a
//! [`DerivativeLaw`](sinew_core::DerivativeLaw) to evaluate derivatives and a
//! [`StepLaw`](sinew_core::StepLaw) to apply them. The available methods are:
//!
//! - [`Euler`]: first order, one evaluation per step
//! - [`RungeKutta2`]: second-order midpoint method, two evaluations
//! - [`RungeKutta4`]: classic fourth-order method, four evaluations
//! - [`ModifiedMidpoint`]: second order over `N` substeps, `N + 1` evaluations
//!
//! Solvers never inspect the values they produce. A NaN or infinity in the
//! state propagates silently; detecting blow-up is left to the derivative law.

mod euler;
mod modified_midpoint;
mod runge_kutta2;
mod runge_kutta4;

pub use euler::Euler;
pub use modified_midpoint::{ConstantSubsteps, ModifiedMidpoint};
pub use runge_kutta2::RungeKutta2;
pub use runge_kutta4::RungeKutta4;

use sinew_core::{IntegrationError, ensure_len};

/// A single-step explicit integration method.
pub trait Solver {
    type Model;
    type State;
    type Derivative;

    /// Order of accuracy of the method.
    fn order(&self) -> u32;

    /// Number of elements the scratch buffers are sized for.
    fn len(&self) -> usize;

    /// Returns `true` if the solver is sized for zero elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reallocates every scratch buffer for `len` elements.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the buffers cannot grow.
    /// The solver is then sized for zero elements until a later resize
    /// succeeds.
    fn resize(&mut self, len: usize) -> Result<(), IntegrationError>;

    /// Evaluates the derivative law once.
    ///
    /// Steppers use this to evaluate the derivative at the start of a segment
    /// and reuse it across trial steps through [`Solver::solve_from`].
    ///
    /// # Errors
    ///
    /// Returns an error on a cardinality mismatch or if the law fails.
    fn derivative(
        &self,
        model: &mut [Self::Model],
        state: &[Self::State],
        t: f64,
        out: &mut [Self::Derivative],
    ) -> Result<(), IntegrationError>;

    /// Advances `initial` by `h` starting at time `t`, writing into `out`.
    ///
    /// # Errors
    ///
    /// Returns an error on a cardinality mismatch, an invalid step size, or
    /// if the derivative law fails.
    fn solve(
        &mut self,
        model: &mut [Self::Model],
        initial: &[Self::State],
        t: f64,
        h: f64,
        out: &mut [Self::State],
    ) -> Result<(), IntegrationError>;

    /// Same as [`Solver::solve`], reusing a derivative already evaluated at
    /// `(initial, t)`.
    ///
    /// # Errors
    ///
    /// Returns an error on a cardinality mismatch, an invalid step size, or
    /// if the derivative law fails.
    fn solve_from(
        &mut self,
        model: &mut [Self::Model],
        initial: &[Self::State],
        initial_derivative: &[Self::Derivative],
        t: f64,
        h: f64,
        out: &mut [Self::State],
    ) -> Result<(), IntegrationError>;
}

/// Validates the buffers passed to a derivative evaluation.
pub(crate) fn check_evaluation<M, S, D>(
    len: usize,
    model: &[M],
    state: &[S],
    out: &[D],
) -> Result<(), IntegrationError> {
    ensure_len("model", len, model.len())?;
    ensure_len("state", len, state.len())?;
    ensure_len("derivative", len, out.len())
}

/// Validates the buffers and step size passed to a solve.
pub(crate) fn check_solve<M, S>(
    len: usize,
    model: &[M],
    initial: &[S],
    h: f64,
    out: &[S],
) -> Result<(), IntegrationError> {
    ensure_len("model", len, model.len())?;
    ensure_len("initial state", len, initial.len())?;
    ensure_len("final state", len, out.len())?;
    IntegrationError::check_step(h)
}
