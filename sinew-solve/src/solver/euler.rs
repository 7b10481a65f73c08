use sinew_core::{DerivativeLaw, IntegrationError, StepLaw, ensure_len};

use super::{Solver, check_evaluation, check_solve};
use crate::scratch;

/// Forward Euler.
///
/// ```text
/// D  = f(S, t)
/// S' = step(S, D, h)
/// ```
pub struct Euler<L: DerivativeLaw, P> {
    law: L,
    step: P,
    len: usize,
    derivative: Vec<L::Derivative>,
}

impl<L, P> Euler<L, P>
where
    L: DerivativeLaw,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
{
    /// Creates a solver sized for `len` elements.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the scratch buffer cannot
    /// be allocated.
    pub fn new(law: L, step: P, len: usize) -> Result<Self, IntegrationError> {
        let mut solver = Self {
            law,
            step,
            len: 0,
            derivative: Vec::new(),
        };
        solver.resize(len)?;
        Ok(solver)
    }

    /// Returns the derivative law.
    pub fn law(&self) -> &L {
        &self.law
    }
}

impl<L, P> Solver for Euler<L, P>
where
    L: DerivativeLaw,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
{
    type Model = L::Model;
    type State = L::State;
    type Derivative = L::Derivative;

    fn order(&self) -> u32 {
        1
    }

    fn len(&self) -> usize {
        self.len
    }

    fn resize(&mut self, len: usize) -> Result<(), IntegrationError> {
        self.len = 0;
        scratch::resize(&mut self.derivative, len)?;
        self.len = len;
        Ok(())
    }

    fn derivative(
        &self,
        model: &mut [L::Model],
        state: &[L::State],
        t: f64,
        out: &mut [L::Derivative],
    ) -> Result<(), IntegrationError> {
        check_evaluation(self.len, model, state, out)?;
        self.law.evaluate(model, state, t, out)
    }

    fn solve(
        &mut self,
        model: &mut [L::Model],
        initial: &[L::State],
        t: f64,
        h: f64,
        out: &mut [L::State],
    ) -> Result<(), IntegrationError> {
        check_solve(self.len, model, initial, h, out)?;
        self.law.evaluate(model, initial, t, &mut self.derivative)?;
        self.step.step(initial, &self.derivative, h, out);
        Ok(())
    }

    fn solve_from(
        &mut self,
        model: &mut [L::Model],
        initial: &[L::State],
        initial_derivative: &[L::Derivative],
        _t: f64,
        h: f64,
        out: &mut [L::State],
    ) -> Result<(), IntegrationError> {
        check_solve(self.len, model, initial, h, out)?;
        ensure_len("initial derivative", self.len, initial_derivative.len())?;
        self.step.step(initial, initial_derivative, h, out);
        Ok(())
    }
}
