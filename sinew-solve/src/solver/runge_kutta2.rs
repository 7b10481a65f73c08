use sinew_core::{DerivativeLaw, IntegrationError, StepLaw, ensure_len};

use super::{Solver, check_evaluation, check_solve};
use crate::scratch;

/// Second-order Runge–Kutta (midpoint) method.
///
/// ```text
/// D1    = f(S, t)
/// S_mid = step(S, D1, h/2)
/// D2    = f(S_mid, t + h/2)
/// S'    = step(S, D2, h)
/// ```
pub struct RungeKutta2<L: DerivativeLaw, P> {
    law: L,
    step: P,
    len: usize,
    initial_derivative: Vec<L::Derivative>,
    stages: Stages<L::State, L::Derivative>,
}

struct Stages<S, D> {
    midpoint: Vec<S>,
    midpoint_derivative: Vec<D>,
}

impl<L, P> RungeKutta2<L, P>
where
    L: DerivativeLaw,
    L::State: Clone + Default,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
{
    /// Creates a solver sized for `len` elements.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the scratch buffers cannot
    /// be allocated.
    pub fn new(law: L, step: P, len: usize) -> Result<Self, IntegrationError> {
        let mut solver = Self {
            law,
            step,
            len: 0,
            initial_derivative: Vec::new(),
            stages: Stages {
                midpoint: Vec::new(),
                midpoint_derivative: Vec::new(),
            },
        };
        solver.resize(len)?;
        Ok(solver)
    }

    /// Returns the derivative law.
    pub fn law(&self) -> &L {
        &self.law
    }
}

/// Runs the midpoint stages from an already evaluated initial derivative.
#[allow(clippy::too_many_arguments)]
fn advance<L, P>(
    law: &L,
    step: &P,
    stages: &mut Stages<L::State, L::Derivative>,
    model: &mut [L::Model],
    initial: &[L::State],
    initial_derivative: &[L::Derivative],
    t: f64,
    h: f64,
    out: &mut [L::State],
) -> Result<(), IntegrationError>
where
    L: DerivativeLaw,
    P: StepLaw<L::State, L::Derivative>,
{
    let h_half = 0.5 * h;

    step.step(initial, initial_derivative, h_half, &mut stages.midpoint);
    law.evaluate(
        model,
        &stages.midpoint,
        t + h_half,
        &mut stages.midpoint_derivative,
    )?;
    step.step(initial, &stages.midpoint_derivative, h, out);

    Ok(())
}

impl<L, P> Solver for RungeKutta2<L, P>
where
    L: DerivativeLaw,
    L::State: Clone + Default,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
{
    type Model = L::Model;
    type State = L::State;
    type Derivative = L::Derivative;

    fn order(&self) -> u32 {
        2
    }

    fn len(&self) -> usize {
        self.len
    }

    fn resize(&mut self, len: usize) -> Result<(), IntegrationError> {
        self.len = 0;
        scratch::resize(&mut self.initial_derivative, len)?;
        scratch::resize(&mut self.stages.midpoint, len)?;
        scratch::resize(&mut self.stages.midpoint_derivative, len)?;
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
        self.law
            .evaluate(model, initial, t, &mut self.initial_derivative)?;
        advance(
            &self.law,
            &self.step,
            &mut self.stages,
            model,
            initial,
            &self.initial_derivative,
            t,
            h,
            out,
        )
    }

    fn solve_from(
        &mut self,
        model: &mut [L::Model],
        initial: &[L::State],
        initial_derivative: &[L::Derivative],
        t: f64,
        h: f64,
        out: &mut [L::State],
    ) -> Result<(), IntegrationError> {
        check_solve(self.len, model, initial, h, out)?;
        ensure_len("initial derivative", self.len, initial_derivative.len())?;
        advance(
            &self.law,
            &self.step,
            &mut self.stages,
            model,
            initial,
            initial_derivative,
            t,
            h,
            out,
        )
    }
}
