use std::ops::{Add, Mul};

use sinew_core::{DerivativeLaw, IntegrationError, StepLaw, ensure_len};

use super::{Solver, check_evaluation, check_solve};
use crate::scratch;

/// Classic fourth-order Runge–Kutta method.
///
/// ```text
/// D1 = f(S, t)
/// D2 = f(step(S, D1, h/2), t + h/2)
/// D3 = f(step(S, D2, h/2), t + h/2)
/// D4 = f(step(S, D3, h),   t + h)
/// S' = step(S, D1 + 2 (D2 + D3) + D4, h/6)
/// ```
///
/// The weighted sum is formed on derivatives, so the derivative type must
/// support `+` and scaling by `f64`.
pub struct RungeKutta4<L: DerivativeLaw, P> {
    law: L,
    step: P,
    len: usize,
    initial_derivative: Vec<L::Derivative>,
    stages: Stages<L::State, L::Derivative>,
}

struct Stages<S, D> {
    trial: Vec<S>,
    second: Vec<D>,
    third: Vec<D>,
    fourth: Vec<D>,
    weighted: Vec<D>,
}

impl<L, P> RungeKutta4<L, P>
where
    L: DerivativeLaw,
    L::State: Clone + Default,
    L::Derivative: Clone + Default + Add<Output = L::Derivative> + Mul<f64, Output = L::Derivative>,
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
                trial: Vec::new(),
                second: Vec::new(),
                third: Vec::new(),
                fourth: Vec::new(),
                weighted: Vec::new(),
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

#[allow(clippy::too_many_arguments)]
fn advance<L, P>(
    law: &L,
    step: &P,
    stages: &mut Stages<L::State, L::Derivative>,
    model: &mut [L::Model],
    initial: &[L::State],
    first: &[L::Derivative],
    t: f64,
    h: f64,
    out: &mut [L::State],
) -> Result<(), IntegrationError>
where
    L: DerivativeLaw,
    L::Derivative: Clone + Add<Output = L::Derivative> + Mul<f64, Output = L::Derivative>,
    P: StepLaw<L::State, L::Derivative>,
{
    let h_half = 0.5 * h;

    step.step(initial, first, h_half, &mut stages.trial);
    law.evaluate(model, &stages.trial, t + h_half, &mut stages.second)?;

    step.step(initial, &stages.second, h_half, &mut stages.trial);
    law.evaluate(model, &stages.trial, t + h_half, &mut stages.third)?;

    step.step(initial, &stages.third, h, &mut stages.trial);
    law.evaluate(model, &stages.trial, t + h, &mut stages.fourth)?;

    let weights = first
        .iter()
        .zip(&stages.second)
        .zip(&stages.third)
        .zip(&stages.fourth);
    for (sum, (((d1, d2), d3), d4)) in stages.weighted.iter_mut().zip(weights) {
        *sum = d1.clone() + (d2.clone() + d3.clone()) * 2.0 + d4.clone();
    }

    step.step(initial, &stages.weighted, h / 6.0, out);
    Ok(())
}

impl<L, P> Solver for RungeKutta4<L, P>
where
    L: DerivativeLaw,
    L::State: Clone + Default,
    L::Derivative: Clone + Default + Add<Output = L::Derivative> + Mul<f64, Output = L::Derivative>,
    P: StepLaw<L::State, L::Derivative>,
{
    type Model = L::Model;
    type State = L::State;
    type Derivative = L::Derivative;

    fn order(&self) -> u32 {
        4
    }

    fn len(&self) -> usize {
        self.len
    }

    fn resize(&mut self, len: usize) -> Result<(), IntegrationError> {
        self.len = 0;
        scratch::resize(&mut self.initial_derivative, len)?;
        scratch::resize(&mut self.stages.trial, len)?;
        scratch::resize(&mut self.stages.second, len)?;
        scratch::resize(&mut self.stages.third, len)?;
        scratch::resize(&mut self.stages.fourth, len)?;
        scratch::resize(&mut self.stages.weighted, len)?;
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

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use sinew_core::LinearStep;

    use crate::solver::fixtures::{Exponential, Ramp};

    #[test]
    fn single_step_matches_taylor_expansion() {
        let mut solver = RungeKutta4::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();
        let mut out = [0.0];
        let h: f64 = 0.1;

        solver.solve(&mut [()], &[1.0], 0.0, h, &mut out).unwrap();

        let expected = 1.0 - h + h.powi(2) / 2.0 - h.powi(3) / 6.0 + h.powi(4) / 24.0;
        assert_relative_eq!(out[0], expected, epsilon = 1e-15);
    }

    #[test]
    fn evaluates_four_times_per_step() {
        let mut solver = RungeKutta4::new(Ramp, LinearStep, 1).unwrap();
        let mut calls = [0];
        let mut out = [0.0];

        solver.solve(&mut calls, &[0.0], 0.0, 1.0, &mut out).unwrap();

        assert_eq!(calls[0], 4);
        assert_relative_eq!(out[0], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn solve_from_skips_the_first_evaluation() {
        let mut solver = RungeKutta4::new(Ramp, LinearStep, 1).unwrap();
        let mut calls = [0];
        let mut out = [0.0];

        solver
            .solve_from(&mut calls, &[0.0], &[0.0], 0.0, 1.0, &mut out)
            .unwrap();

        assert_eq!(calls[0], 3);
        assert_relative_eq!(out[0], 0.5, epsilon = 1e-15);
    }

    #[test]
    fn nan_propagates_silently() {
        let mut solver = RungeKutta4::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();
        let mut out = [0.0];

        solver
            .solve(&mut [()], &[f64::NAN], 0.0, 0.1, &mut out)
            .expect("solvers do not inspect values");
        assert!(out[0].is_nan());

        solver
            .solve(&mut [()], &[f64::INFINITY], 0.0, 0.1, &mut out)
            .expect("solvers do not inspect values");
        assert!(!out[0].is_finite());
    }

    #[test]
    fn failed_resize_leaves_an_empty_solver() {
        let mut solver = RungeKutta4::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();

        let err = solver.resize(usize::MAX).unwrap_err();
        assert_eq!(err, IntegrationError::Allocation { len: usize::MAX });
        assert_eq!(solver.len(), 0);

        let mut out = [0.0];
        assert!(matches!(
            solver.solve(&mut [()], &[1.0], 0.0, 0.1, &mut out),
            Err(IntegrationError::Cardinality { .. })
        ));

        solver.resize(1).unwrap();
        solver.solve(&mut [()], &[1.0], 0.0, 0.1, &mut out).unwrap();
        assert_relative_eq!(out[0], (-0.1_f64).exp(), epsilon = 1e-6);
    }
}
