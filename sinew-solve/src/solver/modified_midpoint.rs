use std::{
    mem,
    ops::{Add, Mul},
};

use sinew_core::{DerivativeLaw, IntegrationError, StepLaw, SubstepPolicy, ensure_len};

use super::{Solver, check_evaluation, check_solve};
use crate::scratch;

/// Substep policy that always returns the same count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantSubsteps(pub usize);

impl Default for ConstantSubsteps {
    fn default() -> Self {
        Self(3)
    }
}

impl<M, S> SubstepPolicy<M, S> for ConstantSubsteps {
    fn substeps(&self, _model: &[M], _state: &[S], _t: f64) -> usize {
        self.0
    }
}

/// Modified midpoint method over `N` substeps.
///
/// With `z0 = S` and `hs = h / N`:
///
/// ```text
/// z1      = step(z0, f(z0, t), hs)
/// z(m+1)  = step(z(m-1), f(z(m), t + m hs), 2 hs)      for m = 1..N-1
/// S'      = blend(z(N-1), zN, f(zN, t + h), hs)
/// ```
///
/// The default [`StepLaw::blend`] gives `0.5 (z(N-1) + zN + hs f(zN))`.
/// No Richardson extrapolation is applied. `N` comes from a
/// [`SubstepPolicy`] and must be at least 2.
pub struct ModifiedMidpoint<L: DerivativeLaw, P, N = ConstantSubsteps> {
    law: L,
    step: P,
    substeps: N,
    len: usize,
    initial_derivative: Vec<L::Derivative>,
    stages: Stages<L::State, L::Derivative>,
}

struct Stages<S, D> {
    previous: Vec<S>,
    current: Vec<S>,
    next: Vec<S>,
    derivative: Vec<D>,
}

impl<L, P> ModifiedMidpoint<L, P>
where
    L: DerivativeLaw,
    L::State: Clone + Default + Add<Output = L::State> + Mul<f64, Output = L::State>,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
{
    /// Creates a solver with three substeps, sized for `len` elements.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the scratch buffers cannot
    /// be allocated.
    pub fn new(law: L, step: P, len: usize) -> Result<Self, IntegrationError> {
        Self::with_substeps(law, step, ConstantSubsteps::default(), len)
    }
}

impl<L, P, N> ModifiedMidpoint<L, P, N>
where
    L: DerivativeLaw,
    L::State: Clone + Default + Add<Output = L::State> + Mul<f64, Output = L::State>,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
    N: SubstepPolicy<L::Model, L::State>,
{
    /// Creates a solver whose substep count is chosen by `substeps`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the scratch buffers cannot
    /// be allocated.
    pub fn with_substeps(
        law: L,
        step: P,
        substeps: N,
        len: usize,
    ) -> Result<Self, IntegrationError> {
        let mut solver = Self {
            law,
            step,
            substeps,
            len: 0,
            initial_derivative: Vec::new(),
            stages: Stages {
                previous: Vec::new(),
                current: Vec::new(),
                next: Vec::new(),
                derivative: Vec::new(),
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
    substeps: usize,
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
    L::State: Clone + Add<Output = L::State> + Mul<f64, Output = L::State>,
    P: StepLaw<L::State, L::Derivative>,
{
    if substeps < 2 {
        return Err(IntegrationError::InvalidSubsteps { substeps });
    }

    #[allow(clippy::cast_precision_loss)]
    let h_sub = h / substeps as f64;
    let h_leap = 2.0 * h_sub;

    let Stages {
        previous,
        current,
        next,
        derivative,
    } = stages;

    previous.clone_from_slice(initial);
    step.step(previous, initial_derivative, h_sub, current);

    for m in 1..substeps - 1 {
        #[allow(clippy::cast_precision_loss)]
        let t_m = t + m as f64 * h_sub;
        law.evaluate(model, current, t_m, derivative)?;
        step.step(previous, derivative, h_leap, next);
        mem::swap(previous, current);
        mem::swap(current, next);
    }

    #[allow(clippy::cast_precision_loss)]
    let t_last = t + (substeps - 1) as f64 * h_sub;
    law.evaluate(model, current, t_last, derivative)?;
    step.step(previous, derivative, h_leap, next);

    law.evaluate(model, next, t + h, derivative)?;
    step.blend(current, next, derivative, h_sub, out);

    Ok(())
}

impl<L, P, N> Solver for ModifiedMidpoint<L, P, N>
where
    L: DerivativeLaw,
    L::State: Clone + Default + Add<Output = L::State> + Mul<f64, Output = L::State>,
    L::Derivative: Clone + Default,
    P: StepLaw<L::State, L::Derivative>,
    N: SubstepPolicy<L::Model, L::State>,
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
        scratch::resize(&mut self.stages.previous, len)?;
        scratch::resize(&mut self.stages.current, len)?;
        scratch::resize(&mut self.stages.next, len)?;
        scratch::resize(&mut self.stages.derivative, len)?;
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
        let substeps = self.substeps.substeps(model, initial, t);
        advance(
            &self.law,
            &self.step,
            substeps,
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
        let substeps = self.substeps.substeps(model, initial, t);
        advance(
            &self.law,
            &self.step,
            substeps,
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

    /// Reference implementation of the modified midpoint recurrence for `y' = -y`.
    fn decay_reference(y0: f64, h: f64, n: usize) -> f64 {
        let hs = h / n as f64;
        let f = |y: f64| -y;
        let mut z_prev = y0;
        let mut z = y0 + hs * f(y0);
        for _ in 1..n {
            let z_next = z_prev + 2.0 * hs * f(z);
            z_prev = z;
            z = z_next;
        }
        0.5 * (z_prev + (z + hs * f(z)))
    }

    #[test]
    fn matches_the_recurrence_with_default_substeps() {
        let mut solver = ModifiedMidpoint::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();
        let mut out = [0.0];

        solver.solve(&mut [()], &[1.0], 0.0, 0.3, &mut out).unwrap();

        assert_relative_eq!(out[0], decay_reference(1.0, 0.3, 3), epsilon = 1e-15);
    }

    #[test]
    fn matches_the_recurrence_with_other_substep_counts() {
        for n in [2, 4, 7] {
            let mut solver = ModifiedMidpoint::with_substeps(
                Exponential { rate: -1.0 },
                LinearStep,
                ConstantSubsteps(n),
                1,
            )
            .unwrap();
            let mut out = [0.0];

            solver.solve(&mut [()], &[1.0], 0.0, 0.2, &mut out).unwrap();

            assert_relative_eq!(out[0], decay_reference(1.0, 0.2, n), epsilon = 1e-15);
        }
    }

    #[test]
    fn evaluates_once_per_substep_plus_one() {
        let mut solver =
            ModifiedMidpoint::with_substeps(Ramp, LinearStep, ConstantSubsteps(4), 1).unwrap();
        let mut calls = [0];
        let mut out = [0.0];

        solver.solve(&mut calls, &[0.0], 0.0, 1.0, &mut out).unwrap();

        assert_eq!(calls[0], 5);
    }

    #[test]
    fn fewer_than_two_substeps_is_an_error() {
        let mut solver = ModifiedMidpoint::with_substeps(
            Exponential { rate: -1.0 },
            LinearStep,
            ConstantSubsteps(1),
            1,
        )
        .unwrap();
        let mut out = [0.0];

        let err = solver
            .solve(&mut [()], &[1.0], 0.0, 0.1, &mut out)
            .unwrap_err();

        assert_eq!(err, IntegrationError::InvalidSubsteps { substeps: 1 });
    }

    #[test]
    fn substep_count_can_depend_on_the_state() {
        let policy = |_: &[()], state: &[f64], _: f64| if state[0] > 0.5 { 6_usize } else { 2 };
        let mut solver =
            ModifiedMidpoint::with_substeps(Exponential { rate: -1.0 }, LinearStep, policy, 1)
                .unwrap();
        let mut out = [0.0];

        solver.solve(&mut [()], &[1.0], 0.0, 0.3, &mut out).unwrap();

        assert_relative_eq!(out[0], decay_reference(1.0, 0.3, 6), epsilon = 1e-15);
    }

    #[test]
    fn nan_propagates_silently() {
        let mut solver = ModifiedMidpoint::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();
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
}
