use sinew_core::{DifferencePredicate, GrowPolicy, IntegrationError, ShrinkPolicy, ensure_len};

use super::{Advance, AdaptiveConfig, Counters, ScaleGrow, ScaleShrink, Stepper, Verdict, judge};
use crate::{Solver, scratch};

/// Back-and-forth control.
///
/// Each trial takes a single step; the predicate compares the state after
/// the step with the state before it, typically through a conserved
/// quantity such as total energy.
pub struct BackAndForth<Sv: Solver, Sh, G, P> {
    solver: Sv,
    shrink: Sh,
    grow: G,
    predicate: P,
    initial_derivative: Vec<Sv::Derivative>,
    counters: Counters,
}

impl<Sv, P> BackAndForth<Sv, ScaleShrink, ScaleGrow, P>
where
    Sv: Solver,
    Sv::Derivative: Clone + Default,
    P: DifferencePredicate<Sv::Model, Sv::State>,
{
    /// Creates a stepper using the scale policies described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidConfig`] if `config` is invalid, or
    /// [`IntegrationError::Allocation`] if the scratch buffer cannot be
    /// allocated.
    pub fn with_config(
        solver: Sv,
        config: &AdaptiveConfig,
        predicate: P,
    ) -> Result<Self, IntegrationError> {
        config
            .validate()
            .map_err(|reason| IntegrationError::InvalidConfig { reason })?;
        Self::new(solver, config.shrink_policy(), config.grow_policy(), predicate)
    }
}

impl<Sv, Sh, G, P> BackAndForth<Sv, Sh, G, P>
where
    Sv: Solver,
    Sv::Derivative: Clone + Default,
    Sh: ShrinkPolicy,
    G: GrowPolicy,
    P: DifferencePredicate<Sv::Model, Sv::State>,
{
    /// Creates a stepper sized to match `solver`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the scratch buffer cannot
    /// be allocated.
    pub fn new(solver: Sv, shrink: Sh, grow: G, predicate: P) -> Result<Self, IntegrationError> {
        let len = solver.len();
        let mut stepper = Self {
            solver,
            shrink,
            grow,
            predicate,
            initial_derivative: Vec::new(),
            counters: Counters::default(),
        };
        stepper.resize(len)?;
        Ok(stepper)
    }

    /// Returns the wrapped solver.
    pub fn solver(&self) -> &Sv {
        &self.solver
    }
}

impl<Sv, Sh, G, P> Stepper for BackAndForth<Sv, Sh, G, P>
where
    Sv: Solver,
    Sv::Derivative: Clone + Default,
    Sh: ShrinkPolicy,
    G: GrowPolicy,
    P: DifferencePredicate<Sv::Model, Sv::State>,
{
    type Model = Sv::Model;
    type State = Sv::State;
    type Derivative = Sv::Derivative;

    fn len(&self) -> usize {
        self.solver.len()
    }

    fn resize(&mut self, len: usize) -> Result<(), IntegrationError> {
        let resized = self
            .solver
            .resize(len)
            .and_then(|()| scratch::resize(&mut self.initial_derivative, len));
        if resized.is_err() {
            self.solver.resize(0)?;
        }
        resized
    }

    fn step(
        &mut self,
        model: &mut [Sv::Model],
        initial: &[Sv::State],
        t: f64,
        h_try: f64,
        out: &mut [Sv::State],
    ) -> Result<Advance, IntegrationError> {
        IntegrationError::check_step(h_try)?;
        ensure_len("final state", self.len(), out.len())?;
        self.solver
            .derivative(model, initial, t, &mut self.initial_derivative)?;

        let mut h = h_try;
        let mut rejected = 0;

        loop {
            self.solver
                .solve_from(model, initial, &self.initial_derivative, t, h, out)?;

            let different = self.predicate.is_different(model, initial, out, t);
            match judge(
                different,
                t,
                h,
                &mut rejected,
                &mut self.counters,
                &self.shrink,
                &self.grow,
            ) {
                Verdict::Accept(advance) => return Ok(advance),
                Verdict::Retry(smaller) => h = smaller,
            }
        }
    }

    fn counters(&self) -> Counters {
        self.counters
    }

    fn reset_counters(&mut self) {
        self.counters = Counters::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use sinew_core::LinearStep;

    use crate::{
        Accuracy, RungeKutta2,
        solver::fixtures::{Constant, Exponential},
    };

    /// Flags any element that moved by more than `tolerance`.
    fn moved(tolerance: f64) -> impl Fn(&[()], &[f64], &[f64], f64) -> bool {
        move |_: &[()], before: &[f64], after: &[f64], _: f64| {
            before
                .iter()
                .zip(after)
                .any(|(a, b)| (a - b).abs() > tolerance)
        }
    }

    #[test]
    fn small_change_is_accepted_and_grows() {
        let solver = RungeKutta2::new(Constant { value: 0.1 }, LinearStep, 1).unwrap();
        let mut stepper =
            BackAndForth::with_config(solver, &AdaptiveConfig::default(), moved(0.05)).unwrap();
        let mut out = [0.0];

        let advance = stepper.step(&mut [()], &[1.0], 0.0, 0.2, &mut out).unwrap();

        assert_eq!(advance.accuracy, Accuracy::Met);
        assert_eq!(advance.rejected, 0);
        assert_relative_eq!(advance.next, 0.2 * 1.259_921);
        assert_relative_eq!(out[0], 1.02);
    }

    #[test]
    fn large_change_shrinks_the_step() {
        let solver = RungeKutta2::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();
        let mut stepper =
            BackAndForth::with_config(solver, &AdaptiveConfig::default(), moved(0.01)).unwrap();
        let mut out = [0.0];

        let advance = stepper.step(&mut [()], &[1.0], 0.0, 0.16, &mut out).unwrap();

        // 0.16 -> 0.08 -> 0.04 -> 0.02 -> 0.01
        assert_eq!(advance.rejected, 4);
        assert_relative_eq!(advance.did, 0.01);
        assert!((1.0 - out[0]).abs() <= 0.01);
    }

    #[test]
    fn rejects_a_non_finite_trial_step() {
        let solver = RungeKutta2::new(Exponential { rate: -1.0 }, LinearStep, 1).unwrap();
        let mut stepper =
            BackAndForth::with_config(solver, &AdaptiveConfig::default(), moved(0.01)).unwrap();
        let mut out = [0.0];

        let err = stepper
            .step(&mut [()], &[1.0], 0.0, f64::INFINITY, &mut out)
            .unwrap_err();

        assert!(matches!(err, IntegrationError::InvalidStep { .. }));
    }
}
