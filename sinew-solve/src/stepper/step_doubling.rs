use sinew_core::{DifferencePredicate, GrowPolicy, IntegrationError, ShrinkPolicy, ensure_len};

use super::{Advance, AdaptiveConfig, Counters, ScaleGrow, ScaleShrink, Stepper, Verdict, judge};
use crate::{Solver, scratch};

/// Step-doubling control.
///
/// Each trial takes one full step of size `h` and, independently, two half
/// steps. The derivative at the start of the segment is evaluated once and
/// reused by every trial; the second half step evaluates its own derivative
/// at `t + h/2`. The two-half-step result is the one written to `out`.
pub struct StepDoubling<Sv: Solver, Sh, G, P> {
    solver: Sv,
    shrink: Sh,
    grow: G,
    predicate: P,
    initial_derivative: Vec<Sv::Derivative>,
    full: Vec<Sv::State>,
    half: Vec<Sv::State>,
    counters: Counters,
}

impl<Sv, P> StepDoubling<Sv, ScaleShrink, ScaleGrow, P>
where
    Sv: Solver,
    Sv::State: Clone + Default,
    Sv::Derivative: Clone + Default,
    P: DifferencePredicate<Sv::Model, Sv::State>,
{
    /// Creates a stepper using the scale policies described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidConfig`] if `config` is invalid, or
    /// [`IntegrationError::Allocation`] if the scratch buffers cannot be
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

impl<Sv, Sh, G, P> StepDoubling<Sv, Sh, G, P>
where
    Sv: Solver,
    Sv::State: Clone + Default,
    Sv::Derivative: Clone + Default,
    Sh: ShrinkPolicy,
    G: GrowPolicy,
    P: DifferencePredicate<Sv::Model, Sv::State>,
{
    /// Creates a stepper sized to match `solver`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the scratch buffers cannot
    /// be allocated.
    pub fn new(solver: Sv, shrink: Sh, grow: G, predicate: P) -> Result<Self, IntegrationError> {
        let len = solver.len();
        let mut stepper = Self {
            solver,
            shrink,
            grow,
            predicate,
            initial_derivative: Vec::new(),
            full: Vec::new(),
            half: Vec::new(),
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

impl<Sv, Sh, G, P> Stepper for StepDoubling<Sv, Sh, G, P>
where
    Sv: Solver,
    Sv::State: Clone + Default,
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
        let resized = self.solver.resize(len).and_then(|()| {
            scratch::resize(&mut self.initial_derivative, len)?;
            scratch::resize(&mut self.full, len)?;
            scratch::resize(&mut self.half, len)
        });
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
            let h_half = 0.5 * h;

            self.solver
                .solve_from(model, initial, &self.initial_derivative, t, h, &mut self.full)?;
            self.solver.solve_from(
                model,
                initial,
                &self.initial_derivative,
                t,
                h_half,
                &mut self.half,
            )?;
            self.solver.solve(model, &self.half, t + h_half, h_half, out)?;

            let different = self.predicate.is_different(model, &self.full, out, t);
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
