use sinew_core::{IntegrationError, ensure_len};

use super::{Drive, Tick};
use crate::{Accuracy, Solver, scratch};

/// Advances the date by a constant `time_step` on every tick.
pub struct FixedStepDriver<Sv: Solver> {
    solver: Sv,
    date: f64,
    time_step: f64,
    origin: Vec<Sv::State>,
}

impl<Sv> FixedStepDriver<Sv>
where
    Sv: Solver,
    Sv::State: Clone + Default,
{
    /// Creates a driver starting at `date`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidStep`] if `time_step` is not finite
    /// and positive, or [`IntegrationError::Allocation`] if the scratch
    /// buffer cannot be allocated.
    pub fn new(solver: Sv, date: f64, time_step: f64) -> Result<Self, IntegrationError> {
        IntegrationError::check_step(time_step)?;
        let len = solver.len();
        let mut driver = Self {
            solver,
            date,
            time_step,
            origin: Vec::new(),
        };
        scratch::resize(&mut driver.origin, len)?;
        Ok(driver)
    }

    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    pub fn solver(&self) -> &Sv {
        &self.solver
    }
}

impl<Sv> Drive for FixedStepDriver<Sv>
where
    Sv: Solver,
    Sv::State: Clone + Default,
{
    type Model = Sv::Model;
    type State = Sv::State;

    fn tick(
        &mut self,
        model: &mut [Sv::Model],
        state: &mut [Sv::State],
    ) -> Result<Tick, IntegrationError> {
        ensure_len("state", self.origin.len(), state.len())?;
        self.origin.clone_from_slice(state);

        if let Err(err) = self
            .solver
            .solve(model, &self.origin, self.date, self.time_step, state)
        {
            state.clone_from_slice(&self.origin);
            return Err(err);
        }
        self.date += self.time_step;

        tracing::trace!(date = self.date, step = self.time_step, "tick");
        Ok(Tick {
            step: self.time_step,
            rejected: 0,
            accuracy: Accuracy::Met,
        })
    }

    fn date(&self) -> f64 {
        self.date
    }

    fn resize(&mut self, len: usize) -> Result<(), IntegrationError> {
        self.solver.resize(len)?;
        scratch::resize(&mut self.origin, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use sinew_core::LinearStep;

    use crate::{
        Euler, RungeKutta4,
        solver::fixtures::{Constant, FailsFrom},
    };

    #[test]
    fn ticks_advance_date_and_state() {
        let solver = Euler::new(Constant { value: 2.0 }, LinearStep, 1).unwrap();
        let mut driver = FixedStepDriver::new(solver, 1.0, 0.25).unwrap();
        let mut state = [0.0];

        for _ in 0..4 {
            driver.tick(&mut [()], &mut state).unwrap();
        }

        assert_relative_eq!(driver.date(), 2.0);
        assert_relative_eq!(state[0], 2.0);
    }

    #[test]
    fn stale_size_is_rejected_until_resized() {
        let solver = Euler::new(Constant { value: 1.0 }, LinearStep, 1).unwrap();
        let mut driver = FixedStepDriver::new(solver, 0.0, 0.1).unwrap();
        let mut state = [0.0, 0.0];

        let err = driver.tick(&mut [(), ()], &mut state).unwrap_err();
        assert!(matches!(err, IntegrationError::Cardinality { .. }));
        assert_relative_eq!(driver.date(), 0.0);

        driver.resize(2).unwrap();
        driver.tick(&mut [(), ()], &mut state).unwrap();
        assert_relative_eq!(state[1], 0.1);
    }

    #[test]
    fn zero_time_step_is_rejected() {
        let solver = Euler::new(Constant { value: 1.0 }, LinearStep, 1).unwrap();
        assert!(matches!(
            FixedStepDriver::new(solver, 0.0, 0.0),
            Err(IntegrationError::InvalidStep { .. })
        ));
    }

    #[test]
    fn failed_solve_leaves_date_and_state() {
        let solver = RungeKutta4::new(FailsFrom::new(3), LinearStep, 1).unwrap();
        let mut driver = FixedStepDriver::new(solver, 2.0, 0.1).unwrap();
        let mut state = [4.0];

        let err = driver.tick(&mut [()], &mut state).unwrap_err();

        assert_eq!(err, IntegrationError::NonFiniteDerivative { index: 0 });
        assert_eq!(driver.date(), 2.0);
        assert_eq!(state, [4.0]);
    }
}
