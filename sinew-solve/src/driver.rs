//! Drivers own the simulation date and advance a state once per tick.
//!
//! - [`FixedStepDriver`] calls a [`Solver`](crate::Solver) with a constant
//!   time step.
//! - [`AdaptiveDriver`] calls a [`Stepper`](crate::Stepper) and carries its
//!   suggested step into the next tick.
//!
//! Both update the state in place: the driver keeps a copy of the state
//! taken at the start of the tick and integrates from it. [`run_until`]
//! repeats ticks until a target date is reached.

mod adaptive;
mod fixed;
mod run;

pub use adaptive::AdaptiveDriver;
pub use fixed::FixedStepDriver;
pub use run::{Action, Event, Solution, Status, run_until, run_until_unobserved};

use sinew_core::IntegrationError;

use crate::Accuracy;

/// Summary of one driver tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// Time advanced by this tick.
    pub step: f64,

    /// Trials rejected before the tick was accepted.
    pub rejected: usize,

    pub accuracy: Accuracy,
}

/// Advances a simulation one tick at a time.
pub trait Drive {
    type Model;
    type State;

    /// Advances `state` in place by one tick and moves the date forward.
    ///
    /// # Errors
    ///
    /// Returns an error if `state` or `model` do not match the driver's
    /// cardinality, or if integration fails. The date and `state` are left
    /// unchanged on error.
    fn tick(
        &mut self,
        model: &mut [Self::Model],
        state: &mut [Self::State],
    ) -> Result<Tick, IntegrationError>;

    /// Current simulation date.
    fn date(&self) -> f64;

    /// Reallocates all scratch buffers for `len` elements.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::Allocation`] if the buffers cannot grow.
    fn resize(&mut self, len: usize) -> Result<(), IntegrationError>;
}
