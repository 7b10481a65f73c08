use sinew_core::{IntegrationError, ensure_len};

use super::{Drive, Tick};
use crate::{Stepper, scratch};

/// Advances the date by whatever step the stepper accomplished.
///
/// After each tick the stepper's suggested next step becomes the next trial
/// step.
pub struct AdaptiveDriver<St: Stepper> {
    stepper: St,
    date: f64,
    step_try: f64,
    step_did: f64,
    step_next: f64,
    origin: Vec<St::State>,
}

impl<St> AdaptiveDriver<St>
where
    St: Stepper,
    St::State: Clone + Default,
{
    /// Creates a driver starting at `date` with a first trial step `step_try`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidStep`] if `step_try` is not finite
    /// and positive, or [`IntegrationError::Allocation`] if the scratch
    /// buffer cannot be allocated.
    pub fn new(stepper: St, date: f64, step_try: f64) -> Result<Self, IntegrationError> {
        IntegrationError::check_step(step_try)?;
        let len = stepper.len();
        let mut driver = Self {
            stepper,
            date,
            step_try,
            step_did: 0.0,
            step_next: 0.0,
            origin: Vec::new(),
        };
        scratch::resize(&mut driver.origin, len)?;
        Ok(driver)
    }

    /// Step size that will be tried on the next tick.
    pub fn step_try(&self) -> f64 {
        self.step_try
    }

    /// Step size accomplished by the last tick.
    pub fn step_did(&self) -> f64 {
        self.step_did
    }

    /// Step size suggested by the last tick.
    pub fn step_next(&self) -> f64 {
        self.step_next
    }

    pub fn stepper(&self) -> &St {
        &self.stepper
    }

    pub fn stepper_mut(&mut self) -> &mut St {
        &mut self.stepper
    }
}

impl<St> Drive for AdaptiveDriver<St>
where
    St: Stepper,
    St::State: Clone + Default,
{
    type Model = St::Model;
    type State = St::State;

    fn tick(
        &mut self,
        model: &mut [St::Model],
        state: &mut [St::State],
    ) -> Result<Tick, IntegrationError> {
        ensure_len("state", self.origin.len(), state.len())?;
        self.origin.clone_from_slice(state);

        let advance = match self
            .stepper
            .step(model, &self.origin, self.date, self.step_try, state)
        {
            Ok(advance) => advance,
            Err(err) => {
                state.clone_from_slice(&self.origin);
                return Err(err);
            }
        };

        self.date += advance.did;
        self.step_did = advance.did;
        self.step_next = advance.next;
        self.step_try = advance.next;

        tracing::trace!(
            date = self.date,
            step = advance.did,
            next = advance.next,
            rejected = advance.rejected,
            "tick"
        );
        Ok(Tick {
            step: advance.did,
            rejected: advance.rejected,
            accuracy: advance.accuracy,
        })
    }

    fn date(&self) -> f64 {
        self.date
    }

    fn resize(&mut self, len: usize) -> Result<(), IntegrationError> {
        self.stepper.resize(len)?;
        scratch::resize(&mut self.origin, len)
    }
}
