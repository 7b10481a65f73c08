mod action;
mod event;
mod solution;

pub use action::Action;
pub use event::Event;
pub use solution::{Solution, Status};

use sinew_core::{IntegrationError, Observer};

use super::Drive;
use crate::Accuracy;

/// Ticks `driver` until its date reaches `end`.
///
/// # Algorithm
///
/// 1. Emit tick 0 with the starting date.
/// 2. While the date is before `end`:
///    - Advance the state by one driver tick.
///    - Emit an [`Event`] to the observer.
///    - If the observer returns `StopEarly`, terminate.
/// 3. Return the solution with the final date and tick count.
///
/// The last tick may overshoot `end`; drivers never clip their step.
///
/// # Errors
///
/// Returns [`IntegrationError::InvalidConfig`] if `end` is not finite, or any
/// error raised by the driver. The state holds the last completed tick.
pub fn run_until<Dr, Obs>(
    driver: &mut Dr,
    model: &mut [Dr::Model],
    state: &mut [Dr::State],
    end: f64,
    mut observer: Obs,
) -> Result<Solution, IntegrationError>
where
    Dr: Drive,
    Obs: Observer<Event, Action>,
{
    if !end.is_finite() {
        return Err(IntegrationError::InvalidConfig {
            reason: "end date must be finite",
        });
    }

    let start = Event {
        tick: 0,
        date: driver.date(),
        step: 0.0,
        accuracy: Accuracy::Met,
    };
    if let Some(Action::StopEarly) = observer.observe(&start) {
        return Ok(Solution {
            status: Status::StoppedByObserver,
            ticks: 0,
            date: driver.date(),
            degraded: 0,
        });
    }

    let mut ticks = 0;
    let mut degraded = 0;

    while driver.date() < end {
        let tick = driver.tick(model, state)?;
        ticks += 1;
        if tick.accuracy == Accuracy::Degraded {
            degraded += 1;
        }

        let event = Event {
            tick: ticks,
            date: driver.date(),
            step: tick.step,
            accuracy: tick.accuracy,
        };
        if let Some(Action::StopEarly) = observer.observe(&event) {
            return Ok(Solution {
                status: Status::StoppedByObserver,
                ticks,
                date: driver.date(),
                degraded,
            });
        }
    }

    Ok(Solution {
        status: Status::Complete,
        ticks,
        date: driver.date(),
        degraded,
    })
}

/// Ticks `driver` until its date reaches `end` without observation.
///
/// This is a convenience wrapper around [`run_until`] that discards events.
///
/// # Errors
///
/// Returns [`IntegrationError::InvalidConfig`] if `end` is not finite, or any
/// error raised by the driver.
pub fn run_until_unobserved<Dr>(
    driver: &mut Dr,
    model: &mut [Dr::Model],
    state: &mut [Dr::State],
    end: f64,
) -> Result<Solution, IntegrationError>
where
    Dr: Drive,
{
    run_until(driver, model, state, end, ())
}
