//! Step laws for particle states.
//!
//! Every law copies `Fixed` particles through unchanged.

use sinew_core::StepLaw;

use crate::{ParticleDerivative, ParticleState};

/// Position-Verlet style update used by the Störmer scheme.
///
/// `v' = v + h²·a` and `x' = x + v'`. Velocities are displacements per step,
/// so `h` scales accelerations only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoermerStep;

/// Plain explicit update: `x' = x + h·ẋ` and `v' = v + h·a`.
///
/// Unlike [`StoermerStep`], velocities are physical, so the update is the
/// forward Euler map of the state and the solvers reach their nominal order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KinematicStep;

/// Semi-analytic update: `v' = v + h·a` and `x' = x + h·ẋ + ½h²·a`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifiedEulerStep;

fn for_each_moving(
    initial: &[ParticleState],
    derivative: &[ParticleDerivative],
    out: &mut [ParticleState],
    mut update: impl FnMut(&ParticleState, &ParticleDerivative) -> ParticleState,
) {
    for ((out, s), d) in out.iter_mut().zip(initial).zip(derivative) {
        *out = if s.constraint.is_fixed() {
            *s
        } else {
            update(s, d)
        };
    }
}

impl StepLaw<ParticleState, ParticleDerivative> for StoermerStep {
    fn step(
        &self,
        initial: &[ParticleState],
        derivative: &[ParticleDerivative],
        h: f64,
        out: &mut [ParticleState],
    ) {
        let sqh = h * h;
        for_each_moving(initial, derivative, out, |s, d| {
            let vel = s.vel + sqh * d.acc;
            ParticleState {
                vel,
                pos: s.pos + vel,
                constraint: s.constraint,
            }
        });
    }
}

impl StepLaw<ParticleState, ParticleDerivative> for KinematicStep {
    fn step(
        &self,
        initial: &[ParticleState],
        derivative: &[ParticleDerivative],
        h: f64,
        out: &mut [ParticleState],
    ) {
        for_each_moving(initial, derivative, out, |s, d| ParticleState {
            vel: s.vel + h * d.acc,
            pos: s.pos + h * d.vel,
            constraint: s.constraint,
        });
    }
}

impl StepLaw<ParticleState, ParticleDerivative> for ModifiedEulerStep {
    fn step(
        &self,
        initial: &[ParticleState],
        derivative: &[ParticleDerivative],
        h: f64,
        out: &mut [ParticleState],
    ) {
        let half_sqh = 0.5 * h * h;
        for_each_moving(initial, derivative, out, |s, d| ParticleState {
            vel: s.vel + h * d.acc,
            pos: s.pos + h * d.vel + half_sqh * d.acc,
            constraint: s.constraint,
        });
    }
}
