//! Energy measures and difference predicates for adaptive stepping.

use sinew_core::{DifferencePredicate, IntegrationError};

use crate::{Particle, ParticleState, Spring};

/// Total kinetic energy `Σ ½ m |v|²`.
pub fn kinetic_energy(model: &[Particle], state: &[ParticleState]) -> f64 {
    model
        .iter()
        .zip(state)
        .map(|(p, s)| 0.5 * p.mass() * s.vel.norm_squared())
        .sum()
}

/// Kinetic energy plus the elastic energy stored in `springs`.
///
/// # Errors
///
/// Returns [`IntegrationError::IndexOutOfRange`] if a spring references a
/// missing particle.
pub fn mechanical_energy(
    model: &[Particle],
    state: &[ParticleState],
    springs: &[Spring],
) -> Result<f64, IntegrationError> {
    springs.iter().try_fold(kinetic_energy(model, state), |total, spring| {
        Ok(total + spring.potential_energy(state)?)
    })
}

/// Flags two states as different when any particle drifted in phase space.
///
/// A particle has drifted when any component of `½ (Δx + Δv)` exceeds
/// `tolerance` in magnitude. A NaN anywhere counts as a drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseDrift {
    pub tolerance: f64,
}

impl DifferencePredicate<Particle, ParticleState> for PhaseDrift {
    fn is_different(
        &self,
        _model: &[Particle],
        a: &[ParticleState],
        b: &[ParticleState],
        _t: f64,
    ) -> bool {
        a.iter().zip(b).any(|(a, b)| {
            let delta = 0.5 * ((a.pos - b.pos) + (a.vel - b.vel));
            delta.iter().any(|c| !(c.abs() <= self.tolerance))
        })
    }
}

/// Flags two states as different when an energy measure disagrees.
///
/// Typical measures are [`kinetic_energy`] or a closure over
/// [`mechanical_energy`]. A NaN energy counts as a disagreement.
#[derive(Debug, Clone, Copy)]
pub struct EnergyDrift<E> {
    pub tolerance: f64,
    pub energy: E,
}

impl<E> DifferencePredicate<Particle, ParticleState> for EnergyDrift<E>
where
    E: Fn(&[Particle], &[ParticleState]) -> f64,
{
    fn is_different(
        &self,
        model: &[Particle],
        a: &[ParticleState],
        b: &[ParticleState],
        _t: f64,
    ) -> bool {
        let gap = ((self.energy)(model, a) - (self.energy)(model, b)).abs();
        !(gap <= self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::Vec3;

    fn pair(separation: f64, speed: f64) -> Vec<ParticleState> {
        vec![
            ParticleState::at(Vec3::zeros()).with_velocity(Vec3::new(speed, 0.0, 0.0)),
            ParticleState::at(Vec3::new(separation, 0.0, 0.0)),
        ]
    }

    #[test]
    fn kinetic_and_mechanical_energy() {
        let model = [Particle::new(2.0), Particle::new(1.0)];
        let state = pair(1.5, 3.0);
        let springs = [Spring::new(0, 1, 10.0, 1.0)];

        assert_relative_eq!(kinetic_energy(&model, &state), 9.0);
        assert_relative_eq!(mechanical_energy(&model, &state, &springs).unwrap(), 10.25);
    }

    #[test]
    fn phase_drift_respects_tolerance() {
        let model = [Particle::new(1.0); 2];
        let predicate = PhaseDrift { tolerance: 0.1 };

        assert!(!predicate.is_different(&model, &pair(1.0, 0.0), &pair(1.1, 0.05), 0.0));
        assert!(predicate.is_different(&model, &pair(1.0, 0.0), &pair(1.5, 0.1), 0.0));
    }

    #[test]
    fn nan_is_always_a_drift() {
        let model = [Particle::new(1.0); 2];
        let nan = pair(f64::NAN, 0.0);

        assert!(PhaseDrift { tolerance: 1e9 }.is_different(&model, &pair(1.0, 0.0), &nan, 0.0));

        let drift = EnergyDrift {
            tolerance: 1e9,
            energy: kinetic_energy,
        };
        assert!(drift.is_different(&model, &pair(1.0, 0.0), &pair(1.0, f64::NAN), 0.0));
    }

    #[test]
    fn energy_drift_compares_energies() {
        let model = [Particle::new(1.0); 2];
        let drift = EnergyDrift {
            tolerance: 0.5,
            energy: kinetic_energy,
        };

        assert!(!drift.is_different(&model, &pair(1.0, 1.0), &pair(5.0, -1.0), 0.0));
        assert!(drift.is_different(&model, &pair(1.0, 1.0), &pair(1.0, 2.0), 0.0));
    }
}
