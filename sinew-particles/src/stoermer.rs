use sinew_core::{DerivativeLaw, IntegrationError, ensure_len};
use uom::si::{acceleration::meter_per_second_squared, f64::Acceleration};

use crate::{
    Constraint, ForceAccumulation, ForceLaw, Particle, ParticleDerivative, ParticleState, Vec3,
};

/// Constants applied to every particle in the closure phase.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct ClosureConfig {
    /// Viscous drag coefficient in kg/s.
    pub drag: f64,
    /// Gravitational acceleration in m/s².
    pub gravity: Vec3,
    /// Extra force in newtons applied to pushed particles.
    pub push: Vec3,
}

impl Default for ClosureConfig {
    fn default() -> Self {
        Self {
            drag: 5.0e-3,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            push: Vec3::new(0.0, -1.0, 0.0),
        }
    }
}

impl ClosureConfig {
    /// Points gravity down the y axis with the given magnitude.
    #[must_use]
    pub fn with_gravity_magnitude(self, g: Acceleration) -> Self {
        Self {
            gravity: Vec3::new(0.0, -g.get::<meter_per_second_squared>(), 0.0),
            ..self
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the drag is negative or any constant is not finite.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.drag.is_finite() {
            return Err("drag must be finite");
        }
        if self.drag < 0.0 {
            return Err("drag must be non-negative");
        }
        if !self.gravity.iter().all(|c| c.is_finite()) {
            return Err("gravity must be finite");
        }
        if !self.push.iter().all(|c| c.is_finite()) {
            return Err("push must be finite");
        }
        Ok(())
    }
}

/// Two-phase derivative of a mass–spring system.
///
/// Evaluation first accumulates the forces of every law, then closes each
/// particle by adding drag, gravity and push and dividing by its mass:
///
/// - `Free` and `Observed`: `acc = (f - drag·v + m·g) / m`.
/// - `Pushed`: `acc = (f - drag·v + m·g + push) / m`.
/// - `Fixed`: the derivative is left unwritten.
///
/// The derivative's `vel` is the state's velocity. Accumulators are zero
/// again when evaluation returns, successfully or not.
pub struct StoermerDerivative<F> {
    forces: F,
    config: ClosureConfig,
}

impl<F: ForceLaw> StoermerDerivative<F> {
    /// Creates a derivative with the default closure constants.
    pub fn new(forces: F) -> Self {
        Self {
            forces,
            config: ClosureConfig::default(),
        }
    }

    /// Creates a derivative with custom closure constants.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidConfig`] if `config` is invalid.
    pub fn with_config(forces: F, config: ClosureConfig) -> Result<Self, IntegrationError> {
        config
            .validate()
            .map_err(|reason| IntegrationError::InvalidConfig { reason })?;
        Ok(Self { forces, config })
    }

    pub fn forces(&self) -> &F {
        &self.forces
    }

    pub fn config(&self) -> &ClosureConfig {
        &self.config
    }
}

impl<F: ForceLaw> DerivativeLaw for StoermerDerivative<F> {
    type Model = Particle;
    type State = ParticleState;
    type Derivative = ParticleDerivative;

    fn evaluate(
        &self,
        model: &mut [Particle],
        state: &[ParticleState],
        _t: f64,
        out: &mut [ParticleDerivative],
    ) -> Result<(), IntegrationError> {
        ensure_len("state", model.len(), state.len())?;
        ensure_len("derivative", model.len(), out.len())?;

        let mut forces = ForceAccumulation::begin(model);
        self.forces.accumulate(&mut forces, state)?;

        let ClosureConfig {
            drag,
            gravity,
            push,
        } = self.config;

        forces.resolve(|index, mass, force| {
            let s = &state[index];
            let total = match s.constraint {
                Constraint::Fixed => return Ok(()),
                Constraint::Free => force - drag * s.vel + mass * gravity,
                Constraint::Pushed => force - drag * s.vel + mass * gravity + push,
                Constraint::Observed => {
                    tracing::trace!(index, x = s.pos.x, y = s.pos.y, z = s.pos.z, "observed");
                    force - drag * s.vel + mass * gravity
                }
            };

            let d = ParticleDerivative {
                acc: total / mass,
                vel: s.vel,
            };
            if !d.is_finite() {
                return Err(IntegrationError::NonFiniteDerivative { index });
            }
            out[index] = d;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    use crate::Spring;

    // --- Test fixtures ---

    fn still() -> ClosureConfig {
        ClosureConfig {
            drag: 0.0,
            gravity: Vec3::zeros(),
            push: Vec3::zeros(),
        }
    }

    fn pair() -> (Vec<Particle>, Vec<ParticleState>) {
        let model = vec![Particle::new(2.0), Particle::new(2.0)];
        let state = vec![
            ParticleState::at(Vec3::zeros()),
            ParticleState::at(Vec3::new(1.5, 0.0, 0.0)),
        ];
        (model, state)
    }

    // --- Tests ---

    #[test]
    fn free_particle_falls_with_drag() {
        let law = StoermerDerivative::new(Vec::<Spring>::new());
        let mut model = vec![Particle::new(0.5)];
        let state = vec![ParticleState::at(Vec3::zeros()).with_velocity(Vec3::new(2.0, 0.0, 0.0))];
        let mut out = vec![ParticleDerivative::default()];

        law.evaluate(&mut model, &state, 0.0, &mut out).unwrap();

        assert_relative_eq!(out[0].acc, Vec3::new(-0.02, -9.8, 0.0), epsilon = 1e-12);
        assert_relative_eq!(out[0].vel, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn pushed_particle_gets_the_push_over_its_mass() {
        let law = StoermerDerivative::new(Vec::<Spring>::new());
        let mut model = vec![Particle::new(0.5)];
        let state = vec![ParticleState::at(Vec3::zeros()).with_constraint(Constraint::Pushed)];
        let mut out = vec![ParticleDerivative::default()];

        law.evaluate(&mut model, &state, 0.0, &mut out).unwrap();

        assert_relative_eq!(out[0].acc, Vec3::new(0.0, -11.8, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn fixed_particle_derivative_is_untouched() {
        let law = StoermerDerivative::new(vec![Spring::new(0, 1, 10.0, 1.0)]);
        let (mut model, mut state) = pair();
        state[0].constraint = Constraint::Fixed;
        let sentinel = ParticleDerivative {
            acc: Vec3::new(7.0, 7.0, 7.0),
            vel: Vec3::new(7.0, 7.0, 7.0),
        };
        let mut out = vec![sentinel; 2];

        law.evaluate(&mut model, &state, 0.0, &mut out).unwrap();

        assert_eq!(out[0], sentinel);
        assert_ne!(out[1], sentinel);
        assert!(model.iter().all(|p| p.force() == Vec3::zeros()));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let law =
            StoermerDerivative::with_config(vec![Spring::new(0, 1, 10.0, 1.0)], still()).unwrap();
        let (mut model, state) = pair();
        let mut first = vec![ParticleDerivative::default(); 2];
        let mut second = vec![ParticleDerivative::default(); 2];

        law.evaluate(&mut model, &state, 0.0, &mut first).unwrap();
        law.evaluate(&mut model, &state, 0.0, &mut second).unwrap();

        assert_eq!(first, second);
        assert_relative_eq!(first[0].acc, Vec3::new(2.5, 0.0, 0.0));
        assert_relative_eq!(first[1].acc, Vec3::new(-2.5, 0.0, 0.0));
    }

    #[test]
    fn zero_mass_is_a_non_finite_derivative() {
        let law = StoermerDerivative::new(Vec::<Spring>::new());
        let mut model = vec![Particle::new(1.0), Particle::new(0.0)];
        let state = vec![ParticleState::default(); 2];
        let mut out = vec![ParticleDerivative::default(); 2];

        assert_eq!(
            law.evaluate(&mut model, &state, 0.0, &mut out),
            Err(IntegrationError::NonFiniteDerivative { index: 1 })
        );
    }

    #[test]
    fn failed_accumulation_leaves_accumulators_clear() {
        let law = StoermerDerivative::new(vec![
            Spring::new(0, 1, 10.0, 1.0),
            Spring::new(0, 0, 10.0, 1.0),
        ]);
        let (mut model, state) = pair();
        let mut out = vec![ParticleDerivative::default(); 2];

        assert!(law.evaluate(&mut model, &state, 0.0, &mut out).is_err());
        assert!(model.iter().all(|p| p.force() == Vec3::zeros()));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let law = StoermerDerivative::new(Vec::<Spring>::new());
        let mut model = vec![Particle::new(1.0)];
        let mut out = vec![ParticleDerivative::default(); 2];

        assert!(matches!(
            law.evaluate(&mut model, &[ParticleState::default(); 2], 0.0, &mut out),
            Err(IntegrationError::Cardinality { buffer: "state", .. })
        ));
    }

    #[test]
    fn gravity_from_a_quantity() {
        let config = ClosureConfig::default()
            .with_gravity_magnitude(Acceleration::new::<meter_per_second_squared>(3.71));
        assert_relative_eq!(config.gravity, Vec3::new(0.0, -3.71, 0.0));
    }

    #[test]
    fn negative_drag_is_invalid() {
        let config = ClosureConfig {
            drag: -1.0,
            ..ClosureConfig::default()
        };
        assert_eq!(config.validate(), Err("drag must be non-negative"));
        assert!(matches!(
            StoermerDerivative::with_config(Vec::<Spring>::new(), config),
            Err(IntegrationError::InvalidConfig { .. })
        ));
    }
}
