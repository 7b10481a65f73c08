//! Shared fixtures for the end-to-end tests.
//!
//! A [`Scenario`] describes a pair of particles joined by one spring, the
//! closure constants and the integration settings. Scenarios live as TOML
//! files under `scenarios/`.

use std::{error::Error, fs, path::PathBuf};

use serde::Deserialize;
use sinew_core::{IntegrationError, StepLaw};
use sinew_particles::{
    ClosureConfig, Particle, ParticleDerivative, ParticleState, Spring, StoermerDerivative, Vec3,
    energy::mechanical_energy,
};
use sinew_solve::{
    Drive, Euler, FixedStepDriver, ModifiedMidpoint, RungeKutta2, RungeKutta4, Solver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    Euler,
    RungeKutta2,
    RungeKutta4,
    ModifiedMidpoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Particles {
    /// Mass of each particle in kilograms.
    pub mass: f64,
    /// Initial distance between the particles along x.
    pub separation: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpringSection {
    pub stiffness: f64,
    pub rest_length: f64,
    #[serde(default)]
    pub damping: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Integration {
    pub solver: SolverKind,
    pub time_step: f64,
    pub steps: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Check {
    pub relative_energy_error: f64,
}

/// Two particles on the x axis joined by a single spring.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Scenario {
    pub particles: Particles,
    pub spring: SpringSection,
    #[serde(default)]
    pub closure: ClosureConfig,
    pub integration: Integration,
    pub check: Check,
}

/// Result of running a scenario to its last step.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub initial_energy: f64,
    /// Largest `|E - E0| / E0` seen after any step.
    pub worst_relative_error: f64,
    pub date: f64,
    pub state: Vec<ParticleState>,
}

impl Scenario {
    /// Parses a scenario from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the text is malformed or a key is missing.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Loads `scenarios/<name>.toml` from this crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(name: &str) -> Result<Self, Box<dyn Error>> {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("scenarios")
            .join(name)
            .with_extension("toml");
        let text = fs::read_to_string(path)?;
        Ok(Self::from_toml(&text)?)
    }

    pub fn model(&self) -> Vec<Particle> {
        vec![Particle::new(self.particles.mass); 2]
    }

    /// Both particles at rest, the second displaced along x.
    pub fn state(&self) -> Vec<ParticleState> {
        vec![
            ParticleState::at(Vec3::zeros()),
            ParticleState::at(Vec3::new(self.particles.separation, 0.0, 0.0)),
        ]
    }

    pub fn springs(&self) -> Vec<Spring> {
        vec![
            Spring::new(0, 1, self.spring.stiffness, self.spring.rest_length)
                .with_damping(self.spring.damping),
        ]
    }

    /// Derivative law for this scenario's springs and closure.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::InvalidConfig`] if the closure is invalid.
    pub fn law(&self) -> Result<StoermerDerivative<Vec<Spring>>, IntegrationError> {
        StoermerDerivative::with_config(self.springs(), self.closure)
    }

    /// Runs the configured solver with `step` for the configured number of
    /// steps, tracking mechanical energy.
    ///
    /// # Errors
    ///
    /// Returns any error raised while building the solver or integrating.
    pub fn run<P>(&self, step: P) -> Result<Run, IntegrationError>
    where
        P: StepLaw<ParticleState, ParticleDerivative>,
    {
        self.run_with(self.integration.solver, step)
    }

    /// Same as [`Scenario::run`] with another solver.
    ///
    /// # Errors
    ///
    /// Returns any error raised while building the solver or integrating.
    pub fn run_with<P>(&self, kind: SolverKind, step: P) -> Result<Run, IntegrationError>
    where
        P: StepLaw<ParticleState, ParticleDerivative>,
    {
        let law = self.law()?;
        match kind {
            SolverKind::Euler => self.drive(Euler::new(law, step, 2)?),
            SolverKind::RungeKutta2 => self.drive(RungeKutta2::new(law, step, 2)?),
            SolverKind::RungeKutta4 => self.drive(RungeKutta4::new(law, step, 2)?),
            SolverKind::ModifiedMidpoint => self.drive(ModifiedMidpoint::new(law, step, 2)?),
        }
    }

    fn drive<Sv>(&self, solver: Sv) -> Result<Run, IntegrationError>
    where
        Sv: Solver<Model = Particle, State = ParticleState>,
    {
        let mut driver = FixedStepDriver::new(solver, 0.0, self.integration.time_step)?;
        let mut model = self.model();
        let mut state = self.state();
        let springs = self.springs();

        let initial_energy = mechanical_energy(&model, &state, &springs)?;
        let mut worst_relative_error: f64 = 0.0;
        for _ in 0..self.integration.steps {
            driver.tick(&mut model, &mut state)?;
            let energy = mechanical_energy(&model, &state, &springs)?;
            let error = ((energy - initial_energy) / initial_energy).abs();
            worst_relative_error = worst_relative_error.max(error);
        }

        Ok(Run {
            initial_energy,
            worst_relative_error,
            date: driver.date(),
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_scenario_loads() {
        let scenario = Scenario::load("spring_pair").unwrap();

        assert_eq!(scenario.integration.solver, SolverKind::RungeKutta4);
        assert_eq!(scenario.integration.steps, 1000);
        assert_eq!(scenario.closure.gravity, Vec3::zeros());
        assert_eq!(scenario.spring.damping, 0.0);
    }

    #[test]
    fn closure_section_is_optional() {
        let scenario = Scenario::from_toml(
            r#"
            [particles]
            mass = 2.0
            separation = 1.0

            [spring]
            stiffness = 1.0
            rest_length = 1.0

            [integration]
            solver = "modified-midpoint"
            time_step = 0.1
            steps = 3

            [check]
            relative_energy_error = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(scenario.closure, ClosureConfig::default());
        assert_eq!(scenario.integration.solver, SolverKind::ModifiedMidpoint);
    }

    #[test]
    fn unknown_solver_is_rejected() {
        let text = r#"
            [particles]
            mass = 1.0
            separation = 1.0
            [spring]
            stiffness = 1.0
            rest_length = 1.0
            [integration]
            solver = "leapfrog"
            time_step = 0.1
            steps = 1
            [check]
            relative_energy_error = 0.1
        "#;
        assert!(Scenario::from_toml(text).is_err());
    }
}
