//! Energy behaviour of an undamped spring pair.

use approx::assert_relative_eq;
use integration_tests::{Scenario, SolverKind};
use sinew_particles::{ParticleState, step::KinematicStep};

fn scenario() -> Scenario {
    Scenario::load("spring_pair").unwrap()
}

fn centre_of_mass(state: &[ParticleState]) -> f64 {
    0.5 * (state[0].pos.x + state[1].pos.x)
}

#[test]
fn runge_kutta4_conserves_energy() {
    let scenario = scenario();
    let run = scenario.run(KinematicStep).unwrap();

    assert_relative_eq!(run.initial_energy, 1.25);
    assert!(
        run.worst_relative_error < scenario.check.relative_energy_error,
        "relative energy error {}",
        run.worst_relative_error
    );
    assert_relative_eq!(run.date, 10.0, epsilon = 1e-9);
}

#[test]
fn euler_gains_energy() {
    let scenario = scenario();
    let euler = scenario.run_with(SolverKind::Euler, KinematicStep).unwrap();
    let rk2 = scenario.run_with(SolverKind::RungeKutta2, KinematicStep).unwrap();
    let rk4 = scenario.run_with(SolverKind::RungeKutta4, KinematicStep).unwrap();

    assert!(euler.worst_relative_error > 1.0);
    assert!(rk2.worst_relative_error < euler.worst_relative_error);
    assert!(rk4.worst_relative_error < rk2.worst_relative_error);
}

#[test]
fn modified_midpoint_stays_close() {
    let run = scenario()
        .run_with(SolverKind::ModifiedMidpoint, KinematicStep)
        .unwrap();
    assert!(run.worst_relative_error < 1e-2, "{}", run.worst_relative_error);
}

#[test]
fn centre_of_mass_does_not_move() {
    let scenario = scenario();
    let before = centre_of_mass(&scenario.state());
    let run = scenario.run(KinematicStep).unwrap();

    assert_relative_eq!(centre_of_mass(&run.state), before, epsilon = 1e-9);
    assert_relative_eq!(run.state[0].vel.x, -run.state[1].vel.x, epsilon = 1e-9);
}

#[test]
fn damping_dissipates_energy() {
    let mut scenario = scenario();
    scenario.spring.damping = 0.5;
    let run = scenario.run(KinematicStep).unwrap();

    let springs = scenario.springs();
    let model = scenario.model();
    let end = sinew_particles::energy::mechanical_energy(&model, &run.state, &springs).unwrap();
    assert!(end < 0.1 * run.initial_energy, "energy left {end}");
}
