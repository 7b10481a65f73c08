//! Meshes driven through the Störmer scheme.

use std::path::PathBuf;

use rand::{SeedableRng, rngs::StdRng};
use sinew_particles::{
    ClosureConfig, Constraint, FiberStiffness, HexaSpring, ParticleState, Spring,
    StoermerDerivative, Vec3, VolumeTerm,
    mesh::{HexaMesh, TetraMesh, default_mass},
    setup::{FiberFrame, FiberSetup},
    step::StoermerStep,
};
use sinew_solve::{
    Drive, Euler, FixedStepDriver, RungeKutta2, run_until, run_until_unobserved,
    driver::{Action, Event, Status},
};
use uom::si::{f64::MassDensity, mass_density::kilogram_per_cubic_meter};

const STIFFNESS: f64 = 2.5;
const DAMPING: f64 = 10.0;
const HEXA_STEP: f64 = 0.004;
const TETRA_STEP: f64 = 0.01;

// --- Test fixtures ---

fn column() -> HexaMesh {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/column.mesh");
    HexaMesh::load(path).unwrap()
}

fn column_forces(mesh: &HexaMesh) -> (Vec<Spring>, Vec<HexaSpring>) {
    let mut rng = StdRng::seed_from_u64(7);
    let frame = FiberFrame::hexa(0.3, 0.2).unwrap();
    let hexas = mesh
        .fiber_springs(
            &FiberSetup::default(),
            &frame,
            FiberStiffness::uniform(STIFFNESS, STIFFNESS, DAMPING),
            &mut rng,
        )
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(e, hexa)| {
            let positions = mesh.element_positions(e).unwrap();
            hexa.with_volume(VolumeTerm::radial(STIFFNESS, DAMPING, &positions))
        })
        .collect();
    (mesh.edge_springs(STIFFNESS, DAMPING), hexas)
}

fn height(state: &[ParticleState], index: usize) -> f64 {
    state[index].pos.y
}

// --- Tests ---

#[test]
fn column_sags_under_gravity_with_fixed_base() {
    let mesh = column();
    let law = StoermerDerivative::new(column_forces(&mesh));
    let solver = Euler::new(law, StoermerStep, mesh.positions().len()).unwrap();
    let mut driver = FixedStepDriver::new(solver, 0.0, HEXA_STEP).unwrap();

    let mut model = mesh.particles(default_mass());
    let mut state = mesh.states();
    let start = state.clone();

    for _ in 0..100 {
        driver.tick(&mut model, &mut state).unwrap();
        for (now, before) in state.iter().zip(&start) {
            if before.constraint == Constraint::Fixed {
                assert_eq!(now, before);
            }
        }
    }

    assert!(state.iter().all(|s| s.pos.iter().all(|c| c.is_finite())));
    let mean_drop = (4..12)
        .map(|i| start[i].pos.y - state[i].pos.y)
        .sum::<f64>()
        / 8.0;
    assert!(mean_drop > 0.0);
    assert!(height(&state, 8) < height(&start, 8));
    assert_eq!(state[10].constraint, Constraint::Observed);
}

#[test]
fn push_drives_its_vertex_further_down() {
    let mesh = column();

    let sag = |config: ClosureConfig| {
        let law = StoermerDerivative::with_config(column_forces(&mesh), config).unwrap();
        let solver = Euler::new(law, StoermerStep, mesh.positions().len()).unwrap();
        let mut driver = FixedStepDriver::new(solver, 0.0, HEXA_STEP).unwrap();
        let mut model = mesh.particles(default_mass());
        let mut state = mesh.states();
        run_until_unobserved(&mut driver, &mut model, &mut state, 0.1).unwrap();
        height(&state, 8)
    };

    let pushed = sag(ClosureConfig::default());
    let unpushed = sag(ClosureConfig {
        push: Vec3::zeros(),
        ..ClosureConfig::default()
    });
    assert!(pushed < unpushed, "{pushed} >= {unpushed}");
}

#[test]
fn observer_can_stop_a_mesh_run() {
    let mesh = column();
    let law = StoermerDerivative::new(column_forces(&mesh));
    let solver = RungeKutta2::new(law, StoermerStep, mesh.positions().len()).unwrap();
    let mut driver = FixedStepDriver::new(solver, 0.0, HEXA_STEP).unwrap();
    let mut model = mesh.particles(default_mass());
    let mut state = mesh.states();

    let mut seen = Vec::new();
    let solution = run_until(&mut driver, &mut model, &mut state, 10.0, |event: &Event| {
        seen.push(event.tick);
        (event.tick == 50).then_some(Action::StopEarly)
    })
    .unwrap();

    assert_eq!(solution.status, Status::StoppedByObserver);
    assert_eq!(solution.ticks, 50);
    assert_eq!(seen, (0..=50).collect::<Vec<_>>());
    assert!((driver.date() - 0.2).abs() < 1e-9);
}

#[test]
fn tetra_block_with_lumped_masses_stays_finite() {
    let mesh: TetraMesh = "5 2
0.0 0.0 0.0\t1
0.1 0.0 0.0\t1
0.0 0.0 0.1\t1
0.0 0.1 0.0\t0
0.1 0.1 0.1\t0
0 1 2 3
1 2 3 4
"
    .parse()
    .unwrap();

    let mut rng = StdRng::seed_from_u64(11);
    let frame = FiberFrame::random_tetra(&mut rng).unwrap();
    let tetras: Vec<_> = mesh
        .fiber_springs(
            &FiberSetup::default(),
            &frame,
            FiberStiffness::uniform(STIFFNESS, STIFFNESS, DAMPING),
            &mut rng,
        )
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(e, tetra)| {
            let positions = mesh.element_positions(e).unwrap();
            tetra.with_volume(VolumeTerm::aggregate(STIFFNESS, &positions))
        })
        .collect();

    let density = MassDensity::new::<kilogram_per_cubic_meter>(1000.0);
    let mut model = mesh.lumped_masses(density);
    assert!(model.iter().all(|p| p.mass() > 0.0));

    let law = StoermerDerivative::new((mesh.edge_springs(STIFFNESS, DAMPING), tetras));
    let solver = Euler::new(law, StoermerStep, model.len()).unwrap();
    let mut driver = FixedStepDriver::new(solver, 0.0, TETRA_STEP).unwrap();
    let mut state = mesh.states();

    let solution = run_until_unobserved(&mut driver, &mut model, &mut state, 0.5).unwrap();

    assert_eq!(solution.status, Status::Complete);
    assert!(state.iter().all(|s| s.pos.iter().all(|c| c.is_finite())));
    assert!(state[3].pos.y < 0.1);
    assert_eq!(state[0].pos, Vec3::zeros());
}
