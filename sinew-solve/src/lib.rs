//! Explicit time integration for the Sinew framework.
//!
//! The crate is layered the same way a simulation loop is:
//!
//! - [`solver`]: fixed-order, fixed-step methods ([`Euler`],
//!   [`RungeKutta2`], [`RungeKutta4`], [`ModifiedMidpoint`]) built from a
//!   [`DerivativeLaw`](sinew_core::DerivativeLaw) and a
//!   [`StepLaw`](sinew_core::StepLaw)
//! - [`stepper`]: adaptive step-size control wrapped around a solver
//!   ([`StepDoubling`], [`BackAndForth`])
//! - [`driver`]: owns the simulation date and advances it once per tick
//!   ([`FixedStepDriver`], [`AdaptiveDriver`], [`run_until`])
//!
//! Every layer owns scratch buffers sized to the element count given at
//! construction. Call `resize` whenever the number of elements changes;
//! calls with mismatched lengths fail with
//! [`IntegrationError::Cardinality`](sinew_core::IntegrationError::Cardinality).

mod scratch;

pub mod driver;
pub mod solver;
pub mod stepper;

pub use driver::{AdaptiveDriver, Drive, FixedStepDriver, Tick, run_until, run_until_unobserved};
pub use solver::{ConstantSubsteps, Euler, ModifiedMidpoint, RungeKutta2, RungeKutta4, Solver};
pub use stepper::{
    Accuracy, AdaptiveConfig, Advance, BackAndForth, Counters, ScaleGrow, ScaleShrink,
    StepDoubling, Stepper,
};
