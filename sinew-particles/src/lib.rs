//! Mass–spring particle systems for the Sinew framework.
//!
//! Particles carry a [`ParticleState`] (position, velocity, constraint) and
//! a [`Particle`] model entry (mass and a force accumulator). Derivatives are
//! computed in two phases by [`StoermerDerivative`]:
//!
//! 1. Every [`ForceLaw`] adds its contribution into the accumulators through a
//!    [`ForceAccumulation`].
//! 2. The closure phase turns the accumulated force into an acceleration per
//!    constraint kind and clears the accumulator.
//!
//! The resulting derivative plugs into any solver from `sinew-solve` together
//! with one of the step laws in [`step`].
//!
//! The [`mesh`] and [`setup`] modules build particles and multi-body springs
//! from volumetric meshes.

mod accumulation;
mod state;
mod stoermer;

pub mod energy;
pub mod force;
pub mod mesh;
pub mod setup;
pub mod step;

pub use accumulation::{ForceAccumulation, Particle};
pub use force::{
    FiberElement, FiberStiffness, FiberTable, ForceLaw, HexaSpring, ShearModel, Spring,
    TetraSpring, VolumeTerm,
};
pub use state::{Constraint, ParticleDerivative, ParticleState};
pub use stoermer::{ClosureConfig, StoermerDerivative};

/// Three-dimensional vector used for positions, velocities and forces.
pub type Vec3 = nalgebra::Vector3<f64>;
