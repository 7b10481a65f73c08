//! Core contracts for explicit time integration.
//!
//! This crate defines the shared abstractions that solvers, steppers and
//! physical models build on:
//!
//! - [`DerivativeLaw`]: maps `(model, state, t)` to a derivative sequence
//! - [`StepLaw`]: maps `(initial, derivative, h)` to a final state sequence
//! - [`SubstepPolicy`], [`ShrinkPolicy`], [`GrowPolicy`],
//!   [`DifferencePredicate`]: the pluggable pieces of multi-stage and
//!   adaptive integrators
//! - [`Observer`]: receives run events and optionally returns control actions
//! - [`IntegrationError`]: the failure modes shared by every layer
//!
//! States, derivatives and models are plain slices whose length is the
//! element cardinality; element `i` of each slice refers to the same entity.

mod error;
mod law;
mod linear;
mod observer;

pub use error::{IntegrationError, MIN_LENGTH, ensure_len};
pub use law::{
    DerivativeLaw, DifferencePredicate, GrowPolicy, ShrinkPolicy, StepLaw, SubstepPolicy,
};
pub use linear::LinearStep;
pub use observer::Observer;
