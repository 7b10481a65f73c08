//! Force laws that contribute to the accumulation phase.
//!
//! A [`ForceLaw`] reads particle states and adds forces into a
//! [`ForceAccumulation`]. Laws compose: a `Vec` of laws, a boxed law and a
//! pair of laws are laws themselves.

mod fiber;
mod spring;

pub use fiber::{
    FiberElement, FiberStiffness, FiberTable, HexaSpring, ShearModel, TetraSpring, VolumeTerm,
};
pub use spring::Spring;

use sinew_core::{IntegrationError, MIN_LENGTH};

use crate::{ForceAccumulation, ParticleState, Vec3};

/// Adds forces computed from the current particle states.
pub trait ForceLaw {
    /// Adds this law's contribution into `forces`.
    ///
    /// # Errors
    ///
    /// Returns an error if the law references a missing particle or a vector
    /// it must normalize is degenerate.
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError>;
}

impl<F: ForceLaw> ForceLaw for [F] {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        self.iter().try_for_each(|law| law.accumulate(forces, state))
    }
}

impl<F: ForceLaw> ForceLaw for Vec<F> {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        self.as_slice().accumulate(forces, state)
    }
}

impl<F: ForceLaw + ?Sized> ForceLaw for Box<F> {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        (**self).accumulate(forces, state)
    }
}

impl<F: ForceLaw + ?Sized> ForceLaw for &F {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        (**self).accumulate(forces, state)
    }
}

impl<A: ForceLaw, B: ForceLaw> ForceLaw for (A, B) {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        self.0.accumulate(forces, state)?;
        self.1.accumulate(forces, state)
    }
}

/// Copies the states of `indices`, failing on a missing particle.
pub(crate) fn gather<const N: usize>(
    law: &'static str,
    state: &[ParticleState],
    indices: &[usize; N],
) -> Result<[ParticleState; N], IntegrationError> {
    let mut out = [ParticleState::default(); N];
    for (slot, &index) in out.iter_mut().zip(indices) {
        *slot = *state.get(index).ok_or(IntegrationError::IndexOutOfRange {
            law,
            index,
            len: state.len(),
        })?;
    }
    Ok(out)
}

/// Splits `v` into its direction and length.
pub(crate) fn unit(law: &'static str, v: Vec3) -> Result<(Vec3, f64), IntegrationError> {
    let length = v.norm();
    if length < MIN_LENGTH || !length.is_finite() {
        return Err(IntegrationError::DegenerateLength { law, length });
    }
    Ok((v / length, length))
}
