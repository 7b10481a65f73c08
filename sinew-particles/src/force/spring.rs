use sinew_core::IntegrationError;

use super::{ForceLaw, gather, unit};
use crate::{ForceAccumulation, ParticleState};

/// Damped linear spring between two particles.
///
/// With `l = pos[p0] - pos[p1]`, `n = l / |l|` and `v = vel[p0] - vel[p1]`,
/// the spring adds `F = -(ks (|l| - L0) + kd (v · n)) n` to `p0` and `-F` to
/// `p1`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Spring {
    pub ends: [usize; 2],
    pub stiffness: f64,
    pub damping: f64,
    pub rest_length: f64,
}

impl Spring {
    /// Creates an undamped spring.
    pub fn new(p0: usize, p1: usize, stiffness: f64, rest_length: f64) -> Self {
        Self {
            ends: [p0, p1],
            stiffness,
            damping: 0.0,
            rest_length,
        }
    }

    #[must_use]
    pub fn with_damping(self, damping: f64) -> Self {
        Self { damping, ..self }
    }

    /// Current length of the spring.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::IndexOutOfRange`] if an end is missing.
    pub fn length(&self, state: &[ParticleState]) -> Result<f64, IntegrationError> {
        let [a, b] = gather("spring", state, &self.ends)?;
        Ok((a.pos - b.pos).norm())
    }

    /// Elastic energy `½ ks (|l| - L0)²` stored in the spring.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::IndexOutOfRange`] if an end is missing.
    pub fn potential_energy(&self, state: &[ParticleState]) -> Result<f64, IntegrationError> {
        let stretch = self.length(state)? - self.rest_length;
        Ok(0.5 * self.stiffness * stretch * stretch)
    }
}

impl ForceLaw for Spring {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        let [a, b] = gather("spring", state, &self.ends)?;
        let (n, length) = unit("spring", a.pos - b.pos)?;
        let v = a.vel - b.vel;

        let force = -(self.stiffness * (length - self.rest_length) + self.damping * v.dot(&n)) * n;

        forces.add(self.ends[0], force)?;
        forces.add(self.ends[1], -force)
    }
}
