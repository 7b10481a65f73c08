use std::ops::{Add, Mul};

use crate::Vec3;

/// How the closure phase treats a particle.
///
/// The numeric codes match the vertex constraint column of mesh files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Constraint {
    /// Moves under its accumulated force, drag and gravity.
    #[default]
    Free,
    /// Never moves; its derivative is never written.
    Fixed,
    /// Moves like a free particle with an extra push force.
    Pushed,
    /// Moves like a free particle and is reported through tracing.
    Observed,
}

impl Constraint {
    /// Parses a mesh constraint code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Free),
            1 => Some(Self::Fixed),
            2 => Some(Self::Pushed),
            3 => Some(Self::Observed),
            _ => None,
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::Free => 0,
            Self::Fixed => 1,
            Self::Pushed => 2,
            Self::Observed => 3,
        }
    }

    pub fn is_fixed(self) -> bool {
        self == Self::Fixed
    }
}

/// Position and velocity of a single particle.
///
/// The constraint travels with the state so that step laws can leave fixed
/// particles untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ParticleState {
    pub vel: Vec3,
    pub pos: Vec3,
    pub constraint: Constraint,
}

impl ParticleState {
    /// Creates a free particle at rest at `pos`.
    pub fn at(pos: Vec3) -> Self {
        Self {
            vel: Vec3::zeros(),
            pos,
            constraint: Constraint::Free,
        }
    }

    #[must_use]
    pub fn with_velocity(self, vel: Vec3) -> Self {
        Self { vel, ..self }
    }

    #[must_use]
    pub fn with_constraint(self, constraint: Constraint) -> Self {
        Self { constraint, ..self }
    }
}

/// Componentwise sum; the constraint of `self` is kept.
impl Add for ParticleState {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            vel: self.vel + rhs.vel,
            pos: self.pos + rhs.pos,
            constraint: self.constraint,
        }
    }
}

impl Mul<f64> for ParticleState {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            vel: self.vel * rhs,
            pos: self.pos * rhs,
            constraint: self.constraint,
        }
    }
}

/// Time derivative of a [`ParticleState`].
///
/// `acc` is the derivative of velocity and `vel` the derivative of position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ParticleDerivative {
    pub acc: Vec3,
    pub vel: Vec3,
}

impl ParticleDerivative {
    pub fn is_finite(&self) -> bool {
        self.acc.iter().chain(self.vel.iter()).all(|c| c.is_finite())
    }
}

impl Add for ParticleDerivative {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            acc: self.acc + rhs.acc,
            vel: self.vel + rhs.vel,
        }
    }
}

impl Mul<f64> for ParticleDerivative {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self {
            acc: self.acc * rhs,
            vel: self.vel * rhs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn constraint_codes_round_trip() {
        for constraint in [
            Constraint::Free,
            Constraint::Fixed,
            Constraint::Pushed,
            Constraint::Observed,
        ] {
            assert_eq!(Constraint::from_code(constraint.code()), Some(constraint));
        }
        assert_eq!(Constraint::from_code(4), None);
    }

    #[test]
    fn sum_keeps_left_constraint() {
        let a = ParticleState::at(Vec3::new(1.0, 2.0, 3.0)).with_constraint(Constraint::Pushed);
        let b = ParticleState::at(Vec3::new(1.0, 1.0, 1.0)).with_velocity(Vec3::x());

        let sum = a + b;
        assert_eq!(sum.constraint, Constraint::Pushed);
        assert_relative_eq!(sum.pos, Vec3::new(2.0, 3.0, 4.0));
        assert_relative_eq!(sum.vel, Vec3::x());

        let half = sum * 0.5;
        assert_relative_eq!(half.pos, Vec3::new(1.0, 1.5, 2.0));
        assert_eq!(half.constraint, Constraint::Pushed);
    }

    #[test]
    fn derivative_finiteness() {
        let mut d = ParticleDerivative::default();
        assert!(d.is_finite());
        d.acc.y = f64::NAN;
        assert!(!d.is_finite());
    }
}
