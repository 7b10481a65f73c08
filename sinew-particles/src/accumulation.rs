use sinew_core::IntegrationError;
use uom::si::{f64::Mass, mass::kilogram};

use crate::Vec3;

/// Model entry for a single particle.
///
/// The force accumulator is only observable as zero between derivative
/// evaluations; it is written through a [`ForceAccumulation`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    mass: f64,
    force: Vec3,
}

impl Particle {
    /// Creates a particle with a mass in kilograms.
    pub fn new(mass: f64) -> Self {
        Self {
            mass,
            force: Vec3::zeros(),
        }
    }

    pub fn with_mass(mass: Mass) -> Self {
        Self::new(mass.get::<kilogram>())
    }

    /// Mass in kilograms.
    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn force(&self) -> Vec3 {
        self.force
    }
}

/// One accumulation pass over the particle force accumulators.
///
/// [`begin`](Self::begin) clears every accumulator, force laws add into them
/// with [`add`](Self::add), and [`resolve`](Self::resolve) hands each total to
/// a visitor while clearing it again. Dropping an unresolved pass also clears
/// the accumulators, so a failed evaluation never leaks forces into the next.
pub struct ForceAccumulation<'a> {
    particles: &'a mut [Particle],
    pending: bool,
}

impl<'a> ForceAccumulation<'a> {
    pub fn begin(particles: &'a mut [Particle]) -> Self {
        for particle in particles.iter_mut() {
            particle.force = Vec3::zeros();
        }
        Self {
            particles,
            pending: true,
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Adds `force` to the accumulator of particle `index`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::IndexOutOfRange`] if `index` is not a
    /// particle of this pass.
    pub fn add(&mut self, index: usize, force: Vec3) -> Result<(), IntegrationError> {
        let len = self.particles.len();
        let particle = self
            .particles
            .get_mut(index)
            .ok_or(IntegrationError::IndexOutOfRange {
                law: "force accumulation",
                index,
                len,
            })?;
        particle.force += force;
        Ok(())
    }

    /// Visits every particle with its mass and accumulated force.
    ///
    /// Each accumulator is cleared before its visit. If the visitor fails, the
    /// remaining accumulators are cleared on drop.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by `visit`.
    pub fn resolve<F>(mut self, mut visit: F) -> Result<(), IntegrationError>
    where
        F: FnMut(usize, f64, Vec3) -> Result<(), IntegrationError>,
    {
        for (index, particle) in self.particles.iter_mut().enumerate() {
            let force = std::mem::replace(&mut particle.force, Vec3::zeros());
            visit(index, particle.mass, force)?;
        }
        self.pending = false;
        Ok(())
    }
}

impl Drop for ForceAccumulation<'_> {
    fn drop(&mut self) {
        if self.pending {
            for particle in self.particles.iter_mut() {
                particle.force = Vec3::zeros();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn resolve_hands_out_totals_and_clears() {
        let mut particles = vec![Particle::new(1.0), Particle::new(2.0)];

        let mut pass = ForceAccumulation::begin(&mut particles);
        pass.add(0, Vec3::x()).unwrap();
        pass.add(0, Vec3::y()).unwrap();
        pass.add(1, Vec3::z()).unwrap();

        let mut seen = Vec::new();
        pass.resolve(|index, mass, force| {
            seen.push((index, mass, force));
            Ok(())
        })
        .unwrap();

        assert_eq!(seen.len(), 2);
        assert_relative_eq!(seen[0].2, Vec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(seen[1].1, 2.0);
        assert!(particles.iter().all(|p| p.force() == Vec3::zeros()));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let mut particles = vec![Particle::new(1.0)];
        let mut pass = ForceAccumulation::begin(&mut particles);

        assert_eq!(
            pass.add(3, Vec3::x()),
            Err(IntegrationError::IndexOutOfRange {
                law: "force accumulation",
                index: 3,
                len: 1,
            })
        );
    }

    #[test]
    fn abandoned_pass_clears_accumulators() {
        let mut particles = vec![Particle::new(1.0); 3];
        {
            let mut pass = ForceAccumulation::begin(&mut particles);
            pass.add(1, Vec3::new(5.0, 0.0, 0.0)).unwrap();
        }
        assert!(particles.iter().all(|p| p.force() == Vec3::zeros()));
    }

    #[test]
    fn failed_visit_clears_remaining_accumulators() {
        let mut particles = vec![Particle::new(1.0); 3];
        let mut pass = ForceAccumulation::begin(&mut particles);
        for index in 0..3 {
            pass.add(index, Vec3::x()).unwrap();
        }

        let result = pass.resolve(|index, _, _| {
            if index == 1 {
                Err(IntegrationError::NonFiniteDerivative { index })
            } else {
                Ok(())
            }
        });

        assert!(result.is_err());
        assert!(particles.iter().all(|p| p.force() == Vec3::zeros()));
    }

    #[test]
    fn mass_from_quantity() {
        let particle = Particle::with_mass(Mass::new::<uom::si::mass::gram>(10.0));
        assert_relative_eq!(particle.mass(), 0.01);
    }
}
