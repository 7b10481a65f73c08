use sinew_core::IntegrationError;

use super::{ForceLaw, gather, unit};
use crate::{ForceAccumulation, ParticleState, Vec3};

/// Where the six fiber endpoints of an element sit on its faces.
///
/// Endpoint `j` is `Σ weights[j][k] · pos[faces[j][k]]`, where face indices
/// are local to the element. Fiber `i` runs from endpoint `2i + 1` to
/// endpoint `2i`. `endpoints` holds the rest positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiberTable<const K: usize> {
    pub faces: [[usize; K]; 6],
    pub weights: [[f64; K]; 6],
    pub endpoints: [Vec3; 6],
}

impl<const K: usize> FiberTable<K> {
    fn interpolate<const N: usize>(&self, values: &[Vec3; N]) -> [Vec3; 6] {
        std::array::from_fn(|j| {
            self.faces[j]
                .iter()
                .zip(&self.weights[j])
                .fold(Vec3::zeros(), |sum, (&v, &w)| sum + values[v] * w)
        })
    }
}

/// Per-fiber stiffness and damping of a fiber element.
///
/// `shear` couples the fiber pairs (1, 2), (1, 3) and (2, 3) in that order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct FiberStiffness {
    pub stretch: [f64; 3],
    pub shear: [f64; 3],
    pub damping: [f64; 3],
}

impl FiberStiffness {
    /// Same coefficients along every fiber.
    pub fn uniform(stretch: f64, shear: f64, damping: f64) -> Self {
        Self {
            stretch: [stretch; 3],
            shear: [shear; 3],
            damping: [damping; 3],
        }
    }
}

/// How the angular coupling between two fibers is turned into forces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum ShearModel {
    /// Forces act in the plane of both fibers, perpendicular to each.
    #[default]
    Projected,
    /// Forces act along the other fiber's direction.
    Direct,
}

/// Optional term resisting changes of element volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeTerm<const N: usize> {
    /// One spring on the sum of vertex–centroid distances.
    Aggregate { stiffness: f64, rest: f64 },
    /// A damped radial spring from each vertex to the centroid.
    Radial {
        stiffness: f64,
        damping: f64,
        rest: [f64; N],
    },
}

impl<const N: usize> VolumeTerm<N> {
    /// Aggregate term at rest for the given vertex positions.
    pub fn aggregate(stiffness: f64, positions: &[Vec3; N]) -> Self {
        Self::Aggregate {
            stiffness,
            rest: radii(positions).iter().sum(),
        }
    }

    /// Radial term at rest for the given vertex positions.
    pub fn radial(stiffness: f64, damping: f64, positions: &[Vec3; N]) -> Self {
        Self::Radial {
            stiffness,
            damping,
            rest: radii(positions),
        }
    }
}

fn centroid<const N: usize>(values: &[Vec3; N]) -> Vec3 {
    values.iter().fold(Vec3::zeros(), |sum, v| sum + v) / N as f64
}

fn radii<const N: usize>(positions: &[Vec3; N]) -> [f64; N] {
    let g = centroid(positions);
    std::array::from_fn(|i| (positions[i] - g).norm())
}

/// Three damped fibers embedded in a volumetric element.
///
/// Each fiber resists stretching along its own axis; each pair of fibers
/// resists leaving orthogonality. The fiber forces are applied at the
/// endpoints and distributed back to the element vertices with the same
/// weights used to place them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiberElement<const N: usize, const K: usize> {
    vertices: [usize; N],
    table: FiberTable<K>,
    stiffness: FiberStiffness,
    rest: [f64; 3],
    shear: ShearModel,
    volume: Option<VolumeTerm<N>>,
}

/// Fiber element on a tetrahedron; endpoints are barycentric on triangles.
pub type TetraSpring = FiberElement<4, 3>;

/// Fiber element on a hexahedron; endpoints are bilinear on quads.
pub type HexaSpring = FiberElement<8, 4>;

const LAW: &str = "fiber element";

impl<const N: usize, const K: usize> FiberElement<N, K> {
    /// Creates an element over the global particles `vertices`.
    ///
    /// Rest fiber lengths are taken from `table.endpoints`.
    ///
    /// # Errors
    ///
    /// Returns [`IntegrationError::IndexOutOfRange`] if the table references
    /// a local vertex outside `0..N`, or [`IntegrationError::DegenerateLength`]
    /// if a rest fiber has zero length.
    pub fn new(
        vertices: [usize; N],
        table: FiberTable<K>,
        stiffness: FiberStiffness,
    ) -> Result<Self, IntegrationError> {
        if let Some(&index) = table.faces.iter().flatten().find(|&&v| v >= N) {
            return Err(IntegrationError::IndexOutOfRange {
                law: LAW,
                index,
                len: N,
            });
        }

        let e = &table.endpoints;
        let rest = [
            unit(LAW, e[0] - e[1])?.1,
            unit(LAW, e[2] - e[3])?.1,
            unit(LAW, e[4] - e[5])?.1,
        ];

        Ok(Self {
            vertices,
            table,
            stiffness,
            rest,
            shear: ShearModel::default(),
            volume: None,
        })
    }

    #[must_use]
    pub fn with_shear_model(self, shear: ShearModel) -> Self {
        Self { shear, ..self }
    }

    #[must_use]
    pub fn with_volume(self, volume: VolumeTerm<N>) -> Self {
        Self {
            volume: Some(volume),
            ..self
        }
    }

    pub fn vertices(&self) -> &[usize; N] {
        &self.vertices
    }

    pub fn table(&self) -> &FiberTable<K> {
        &self.table
    }

    pub fn rest_lengths(&self) -> [f64; 3] {
        self.rest
    }

    pub fn shear_model(&self) -> ShearModel {
        self.shear
    }

    pub fn volume(&self) -> Option<&VolumeTerm<N>> {
        self.volume.as_ref()
    }

    /// Forces on the six endpoints, alternating `+F_i` and `-F_i`.
    fn endpoint_forces(
        &self,
        pos: &[Vec3; N],
        vel: &[Vec3; N],
    ) -> Result<[Vec3; 6], IntegrationError> {
        let ends = self.table.interpolate(pos);
        let end_vels = self.table.interpolate(vel);

        let mut n = [Vec3::zeros(); 3];
        let mut f = [Vec3::zeros(); 3];
        for i in 0..3 {
            let (dir, length) = unit(LAW, ends[2 * i] - ends[2 * i + 1])?;
            let v = end_vels[2 * i] - end_vels[2 * i + 1];
            n[i] = dir;
            f[i] = -(self.stiffness.stretch[i] * (length - self.rest[i])
                + self.stiffness.damping[i] * v.dot(&dir))
                * dir;
        }

        let [s12, s13, s23] = self.stiffness.shear;
        let cos12 = n[0].dot(&n[1]);
        let cos13 = n[0].dot(&n[2]);
        let cos23 = n[1].dot(&n[2]);

        let [f1, f2, f3] = match self.shear {
            ShearModel::Projected => {
                let (k12, k13, k23) = (s12 * cos12, s13 * cos13, s23 * cos23);
                // Unit normal to `a` within the plane spanned by `a` and `b`.
                let in_plane = |a: Vec3, b: Vec3| unit(LAW, a.cross(&a.cross(&b))).map(|(u, _)| u);
                let (n112, n212) = (in_plane(n[0], n[1])?, in_plane(n[1], n[0])?);
                let (n113, n313) = (in_plane(n[0], n[2])?, in_plane(n[2], n[0])?);
                let (n223, n323) = (in_plane(n[1], n[2])?, in_plane(n[2], n[1])?);
                [
                    f[0] + k12 * n112 + k13 * n113,
                    f[1] + k12 * n212 + k23 * n223,
                    f[2] + k13 * n313 + k23 * n323,
                ]
            }
            ShearModel::Direct => {
                let (k12, k13, k23) = (-s12 * cos12, -s13 * cos13, -s23 * cos23);
                [
                    f[0] + k12 * n[1] + k13 * n[2],
                    f[1] + k12 * n[0] + k23 * n[2],
                    f[2] + k13 * n[0] + k23 * n[1],
                ]
            }
        };

        Ok([f1, -f1, f2, -f2, f3, -f3])
    }

    fn volume_forces(
        &self,
        volume: &VolumeTerm<N>,
        pos: &[Vec3; N],
        vel: &[Vec3; N],
        out: &mut [Vec3; N],
    ) -> Result<(), IntegrationError> {
        let g = centroid(pos);
        let mut dirs = [Vec3::zeros(); N];
        let mut radii = [0.0; N];
        for i in 0..N {
            (dirs[i], radii[i]) = unit(LAW, pos[i] - g)?;
        }

        match *volume {
            VolumeTerm::Aggregate { stiffness, rest } => {
                let k = -stiffness * (radii.iter().sum::<f64>() - rest);
                for (out, dir) in out.iter_mut().zip(&dirs) {
                    *out += k * *dir;
                }
            }
            VolumeTerm::Radial {
                stiffness,
                damping,
                rest,
            } => {
                let g_vel = centroid(vel);
                for i in 0..N {
                    let v = vel[i] - g_vel;
                    let magnitude =
                        stiffness * (radii[i] - rest[i]) + damping * v.dot(&dirs[i]);
                    out[i] -= magnitude * dirs[i];
                }
            }
        }
        Ok(())
    }
}

impl<const N: usize, const K: usize> ForceLaw for FiberElement<N, K> {
    fn accumulate(
        &self,
        forces: &mut ForceAccumulation<'_>,
        state: &[ParticleState],
    ) -> Result<(), IntegrationError> {
        let states = gather(LAW, state, &self.vertices)?;
        let pos: [Vec3; N] = std::array::from_fn(|i| states[i].pos);
        let vel: [Vec3; N] = std::array::from_fn(|i| states[i].vel);

        let mut local = [Vec3::zeros(); N];
        let endpoint = self.endpoint_forces(&pos, &vel)?;
        for (j, force) in endpoint.iter().enumerate() {
            for (&v, &w) in self.table.faces[j].iter().zip(&self.table.weights[j]) {
                local[v] += w * *force;
            }
        }

        if let Some(volume) = &self.volume {
            self.volume_forces(volume, &pos, &vel, &mut local)?;
        }

        for (&index, force) in self.vertices.iter().zip(local) {
            forces.add(index, force)?;
        }
        Ok(())
    }
}
