//! Placement of fiber endpoints on element faces.
//!
//! A fiber element needs six endpoints, two per fiber axis, located where the
//! axes leave the element. [`FiberSetup`] casts rays from the element
//! centroid along a [`FiberFrame`] and records the face hit by each ray as
//! local vertex indices plus interpolation weights.

use std::f64::consts::{FRAC_PI_2, PI};

use rand::Rng;
use sinew_core::{IntegrationError, MIN_LENGTH};
use thiserror::Error;

use crate::{FiberTable, Vec3};

/// Triangular faces of a tetrahedron, as local vertex indices.
pub const TETRA_FACES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];

/// Quadrilateral faces of a hexahedron, as local vertex indices.
///
/// Each quad is walked in order, so `q1 - q0` and `q3 - q0` span the face.
pub const HEXA_QUADS: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 4, 7, 3],
    [1, 5, 6, 2],
    [4, 5, 1, 0],
    [7, 6, 2, 3],
];

/// Errors raised while placing fibers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    #[error("fiber frame axes are degenerate")]
    DegenerateFrame,

    #[error("fiber direction {axis} hit no face after {attempts} attempts")]
    Missed { axis: usize, attempts: usize },

    #[error("invalid setup config: {reason}")]
    InvalidConfig { reason: &'static str },

    #[error(transparent)]
    Element(#[from] IntegrationError),
}

/// Ray parameter and barycentric coordinates of a ray–triangle hit.
///
/// The hit point is `orig + t·dir = (1 - u - v)·v0 + u·v1 + v·v2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub t: f64,
    pub u: f64,
    pub v: f64,
}

const EPSILON: f64 = 1e-12;

/// Intersects the ray `orig + t·dir` with a triangle (Möller–Trumbore).
///
/// Only hits strictly in front of the origin (`t > 0`) are reported. Rays
/// parallel to the triangle never hit.
pub fn intersect_triangle(orig: Vec3, dir: Vec3, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<Hit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let p = dir.cross(&edge2);
    let det = edge1.dot(&p);
    if det.abs() < EPSILON {
        return None;
    }
    let inv_det = 1.0 / det;

    let s = orig - v0;
    let u = s.dot(&p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = dir.dot(&q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(&q) * inv_det;
    (t > EPSILON).then_some(Hit { t, u, v })
}

/// Three fiber axes, each of unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiberFrame {
    axes: [Vec3; 3],
}

impl FiberFrame {
    /// Builds a frame from three axes, normalizing each.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DegenerateFrame`] if an axis has zero length.
    pub fn from_axes(axes: [Vec3; 3]) -> Result<Self, SetupError> {
        let mut normalized = [Vec3::zeros(); 3];
        for (unit, axis) in normalized.iter_mut().zip(axes) {
            let length = axis.norm();
            if !(length >= MIN_LENGTH) {
                return Err(SetupError::DegenerateFrame);
            }
            *unit = axis / length;
        }
        Ok(Self { axes: normalized })
    }

    /// Tetrahedral frame: the first axis points along `(azimuth, elevation)`
    /// and the others are completed against the x axis.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DegenerateFrame`] if the first axis is parallel
    /// to the x axis.
    pub fn tetra(azimuth: f64, elevation: f64) -> Result<Self, SetupError> {
        let f1 = Vec3::new(
            azimuth.cos() * elevation.cos(),
            elevation.sin(),
            azimuth.sin() * elevation.cos(),
        );
        let f2 = f1.cross(&Vec3::x());
        let f3 = f1.cross(&f2);
        Self::from_axes([f1, f2, f3])
    }

    /// Tetrahedral frame with azimuth in `[0, π)` and elevation in
    /// `[-π/2, π/2)`, drawn uniformly.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DegenerateFrame`] in the measure-zero case where
    /// the first axis falls on the x axis.
    pub fn random_tetra<R: Rng + ?Sized>(rng: &mut R) -> Result<Self, SetupError> {
        let azimuth = rng.r#gen::<f64>() * PI;
        let elevation = rng.r#gen::<f64>() * PI - FRAC_PI_2;
        Self::tetra(azimuth, elevation)
    }

    /// Hexahedral frame: the first and third axes are rotated by `azimuth`
    /// about y and tilted by `elevation`; the second completes them.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::DegenerateFrame`] if the elevation makes the
    /// first and third axes parallel.
    pub fn hexa(azimuth: f64, elevation: f64) -> Result<Self, SetupError> {
        let (sa, ca) = azimuth.sin_cos();
        let (se, ce) = elevation.sin_cos();
        let f1 = Vec3::new(ca * ce, se, sa * ce);
        let f3 = Vec3::new(-sa * ce, se, ca * ce);
        let f2 = f3.cross(&f1);
        Self::from_axes([f1, f2, f3])
    }

    pub fn axes(&self) -> &[Vec3; 3] {
        &self.axes
    }

    /// Ray directions for the six endpoints, alternating `+f_i` and `-f_i`.
    pub fn directions(&self) -> [Vec3; 6] {
        let [f1, f2, f3] = self.axes;
        [f1, -f1, f2, -f2, f3, -f3]
    }
}

/// Ray casting parameters for fiber placement.
///
/// A ray that hits no face (typically by grazing an edge) is retried with
/// its direction perturbed by up to `perturbation` along each coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde-derive",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct FiberSetup {
    pub perturbation: f64,
    pub max_attempts: usize,
}

impl Default for FiberSetup {
    fn default() -> Self {
        Self {
            perturbation: 1e-6,
            max_attempts: 1000,
        }
    }
}

struct Landing<const K: usize> {
    face: [usize; K],
    weights: [f64; K],
    point: Vec3,
}

impl FiberSetup {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the perturbation is negative or not finite, or if
    /// no attempt is allowed.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.perturbation.is_finite() || self.perturbation < 0.0 {
            return Err("perturbation must be finite and non-negative");
        }
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1");
        }
        Ok(())
    }

    /// Places the fibers of a tetrahedron with barycentric weights.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Missed`] if a direction keeps missing every face,
    /// or [`SetupError::InvalidConfig`] if this setup is invalid.
    pub fn tetra<R: Rng + ?Sized>(
        &self,
        positions: &[Vec3; 4],
        frame: &FiberFrame,
        rng: &mut R,
    ) -> Result<FiberTable<3>, SetupError> {
        self.place(positions, frame, rng, |orig, dir| {
            TETRA_FACES.iter().find_map(|&face| {
                let [a, b, c] = face.map(|v| positions[v]);
                let hit = intersect_triangle(orig, dir, a, b, c)?;
                let weights = [1.0 - hit.u - hit.v, hit.u, hit.v];
                Some(Ok(Landing {
                    face,
                    weights,
                    point: weights[0] * a + weights[1] * b + weights[2] * c,
                }))
            })
        })
    }

    /// Places the fibers of a hexahedron with bilinear weights.
    ///
    /// Each quad is tested as the triangles `(q0, q1, q2)` and `(q0, q2, q3)`.
    /// The hit is projected on the edges `q1 - q0` and `q3 - q0`, and the rest
    /// endpoint is the bilinear point for those coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError::Missed`] if a direction keeps missing every face,
    /// [`SetupError::Element`] if a hit face has a zero-length edge, or
    /// [`SetupError::InvalidConfig`] if this setup is invalid.
    pub fn hexa<R: Rng + ?Sized>(
        &self,
        positions: &[Vec3; 8],
        frame: &FiberFrame,
        rng: &mut R,
    ) -> Result<FiberTable<4>, SetupError> {
        self.place(positions, frame, rng, |orig, dir| {
            HEXA_QUADS.iter().find_map(|&face| {
                let q = face.map(|v| positions[v]);
                let point = intersect_triangle(orig, dir, q[0], q[1], q[2])
                    .map(|hit| (1.0 - hit.u - hit.v) * q[0] + hit.u * q[1] + hit.v * q[2])
                    .or_else(|| {
                        intersect_triangle(orig, dir, q[0], q[2], q[3])
                            .map(|hit| (1.0 - hit.u - hit.v) * q[0] + hit.u * q[2] + hit.v * q[3])
                    })?;
                Some(bilinear(face, &q, point))
            })
        })
    }

    fn place<const N: usize, const K: usize, R, F>(
        &self,
        positions: &[Vec3; N],
        frame: &FiberFrame,
        rng: &mut R,
        land: F,
    ) -> Result<FiberTable<K>, SetupError>
    where
        R: Rng + ?Sized,
        F: Fn(Vec3, Vec3) -> Option<Result<Landing<K>, SetupError>>,
    {
        self.validate()
            .map_err(|reason| SetupError::InvalidConfig { reason })?;

        let centroid = positions.iter().fold(Vec3::zeros(), |sum, p| sum + p) / N as f64;

        let mut table = FiberTable {
            faces: [[0; K]; 6],
            weights: [[0.0; K]; 6],
            endpoints: [Vec3::zeros(); 6],
        };

        for (axis, base) in frame.directions().into_iter().enumerate() {
            let mut dir = base;
            let mut attempts = 0;
            let landing = loop {
                attempts += 1;
                if let Some(landing) = land(centroid, dir) {
                    break landing?;
                }
                if attempts >= self.max_attempts {
                    return Err(SetupError::Missed { axis, attempts });
                }
                tracing::debug!(axis, attempts, "fiber ray missed, perturbing");
                let jitter = Vec3::new(rng.r#gen(), rng.r#gen(), rng.r#gen());
                dir = base + self.perturbation * jitter;
            };

            table.faces[axis] = landing.face;
            table.weights[axis] = landing.weights;
            table.endpoints[axis] = landing.point;
        }

        Ok(table)
    }
}

fn bilinear(
    face: [usize; 4],
    q: &[Vec3; 4],
    point: Vec3,
) -> Result<Landing<4>, SetupError> {
    let l = point - q[0];
    let l1 = q[1] - q[0];
    let l3 = q[3] - q[0];
    for edge in [l1, l3] {
        let length = edge.norm();
        if length < MIN_LENGTH {
            return Err(IntegrationError::DegenerateLength {
                law: "fiber setup",
                length,
            }
            .into());
        }
    }

    let s = l.dot(&l1) / l1.norm_squared();
    let r = l.dot(&l3) / l3.norm_squared();
    let weights = [(1.0 - s) * (1.0 - r), s * (1.0 - r), s * r, (1.0 - s) * r];
    let point = weights
        .iter()
        .zip(q)
        .fold(Vec3::zeros(), |sum, (&w, &p)| sum + w * p);

    Ok(Landing {
        face,
        weights,
        point,
    })
}
