//! Volumetric meshes in a whitespace-separated text format.
//!
//! ```text
//! nvertex nelement
//! x y z <tab> constraint      (nvertex lines)
//! i0 i1 ... iK-1              (nelement lines, zero-based)
//! ```
//!
//! Constraint codes follow [`Constraint::from_code`]. Blank lines are
//! ignored.

use std::{collections::HashSet, fs, path::Path, str::FromStr};

use rand::Rng;
use thiserror::Error;
use uom::si::{
    f64::{Mass, MassDensity},
    mass::kilogram,
    mass_density::kilogram_per_cubic_meter,
};

use crate::{
    Constraint, FiberStiffness, FiberElement, Particle, ParticleState, Spring, Vec3,
    setup::{FiberFrame, FiberSetup, SetupError},
};

/// Local vertex pairs joined by a spring in a tetrahedral mesh.
pub const TETRA_EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];

/// Local vertex pairs joined by a spring in a hexahedral mesh.
///
/// The twelve box edges plus the four body diagonals.
pub const HEXA_EDGES: [[usize; 2]; 16] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
    [0, 6],
    [1, 7],
    [2, 4],
    [3, 5],
];

/// Errors raised while reading a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("failed to read mesh file")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: &'static str },

    #[error("line {line}: cannot parse {token:?} as a number")]
    Number { line: usize, token: String },

    #[error("line {line}: unknown constraint code {code}")]
    UnknownConstraint { line: usize, code: u32 },

    #[error("line {line}: vertex {index} does not exist, the mesh has {len}")]
    VertexOutOfRange {
        line: usize,
        index: usize,
        len: usize,
    },

    #[error("expected {expected} {section}, found {found}")]
    Truncated {
        section: &'static str,
        expected: usize,
        found: usize,
    },
}

/// A mesh of elements with `K` vertices each.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh<const K: usize> {
    positions: Vec<Vec3>,
    constraints: Vec<Constraint>,
    elements: Vec<[usize; K]>,
}

pub type TetraMesh = Mesh<4>;
pub type HexaMesh = Mesh<8>;

fn number<T: FromStr>(line: usize, token: &str) -> Result<T, MeshError> {
    token.parse().map_err(|_| MeshError::Number {
        line,
        token: token.to_owned(),
    })
}

impl<const K: usize> Mesh<K> {
    /// Builds a mesh from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Truncated`] if there are fewer constraints than
    /// positions, or [`MeshError::VertexOutOfRange`] (with `line` set to the
    /// element number) if an element references a missing vertex.
    pub fn from_parts(
        positions: Vec<Vec3>,
        constraints: Vec<Constraint>,
        elements: Vec<[usize; K]>,
    ) -> Result<Self, MeshError> {
        if constraints.len() != positions.len() {
            return Err(MeshError::Truncated {
                section: "constraints",
                expected: positions.len(),
                found: constraints.len(),
            });
        }
        let len = positions.len();
        for (number, element) in elements.iter().enumerate() {
            if let Some(&index) = element.iter().find(|&&v| v >= len) {
                return Err(MeshError::VertexOutOfRange {
                    line: number,
                    index,
                    len,
                });
            }
        }
        Ok(Self {
            positions,
            constraints,
            elements,
        })
    }

    /// Parses the text format.
    ///
    /// # Errors
    ///
    /// Returns a [`MeshError`] naming the offending line.
    pub fn parse(text: &str) -> Result<Self, MeshError> {
        let mut lines = text
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());

        let (line, header) = lines.next().ok_or(MeshError::Syntax {
            line: 1,
            reason: "missing header",
        })?;
        let counts: Vec<&str> = header.split_whitespace().collect();
        let [nvertex, nelement] = counts[..] else {
            return Err(MeshError::Syntax {
                line,
                reason: "header must hold the vertex and element counts",
            });
        };
        let nvertex: usize = number(line, nvertex)?;
        let nelement: usize = number(line, nelement)?;

        let mut positions = Vec::with_capacity(nvertex);
        let mut constraints = Vec::with_capacity(nvertex);
        for found in 0..nvertex {
            let (line, text) = lines.next().ok_or(MeshError::Truncated {
                section: "vertices",
                expected: nvertex,
                found,
            })?;
            let tokens: Vec<&str> = text.split_whitespace().collect();
            let [x, y, z, code] = tokens[..] else {
                return Err(MeshError::Syntax {
                    line,
                    reason: "vertex must hold x y z and a constraint code",
                });
            };
            positions.push(Vec3::new(
                number(line, x)?,
                number(line, y)?,
                number(line, z)?,
            ));
            let code: u32 = number(line, code)?;
            let constraint =
                Constraint::from_code(code).ok_or(MeshError::UnknownConstraint { line, code })?;
            constraints.push(constraint);
        }

        let mut elements = Vec::with_capacity(nelement);
        for found in 0..nelement {
            let (line, text) = lines.next().ok_or(MeshError::Truncated {
                section: "elements",
                expected: nelement,
                found,
            })?;
            let tokens: Vec<&str> = text.split_whitespace().collect();
            if tokens.len() != K {
                return Err(MeshError::Syntax {
                    line,
                    reason: "element has the wrong number of vertices",
                });
            }
            let mut element = [0; K];
            for (slot, token) in element.iter_mut().zip(&tokens) {
                let index: usize = number(line, token)?;
                if index >= nvertex {
                    return Err(MeshError::VertexOutOfRange {
                        line,
                        index,
                        len: nvertex,
                    });
                }
                *slot = index;
            }
            elements.push(element);
        }

        if let Some((line, _)) = lines.next() {
            return Err(MeshError::Syntax {
                line,
                reason: "unexpected content after the last element",
            });
        }

        Ok(Self {
            positions,
            constraints,
            elements,
        })
    }

    /// Reads and parses a mesh file.
    ///
    /// # Errors
    ///
    /// Returns [`MeshError::Io`] if the file cannot be read, or any parse
    /// error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let text = fs::read_to_string(path)?;
        let mesh = Self::parse(&text)?;
        tracing::info!(
            vertices = mesh.positions.len(),
            elements = mesh.elements.len(),
            "loaded mesh"
        );
        Ok(mesh)
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn elements(&self) -> &[[usize; K]] {
        &self.elements
    }

    /// Particle states at rest on the mesh vertices.
    pub fn states(&self) -> Vec<ParticleState> {
        self.positions
            .iter()
            .zip(&self.constraints)
            .map(|(&pos, &constraint)| ParticleState::at(pos).with_constraint(constraint))
            .collect()
    }

    /// One particle of the given mass per vertex.
    pub fn particles(&self, mass: Mass) -> Vec<Particle> {
        vec![Particle::with_mass(mass); self.positions.len()]
    }

    /// Vertex positions of element `e`, or `None` if it does not exist.
    pub fn element_positions(&self, e: usize) -> Option<[Vec3; K]> {
        let element = self.elements.get(e)?;
        Some(element.map(|v| self.positions[v]))
    }

    /// Unique undirected edges, in first-seen order and orientation.
    fn unique_edges(&self, table: &[[usize; 2]]) -> Vec<[usize; 2]> {
        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for element in &self.elements {
            for &[a, b] in table {
                let (p0, p1) = (element[a], element[b]);
                if seen.insert((p0.min(p1), p0.max(p1))) {
                    edges.push([p0, p1]);
                }
            }
        }
        edges
    }

    /// Springs along `edges`, each at rest at its current length.
    fn springs_along(&self, edges: &[[usize; 2]], stiffness: f64, damping: f64) -> Vec<Spring> {
        edges
            .iter()
            .map(|&[p0, p1]| {
                let rest = (self.positions[p0] - self.positions[p1]).norm();
                Spring::new(p0, p1, stiffness, rest).with_damping(damping)
            })
            .collect()
    }
}

impl<const K: usize> FromStr for Mesh<K> {
    type Err = MeshError;

    fn from_str(text: &str) -> Result<Self, MeshError> {
        Self::parse(text)
    }
}

impl TetraMesh {
    pub fn edges(&self) -> Vec<[usize; 2]> {
        self.unique_edges(&TETRA_EDGES)
    }

    /// Mass–spring model: one damped spring per unique edge.
    pub fn edge_springs(&self, stiffness: f64, damping: f64) -> Vec<Spring> {
        self.springs_along(&self.edges(), stiffness, damping)
    }

    /// Volume of element `e`, or `None` if it does not exist.
    pub fn element_volume(&self, e: usize) -> Option<f64> {
        let [p0, p1, p2, p3] = self.element_positions(e)?;
        Some((p1 - p0).cross(&(p2 - p0)).dot(&(p3 - p0)).abs() / 6.0)
    }

    /// Total volume of all elements.
    pub fn volume(&self) -> f64 {
        (0..self.elements.len())
            .filter_map(|e| self.element_volume(e))
            .sum()
    }

    /// Particles whose masses lump a quarter of each adjacent element's mass.
    pub fn lumped_masses(&self, density: MassDensity) -> Vec<Particle> {
        let rho = density.get::<kilogram_per_cubic_meter>();
        let mut masses = vec![0.0; self.positions.len()];
        for (e, element) in self.elements.iter().enumerate() {
            let share = 0.25 * rho * self.element_volume(e).unwrap_or(0.0);
            for &v in element {
                masses[v] += share;
            }
        }
        masses.into_iter().map(Particle::new).collect()
    }

    /// One fiber element per tetrahedron, all sharing `frame`.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] for the first element whose fibers cannot be
    /// placed.
    pub fn fiber_springs<R: Rng + ?Sized>(
        &self,
        setup: &FiberSetup,
        frame: &FiberFrame,
        stiffness: FiberStiffness,
        rng: &mut R,
    ) -> Result<Vec<FiberElement<4, 3>>, SetupError> {
        self.elements
            .iter()
            .map(|&element| {
                let positions = element.map(|v| self.positions[v]);
                let table = setup.tetra(&positions, frame, rng)?;
                Ok(FiberElement::new(element, table, stiffness)?)
            })
            .collect()
    }
}

impl HexaMesh {
    pub fn edges(&self) -> Vec<[usize; 2]> {
        self.unique_edges(&HEXA_EDGES)
    }

    /// Mass–spring model: one damped spring per unique edge.
    pub fn edge_springs(&self, stiffness: f64, damping: f64) -> Vec<Spring> {
        self.springs_along(&self.edges(), stiffness, damping)
    }

    /// One fiber element per hexahedron, all sharing `frame`.
    ///
    /// # Errors
    ///
    /// Returns a [`SetupError`] for the first element whose fibers cannot be
    /// placed.
    pub fn fiber_springs<R: Rng + ?Sized>(
        &self,
        setup: &FiberSetup,
        frame: &FiberFrame,
        stiffness: FiberStiffness,
        rng: &mut R,
    ) -> Result<Vec<FiberElement<8, 4>>, SetupError> {
        self.elements
            .iter()
            .map(|&element| {
                let positions = element.map(|v| self.positions[v]);
                let table = setup.hexa(&positions, frame, rng)?;
                Ok(FiberElement::new(element, table, stiffness)?)
            })
            .collect()
    }
}

/// Mass of 10 g given to every vertex when no density is known.
pub fn default_mass() -> Mass {
    Mass::new::<kilogram>(0.01)
}
