use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryErrors {
    #[error("beam length must be positive, got {0}")]
    NonPositiveLength(f64),
    #[error("beam needs at least one element")]
    NoElements,
    #[error("outer diameter must be positive, got {0}")]
    NonPositiveDiameter(f64),
    #[error("inner diameter {inner} must be non-negative and smaller than the outer diameter {outer}")]
    InvalidInnerDiameter { inner: f64, outer: f64 },
    #[error("cross section area and second moment must be positive, got A = {area}, I = {second_moment}")]
    NonPositiveSection { area: f64, second_moment: f64 },
    #[error("beam direction must be a non-zero vector")]
    ZeroDirection,
}

/// Read-only access to the discretized beam. Only the per-element
/// accessors and the node positions are required, the rest have defaults
/// for a chain of straight two-node elements.
pub trait Geometry: Send + Sync {
    fn n_nodes(&self) -> usize;

    fn n_elements(&self) -> usize;

    /// Reference (undeformed) position of node `i`.
    fn x0(&self, i: usize) -> Vector3<f64>;

    /// Cross section area of element `ie`.
    fn a_e(&self, ie: usize) -> f64;

    /// Second moment of area of element `ie`, equal about both bending axes.
    fn i_e(&self, ie: usize) -> f64;

    /// Polar moment of element `ie`.
    fn j_e(&self, ie: usize) -> f64 {
        2.0 * self.i_e(ie)
    }

    fn element_nodes(&self, ie: usize) -> (usize, usize) {
        (ie, ie + 1)
    }

    /// Reference length of element `ie`.
    fn dx_e(&self, ie: usize) -> f64 {
        let (i, j) = self.element_nodes(ie);
        (self.x0(j) - self.x0(i)).norm()
    }

    /// Reference triad of element `ie`. Columns are the element axis and
    /// the two bending axes.
    fn reference_triad(&self, ie: usize) -> Matrix3<f64> {
        let (i, j) = self.element_nodes(ie);
        triad_from_axis(&(self.x0(j) - self.x0(i)))
    }
}

/// Orthonormal right-handed triad whose first column is along `axis`. The
/// second column is the global axis least aligned with `axis`,
/// orthogonalized. A zero axis gives the identity.
pub fn triad_from_axis(axis: &Vector3<f64>) -> Matrix3<f64> {
    let norm = axis.norm();
    if norm < f64::EPSILON {
        return Matrix3::identity();
    }
    let e1 = axis / norm;

    let mut k = 0;
    for idx in 1..3 {
        if e1[idx].abs() < e1[k].abs() {
            k = idx;
        }
    }
    let mut g = Vector3::zeros();
    g[k] = 1.0;

    let e2 = (g - e1 * e1.dot(&g)).normalize();
    let e3 = e1.cross(&e2);
    Matrix3::from_columns(&[e1, e2, e3])
}

/// Section properties shared by every element of a uniform beam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSection {
    pub area: f64,
    pub second_moment: f64,
    pub polar_moment: f64,
}

impl CrossSection {
    pub fn new(area: f64, second_moment: f64) -> Result<Self, GeometryErrors> {
        if !(area > 0.0 && second_moment > 0.0) {
            return Err(GeometryErrors::NonPositiveSection {
                area,
                second_moment,
            });
        }
        Ok(Self {
            area,
            second_moment,
            polar_moment: 2.0 * second_moment,
        })
    }

    /// Circular tube. `inner_diameter = 0` gives a solid rod.
    pub fn tube(outer_diameter: f64, inner_diameter: f64) -> Result<Self, GeometryErrors> {
        if !(outer_diameter > 0.0) {
            return Err(GeometryErrors::NonPositiveDiameter(outer_diameter));
        }
        if !(inner_diameter >= 0.0 && inner_diameter < outer_diameter) {
            return Err(GeometryErrors::InvalidInnerDiameter {
                inner: inner_diameter,
                outer: outer_diameter,
            });
        }
        let d2 = outer_diameter.powi(2) - inner_diameter.powi(2);
        let d4 = outer_diameter.powi(4) - inner_diameter.powi(4);
        Self::new(PI / 4.0 * d2, PI / 64.0 * d4)
    }

    pub fn radius_of_gyration(&self) -> f64 {
        (self.second_moment / self.area).sqrt()
    }
}

fn unit_x() -> Vector3<f64> {
    Vector3::x()
}

fn zero_vector() -> Vector3<f64> {
    Vector3::zeros()
}

/// Input-file description of a straight uniform tube.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StraightBeamBuilder {
    pub length: f64,
    pub n_elements: usize,
    pub outer_diameter: f64,
    #[serde(default)]
    pub inner_diameter: f64,
    #[serde(default = "unit_x")]
    pub direction: Vector3<f64>,
    #[serde(default = "zero_vector")]
    pub origin: Vector3<f64>,
}

impl StraightBeamBuilder {
    /// Solid rod along the global x axis starting at the origin.
    pub fn new(length: f64, n_elements: usize, outer_diameter: f64) -> Self {
        Self {
            length,
            n_elements,
            outer_diameter,
            inner_diameter: 0.0,
            direction: unit_x(),
            origin: zero_vector(),
        }
    }

    pub fn with_inner_diameter(mut self, inner_diameter: f64) -> Self {
        self.inner_diameter = inner_diameter;
        self
    }

    pub fn with_direction(mut self, direction: Vector3<f64>) -> Self {
        self.direction = direction;
        self
    }

    pub fn build(&self) -> Result<StraightBeam, GeometryErrors> {
        let section = CrossSection::tube(self.outer_diameter, self.inner_diameter)?;
        StraightBeam::new(
            self.origin,
            self.direction,
            self.length,
            self.n_elements,
            section,
        )
    }
}

/// Uniform straight beam split into equal elements.
#[derive(Debug, Clone)]
pub struct StraightBeam {
    nodes: Vec<Vector3<f64>>,
    section: CrossSection,
    triad: Matrix3<f64>,
}

impl StraightBeam {
    pub fn new(
        origin: Vector3<f64>,
        direction: Vector3<f64>,
        length: f64,
        n_elements: usize,
        section: CrossSection,
    ) -> Result<Self, GeometryErrors> {
        if !(length > 0.0) {
            return Err(GeometryErrors::NonPositiveLength(length));
        }
        if n_elements == 0 {
            return Err(GeometryErrors::NoElements);
        }
        let norm = direction.norm();
        if !(norm > f64::EPSILON) {
            return Err(GeometryErrors::ZeroDirection);
        }
        let axis = direction / norm;
        let dx = length / n_elements as f64;

        let nodes = (0..=n_elements)
            .map(|i| origin + axis * (dx * i as f64))
            .collect();

        Ok(Self {
            nodes,
            section,
            triad: triad_from_axis(&axis),
        })
    }

    /// Beam along the global x axis from the origin.
    pub fn along_x(
        length: f64,
        n_elements: usize,
        section: CrossSection,
    ) -> Result<Self, GeometryErrors> {
        Self::new(Vector3::zeros(), Vector3::x(), length, n_elements, section)
    }

    pub fn section(&self) -> &CrossSection {
        &self.section
    }

    pub fn length(&self) -> f64 {
        match (self.nodes.first(), self.nodes.last()) {
            (Some(first), Some(last)) => (last - first).norm(),
            _ => 0.0,
        }
    }
}

impl Geometry for StraightBeam {
    fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn n_elements(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    fn x0(&self, i: usize) -> Vector3<f64> {
        self.nodes[i]
    }

    fn a_e(&self, _ie: usize) -> f64 {
        self.section.area
    }

    fn i_e(&self, _ie: usize) -> f64 {
        self.section.second_moment
    }

    fn j_e(&self, _ie: usize) -> f64 {
        self.section.polar_moment
    }

    fn reference_triad(&self, _ie: usize) -> Matrix3<f64> {
        self.triad
    }
}
