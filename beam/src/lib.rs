//! Explicit corotational beam dynamics.
//!
//! Nodes carry a translation and a unit-quaternion triad. Each step the
//! internal forces are assembled from the current state, the central
//! difference integrator advances velocities then positions and triads, and
//! the boundary conditions overwrite the constrained degrees of freedom.

pub mod assembly;
pub mod boundary;
pub mod config;
pub mod geometry;
pub mod integrator;
pub mod loads;
pub mod output;
pub mod solver;
pub mod stability;
pub mod state;

use config::ConfigErrors;
use geometry::GeometryErrors;
use output::OutputErrors;
use stability::StabilityErrors;
use thiserror::Error;

pub mod prelude {
    pub use crate::BeamErrors;
    pub use crate::boundary::{BcCase, set_simple_bc};
    pub use crate::config::{Config, ConfigBuilder, PointLoad, SimulationInput};
    pub use crate::geometry::{CrossSection, Geometry, StraightBeam, StraightBeamBuilder};
    pub use crate::output::SnapshotWriter;
    pub use crate::solver::{RunOptions, Simulation, SolveSummary};
    pub use crate::stability::{StabilityEstimate, calc_dt};
    pub use crate::state::{BeamSystem, RotationalInertia, Vec3Quat, Vec3Vec3};
}

#[derive(Debug, Error)]
pub enum BeamErrors {
    #[error("{0}")]
    Config(#[from] ConfigErrors),
    #[error("{0}")]
    Geometry(#[from] GeometryErrors),
    #[error("{0}")]
    Output(#[from] OutputErrors),
    #[error("{0}")]
    Stability(#[from] StabilityErrors),
    #[error("could not build the worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
