use crate::boundary::BcCase;
use crate::geometry::StraightBeamBuilder;
use nalgebra::Vector3;
use ron::{
    from_str,
    ser::{PrettyConfig, to_string_pretty},
};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigErrors {
    #[error("CFL must lie strictly between 0 and 1, got {0}")]
    CflOutOfRange(f64),
    #[error("damping coefficient must be non-negative, got {0}")]
    NegativeDamping(f64),
    #[error("density must be positive, got {0}")]
    NonPositiveDensity(f64),
    #[error("end time must be positive and finite, got {0}")]
    InvalidEndTime(f64),
    #[error("Young's modulus must be positive, got {0}")]
    NonPositiveYoungsModulus(f64),
    #[error("output cadence n_write must be at least 1")]
    NWriteZero,
    #[error("thread count must be at least 1")]
    NThreadsZero,
    #[error("Poisson ratio must lie in (-1, 0.5], got {0}")]
    PoissonRatioOutOfRange(f64),
    #[error("point load applied to node {node} but the beam only has {n_nodes} nodes")]
    PointLoadNodeOutOfRange { node: usize, n_nodes: usize },
    #[error("failed to open file {path:?}: {message}")]
    FileOpen { path: PathBuf, message: String },
    #[error("failed to read file {path:?}: {message}")]
    FileRead { path: PathBuf, message: String },
    #[error("failed to write file {path:?}: {message}")]
    FileWrite { path: PathBuf, message: String },
    #[error("failed to parse RON file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("failed to serialize configuration: {0}")]
    Serialize(String),
}

/// A static load applied at a node. The force is a dead load in the global
/// frame, the moment follows the node and is given in its body frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointLoad {
    pub node: usize,
    #[serde(default = "zero_vector")]
    pub force: Vector3<f64>,
    #[serde(default = "zero_vector")]
    pub moment: Vector3<f64>,
}

impl PointLoad {
    pub fn force(node: usize, force: Vector3<f64>) -> Self {
        Self {
            node,
            force,
            moment: Vector3::zeros(),
        }
    }
}

fn zero_vector() -> Vector3<f64> {
    Vector3::zeros()
}

fn default_cfl() -> f64 {
    0.9
}

fn default_poisson_ratio() -> f64 {
    0.3
}

fn default_n_write() -> usize {
    1000
}

fn default_output_dir() -> Option<PathBuf> {
    Some(PathBuf::from("output"))
}

/// User-facing material and run parameters, as read from the input file.
/// Validated into a [`Config`] before anything is allocated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBuilder {
    pub youngs_modulus: f64,
    pub density: f64,
    #[serde(default = "default_poisson_ratio")]
    pub poisson_ratio: f64,
    #[serde(default = "default_cfl")]
    pub cfl: f64,
    pub t_end: f64,
    #[serde(default)]
    pub bc_case: BcCase,
    #[serde(default = "zero_vector")]
    pub gravity: Vector3<f64>,
    #[serde(default)]
    pub damping: f64,
    #[serde(default)]
    pub point_loads: Vec<PointLoad>,
    #[serde(default = "default_n_write")]
    pub n_write: usize,
    #[serde(default)]
    pub n_threads: Option<usize>,
    #[serde(default = "default_output_dir")]
    pub output_dir: Option<PathBuf>,
}

impl ConfigBuilder {
    /// Steel, clamped at the first node, no gravity.
    pub fn steel(t_end: f64) -> Self {
        Self {
            youngs_modulus: 200e9,
            density: 7850.0,
            poisson_ratio: default_poisson_ratio(),
            cfl: default_cfl(),
            t_end,
            bc_case: BcCase::default(),
            gravity: Vector3::zeros(),
            damping: 0.0,
            point_loads: Vec::new(),
            n_write: default_n_write(),
            n_threads: None,
            output_dir: None,
        }
    }

    pub fn with_bc_case(mut self, bc_case: BcCase) -> Self {
        self.bc_case = bc_case;
        self
    }

    pub fn with_cfl(mut self, cfl: f64) -> Self {
        self.cfl = cfl;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_point_load(mut self, load: PointLoad) -> Self {
        self.point_loads.push(load);
        self
    }

    pub fn build(&self) -> Result<Config, ConfigErrors> {
        Config::try_from(self)
    }
}

/// Runtime parameters. `dt` is filled in by the stability estimator, `n`
/// and `t` are advanced by the time loop.
#[derive(Debug, Clone)]
pub struct Config {
    pub youngs_modulus: f64,
    pub density: f64,
    pub poisson_ratio: f64,
    pub cfl: f64,
    pub dt: f64,
    pub t_end: f64,
    pub t: f64,
    pub n: usize,
    pub bc_case: BcCase,
    pub gravity: Vector3<f64>,
    pub damping: f64,
    pub point_loads: Vec<PointLoad>,
    pub n_write: usize,
    pub n_threads: Option<usize>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    pub fn shear_modulus(&self) -> f64 {
        self.youngs_modulus / (2.0 * (1.0 + self.poisson_ratio))
    }

    /// Bar wave speed `sqrt(E / rho)`.
    pub fn wave_speed(&self) -> f64 {
        (self.youngs_modulus / self.density).sqrt()
    }

    /// Number of steps needed to reach `t_end`, zero until `dt` is set.
    pub fn n_steps(&self) -> usize {
        if self.dt <= 0.0 {
            return 0;
        }
        (self.t_end / self.dt).ceil() as usize
    }

    pub fn validate_point_loads(&self, n_nodes: usize) -> Result<(), ConfigErrors> {
        for load in &self.point_loads {
            if load.node >= n_nodes {
                return Err(ConfigErrors::PointLoadNodeOutOfRange {
                    node: load.node,
                    n_nodes,
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<&ConfigBuilder> for Config {
    type Error = ConfigErrors;

    fn try_from(builder: &ConfigBuilder) -> Result<Self, Self::Error> {
        // negated comparisons so that NaN is rejected too
        if !(builder.cfl > 0.0 && builder.cfl < 1.0) {
            return Err(ConfigErrors::CflOutOfRange(builder.cfl));
        }
        if !(builder.youngs_modulus > 0.0) {
            return Err(ConfigErrors::NonPositiveYoungsModulus(
                builder.youngs_modulus,
            ));
        }
        if !(builder.density > 0.0) {
            return Err(ConfigErrors::NonPositiveDensity(builder.density));
        }
        if !(builder.poisson_ratio > -1.0 && builder.poisson_ratio <= 0.5) {
            return Err(ConfigErrors::PoissonRatioOutOfRange(builder.poisson_ratio));
        }
        if !(builder.damping >= 0.0) {
            return Err(ConfigErrors::NegativeDamping(builder.damping));
        }
        if !(builder.t_end > 0.0 && builder.t_end.is_finite()) {
            return Err(ConfigErrors::InvalidEndTime(builder.t_end));
        }
        if builder.n_write == 0 {
            return Err(ConfigErrors::NWriteZero);
        }
        if builder.n_threads == Some(0) {
            return Err(ConfigErrors::NThreadsZero);
        }

        Ok(Self {
            youngs_modulus: builder.youngs_modulus,
            density: builder.density,
            poisson_ratio: builder.poisson_ratio,
            cfl: builder.cfl,
            dt: 0.0,
            t_end: builder.t_end,
            t: 0.0,
            n: 0,
            bc_case: builder.bc_case,
            gravity: builder.gravity,
            damping: builder.damping,
            point_loads: builder.point_loads.clone(),
            n_write: builder.n_write,
            n_threads: builder.n_threads,
            output_dir: builder.output_dir.clone(),
        })
    }
}

/// Contents of an input file: run parameters plus the beam to build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub config: ConfigBuilder,
    pub geometry: StraightBeamBuilder,
}

impl SimulationInput {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        let mut file = File::open(path).map_err(|e| ConfigErrors::FileOpen {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ConfigErrors::FileRead {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        from_str(&contents).map_err(|e| ConfigErrors::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigErrors> {
        let ron_string = to_string_pretty(self, PrettyConfig::new())
            .map_err(|e| ConfigErrors::Serialize(e.to_string()))?;

        let mut file = File::create(path).map_err(|e| ConfigErrors::FileOpen {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        file.write_all(ron_string.as_bytes())
            .map_err(|e| ConfigErrors::FileWrite {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    const TOL: f64 = 1e-12;

    #[test]
    fn test_cfl_bounds() {
        for cfl in [0.0, 1.0, 1.5, -0.2, f64::NAN] {
            let result = ConfigBuilder::steel(1.0).with_cfl(cfl).build();
            assert!(matches!(result, Err(ConfigErrors::CflOutOfRange(_))));
        }
        assert!(ConfigBuilder::steel(1.0).with_cfl(0.5).build().is_ok());
    }

    #[test]
    fn test_material_validation() {
        let mut builder = ConfigBuilder::steel(1.0);
        builder.youngs_modulus = 0.0;
        assert!(matches!(
            builder.build(),
            Err(ConfigErrors::NonPositiveYoungsModulus(_))
        ));

        let mut builder = ConfigBuilder::steel(1.0);
        builder.density = -1.0;
        assert!(matches!(
            builder.build(),
            Err(ConfigErrors::NonPositiveDensity(_))
        ));

        let mut builder = ConfigBuilder::steel(1.0);
        builder.poisson_ratio = 0.7;
        assert!(matches!(
            builder.build(),
            Err(ConfigErrors::PoissonRatioOutOfRange(_))
        ));

        let builder = ConfigBuilder::steel(1.0).with_damping(-0.1);
        assert!(matches!(
            builder.build(),
            Err(ConfigErrors::NegativeDamping(_))
        ));

        let mut builder = ConfigBuilder::steel(1.0);
        builder.n_write = 0;
        assert!(matches!(builder.build(), Err(ConfigErrors::NWriteZero)));
    }

    #[test]
    fn test_end_time_validation() {
        for t_end in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            assert!(matches!(
                ConfigBuilder::steel(t_end).build(),
                Err(ConfigErrors::InvalidEndTime(_))
            ));
        }
        assert!(ConfigBuilder::steel(1e-3).build().is_ok());
    }

    #[test]
    fn test_derived_quantities() {
        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        assert_abs_diff_eq!(config.shear_modulus(), 200e9 / 2.6, epsilon = 1.0);
        assert_abs_diff_eq!(
            config.wave_speed(),
            (200e9_f64 / 7850.0).sqrt(),
            epsilon = TOL
        );

        assert_eq!(config.n_steps(), 0);
        config.dt = 0.3;
        assert_eq!(config.n_steps(), 4);
        config.dt = 0.25;
        assert_eq!(config.n_steps(), 4);
    }

    #[test]
    fn test_point_load_node_range() {
        let config = ConfigBuilder::steel(1.0)
            .with_point_load(PointLoad::force(5, Vector3::new(0.0, 1.0, 0.0)))
            .build()
            .unwrap();
        assert!(config.validate_point_loads(6).is_ok());
        assert!(matches!(
            config.validate_point_loads(5),
            Err(ConfigErrors::PointLoadNodeOutOfRange { node: 5, n_nodes: 5 })
        ));
    }

    #[test]
    fn test_input_round_trip() {
        let input = SimulationInput {
            config: ConfigBuilder::steel(0.5)
                .with_bc_case(BcCase::RotatingTop {
                    angular_velocity: 2.0,
                })
                .with_gravity(Vector3::new(0.0, -9.81, 0.0))
                .with_point_load(PointLoad::force(3, Vector3::new(1.0, 0.0, 0.0))),
            geometry: StraightBeamBuilder::new(2.0, 4, 0.05),
        };

        let text = to_string_pretty(&input, PrettyConfig::new()).unwrap();
        let parsed: SimulationInput = from_str(&text).unwrap();

        assert_eq!(parsed.config.bc_case, input.config.bc_case);
        assert_eq!(parsed.config.point_loads, input.config.point_loads);
        assert_abs_diff_eq!(parsed.config.gravity, input.config.gravity, epsilon = TOL);
        assert_eq!(parsed.geometry.n_elements, 4);
        assert_abs_diff_eq!(parsed.geometry.length, 2.0, epsilon = TOL);
    }

    #[test]
    fn test_load_demo_inputs() {
        let demos = Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos");

        let input = SimulationInput::load(&demos.join("cantilever.ron")).unwrap();
        let config = input.config.build().unwrap();
        assert_eq!(config.bc_case, BcCase::Cantilever);
        assert_eq!(config.point_loads.len(), 1);
        assert_abs_diff_eq!(config.point_loads[0].moment, Vector3::zeros(), epsilon = TOL);
        assert!(input.geometry.build().is_ok());

        let input = SimulationInput::load(&demos.join("rotating_drill_string.ron")).unwrap();
        let config = input.config.build().unwrap();
        assert_eq!(
            config.bc_case,
            BcCase::RotatingTop {
                angular_velocity: 10.0
            }
        );
        assert_eq!(config.n_threads, Some(4));
        assert_abs_diff_eq!(config.poisson_ratio, 0.3, epsilon = TOL);
        assert_abs_diff_eq!(input.geometry.direction, Vector3::new(0.0, 0.0, -1.0), epsilon = TOL);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SimulationInput::load(Path::new("does/not/exist.ron"));
        assert!(matches!(result, Err(ConfigErrors::FileOpen { .. })));
    }
}
