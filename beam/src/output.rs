use crate::config::Config;
use crate::geometry::Geometry;
use crate::state::BeamSystem;
use csv::{Writer, WriterBuilder};
use rotations::prelude::*;
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputErrors {
    #[error("failed to create output directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create snapshot {path:?}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Csv(#[from] csv::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

pub type SnapshotCsv = Writer<BufWriter<File>>;

pub const RUN_HEADERS: [&str; 5] = ["N", "n_steps", "n_write", "t", "dt"];

pub const NODAL_MARKER: &str = "nodal data";

pub const NODAL_HEADERS: [&str; 21] = [
    "x0", "y0", "z0", "ux", "uy", "uz", "t11", "t12", "t13", "t21", "t22", "t23", "t31",
    "t32", "t33", "vx", "vy", "vz", "wx", "wy", "wz",
];

/// Writes one CSV file per output step into a fixed directory.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    dir: PathBuf,
    n_write: usize,
}

impl SnapshotWriter {
    /// Creates the output directory if it does not exist yet.
    pub fn new(dir: &Path, n_write: usize) -> Result<Self, OutputErrors> {
        std::fs::create_dir_all(dir).map_err(|source| OutputErrors::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            n_write: n_write.max(1),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_output_step(&self, n: usize) -> bool {
        n % self.n_write == 0
    }

    pub fn snapshot_path(&self, n: usize) -> PathBuf {
        self.dir.join(format!("{n}.csv"))
    }

    /// Writes the state at step `config.n` to `<dir>/<n>.csv`. Reads the
    /// state only.
    pub fn write(
        &self,
        config: &Config,
        geometry: &impl Geometry,
        system: &BeamSystem,
    ) -> Result<PathBuf, OutputErrors> {
        let path = self.snapshot_path(config.n);
        let file = File::create(&path).map_err(|source| OutputErrors::CreateFile {
            path: path.clone(),
            source,
        })?;
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .from_writer(BufWriter::new(file));

        writer.write_record(RUN_HEADERS)?;
        writer.write_record([
            system.n_nodes().to_string(),
            config.n_steps().to_string(),
            config.n_write.to_string(),
            config.t.to_string(),
            config.dt.to_string(),
        ])?;
        writer.write_record([NODAL_MARKER])?;
        writer.write_record(NODAL_HEADERS)?;

        for i in 0..system.n_nodes() {
            writer.write_record(nodal_record(geometry, system, i))?;
        }
        writer.flush()?;
        Ok(path)
    }
}

fn nodal_record(geometry: &impl Geometry, system: &BeamSystem, i: usize) -> Vec<String> {
    let x0 = geometry.x0(i);
    let u = &system.u[i];
    let v = &system.v[i];
    let triad = RotationMatrix::from(&u.rot).row_major();

    x0.iter()
        .chain(u.trans.iter())
        .chain(triad.iter())
        .chain(v.trans.iter())
        .chain(v.rot.iter())
        .map(|value| value.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::geometry::{CrossSection, StraightBeam};
    use nalgebra::Vector3;
    use std::f64::consts::PI;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("corobeam_{name}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_output_cadence() {
        let dir = scratch_dir("cadence");
        let writer = SnapshotWriter::new(&dir, 25).unwrap();
        assert!(dir.is_dir());
        assert_eq!(writer.dir(), dir.as_path());
        assert!(writer.is_output_step(0));
        assert!(!writer.is_output_step(24));
        assert!(writer.is_output_step(50));
        assert_eq!(writer.snapshot_path(50), dir.join("50.csv"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_snapshot_layout() {
        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        config.dt = 0.25;
        config.n = 2;
        config.t = 0.5;
        config.n_write = 2;
        let section = CrossSection::tube(0.02, 0.0).unwrap();
        let geometry = StraightBeam::along_x(2.0, 2, section).unwrap();
        let mut system = BeamSystem::new(&config, &geometry);
        system.u[2].trans = Vector3::new(0.0, 0.5, 0.0);
        system.u[2].rot = Quaternion::from_pseudo_vector(&Vector3::new(0.0, 0.0, PI / 2.0));
        system.v[1].rot = Vector3::new(7.0, 0.0, 0.0);

        let dir = scratch_dir("layout");
        let writer = SnapshotWriter::new(&dir, config.n_write).unwrap();
        let path = writer.write(&config, &geometry, &system).unwrap();
        assert_eq!(path, dir.join("2.csv"));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4 + 3);
        assert_eq!(lines[0], "N,n_steps,n_write,t,dt");
        assert_eq!(lines[1], "3,4,2,0.5,0.25");
        assert_eq!(lines[2], NODAL_MARKER);
        assert_eq!(lines[3].split(',').count(), 21);

        let last: Vec<f64> = lines[6]
            .split(',')
            .map(|value| value.parse().unwrap())
            .collect();
        assert_eq!(last.len(), 21);
        assert!((last[0] - 2.0).abs() < 1e-12);
        assert!((last[4] - 0.5).abs() < 1e-12);
        // first row of a quarter turn about z is (0, -1, 0)
        assert!((last[7] + 1.0).abs() < 1e-12);
        assert!((last[9] - 1.0).abs() < 1e-12);

        let middle: Vec<f64> = lines[5]
            .split(',')
            .map(|value| value.parse().unwrap())
            .collect();
        assert!((middle[18] - 7.0).abs() < 1e-12);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
