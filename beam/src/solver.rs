use crate::BeamErrors;
use crate::assembly::{assemble, strain_energy};
use crate::boundary::set_simple_bc;
use crate::config::Config;
use crate::geometry::Geometry;
use crate::integrator::step_central_differences;
use crate::loads::calc_static_loads;
use crate::output::SnapshotWriter;
use crate::stability::{StabilityEstimate, calc_dt};
use crate::state::{BeamSystem, Vec3Vec3};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Console behaviour of a full run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub show_progress: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SolveSummary {
    pub n_steps: usize,
    pub dt: f64,
    pub t_end: f64,
    pub snapshots: usize,
    pub kinetic_energy: f64,
    pub strain_energy: f64,
    pub elapsed: Duration,
}

/// A beam ready to be marched in time: validated configuration, geometry,
/// nodal state and the timestep estimate.
pub struct Simulation<G: Geometry> {
    pub config: Config,
    pub geometry: G,
    pub system: BeamSystem,
    pub stability: StabilityEstimate,
    r_ext: Vec<Vec3Vec3>,
}

impl<G: Geometry> Simulation<G> {
    /// Allocates the state, fixes the timestep, fills the static loads and
    /// applies the boundary conditions at `t = 0`.
    pub fn new(mut config: Config, geometry: G) -> Result<Self, BeamErrors> {
        let stability = calc_dt(&mut config, &geometry)?;
        info!(
            "dt = {:.3e} s (CFL {} of {:.3e} s, element {}, axial {:.3e} s, bending {:.3e} s)",
            stability.dt,
            config.cfl,
            stability.dt_critical,
            stability.governing_element,
            stability.crit_axial,
            stability.crit_bending,
        );

        let mut system = BeamSystem::new(&config, &geometry);
        calc_static_loads(&config, &geometry, &mut system.r_static)?;
        config.n = 0;
        config.t = 0.0;
        set_simple_bc(config.bc_case, 0.0, &geometry, &mut system.u, &mut system.v);

        let r_ext = vec![Vec3Vec3::zeros(); system.n_nodes()];
        Ok(Self {
            config,
            geometry,
            system,
            stability,
            r_ext,
        })
    }

    /// Prescribed nodal loads added on top of the assembled forces. They stay
    /// in place until changed. Rotational entries are body-frame moments.
    pub fn prescribed_loads_mut(&mut self) -> &mut [Vec3Vec3] {
        &mut self.r_ext
    }

    /// Advances the state from step `n` to `n + 1`.
    ///
    /// # Returns
    ///
    /// The strain energy of the state at step `n`.
    pub fn step(&mut self) -> f64 {
        let dt = self.config.dt;
        let energy = assemble(&self.config, &self.geometry, &mut self.system);

        let system = &mut self.system;
        step_central_differences(
            dt,
            &mut system.u,
            &mut system.v,
            &system.m_inv,
            &system.j_u,
            &system.r,
            &self.r_ext,
        );

        self.config.n += 1;
        self.config.t = self.config.n as f64 * dt;
        set_simple_bc(
            self.config.bc_case,
            self.config.t,
            &self.geometry,
            &mut system.u,
            &mut system.v,
        );
        energy
    }

    pub fn run_steps(&mut self, n_steps: usize) {
        for _ in 0..n_steps {
            self.step();
        }
    }

    pub fn kinetic_energy(&self) -> f64 {
        self.system.kinetic_energy()
    }

    pub fn strain_energy(&self) -> f64 {
        strain_energy(&self.config, &self.geometry, &self.system.u)
    }

    /// Runs from the current step to `t_end`, writing a snapshot every
    /// `n_write` steps and at the final step. Uses a dedicated thread pool
    /// when `n_threads` is set.
    pub fn solve(&mut self, options: &RunOptions) -> Result<SolveSummary, BeamErrors> {
        let writer = match &self.config.output_dir {
            Some(dir) => {
                let writer = SnapshotWriter::new(dir, self.config.n_write)?;
                info!(
                    "writing snapshots to {:?} every {} steps",
                    writer.dir(),
                    self.config.n_write
                );
                Some(writer)
            }
            None => None,
        };

        match self.config.n_threads {
            Some(n_threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n_threads)
                    .build()?;
                info!("running on {n_threads} worker threads");
                pool.install(|| self.time_loop(writer.as_ref(), options))
            }
            None => self.time_loop(writer.as_ref(), options),
        }
    }

    fn time_loop(
        &mut self,
        writer: Option<&SnapshotWriter>,
        options: &RunOptions,
    ) -> Result<SolveSummary, BeamErrors> {
        let n_steps = self.config.n_steps();
        let start = Instant::now();
        info!(
            "simulating {:.4} s in {} steps on {} nodes",
            self.config.t_end,
            n_steps,
            self.system.n_nodes()
        );

        let bar = if options.show_progress {
            let bar = ProgressBar::new(n_steps as u64);
            let style = ProgressStyle::with_template(
                "{msg} [{elapsed_precise}] {bar:50.cyan/blue} {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar.set_message("corobeam");
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut snapshots = 0;
        let mut energy = 0.0;
        while self.config.n <= n_steps {
            if let Some(writer) = writer {
                if writer.is_output_step(self.config.n) || self.config.n == n_steps {
                    let path = writer.write(&self.config, &self.geometry, &self.system)?;
                    debug!("wrote {path:?}");
                    snapshots += 1;
                }
            }
            if self.config.n == n_steps {
                energy = self.strain_energy();
                break;
            }

            let strain = self.step();
            if self.config.n % 10_000 == 0 {
                debug!(
                    "n = {}, t = {:.6} s, kinetic = {:.4e} J, strain = {:.4e} J",
                    self.config.n,
                    self.config.t,
                    self.system.kinetic_energy(),
                    strain
                );
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        let summary = SolveSummary {
            n_steps,
            dt: self.config.dt,
            t_end: self.config.t,
            snapshots,
            kinetic_energy: self.system.kinetic_energy(),
            strain_energy: energy,
            elapsed: start.elapsed(),
        };
        info!(
            "finished {} steps in {}",
            summary.n_steps,
            format_duration(summary.elapsed)
        );
        Ok(summary)
    }
}

/// Formats a duration as `1h 02m 03.456s`, dropping leading zero units.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs_f64();
    let hours = (total / 3600.0).floor();
    let minutes = ((total - hours * 3600.0) / 60.0).floor();
    let seconds = total - hours * 3600.0 - minutes * 60.0;

    if hours > 0.0 {
        format!("{hours:.0}h {minutes:02.0}m {seconds:06.3}s")
    } else if minutes > 0.0 {
        format!("{minutes:.0}m {seconds:06.3}s")
    } else {
        format!("{seconds:.3}s")
    }
}
