use crate::config::Config;
use crate::geometry::Geometry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StabilityErrors {
    #[error("CFL must lie strictly between 0 and 1, got {0}")]
    CflOutOfRange(f64),
    #[error("geometry has no elements")]
    NoElements,
    #[error("element {element} has non-positive length {length}")]
    NonPositiveLength { element: usize, length: f64 },
    #[error("element {element} has non-positive area or second moment")]
    NonPositiveSection { element: usize },
    #[error("wave speed must be positive, got {0}")]
    NonPositiveWaveSpeed(f64),
    #[error("computed timestep {0} is not positive")]
    NonPositiveTimestep(f64),
    #[error("end time {t_end} s needs more steps than can be counted at dt = {dt} s")]
    TooManySteps { t_end: f64, dt: f64 },
}

/// Result of the timestep estimate, kept for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityEstimate {
    /// Stable timestep scaled by CFL.
    pub dt: f64,
    /// Unscaled critical timestep of the governing element.
    pub dt_critical: f64,
    pub governing_element: usize,
    pub crit_axial: f64,
    pub crit_bending: f64,
    pub wave_speed: f64,
}

/// Critical timesteps `(axial, bending)` of a single element of length
/// `dx` with area `a` and second moment `i`.
pub fn element_critical_timestep(dx: f64, a: f64, i: f64, wave_speed: f64) -> (f64, f64) {
    let r_g = (i / a).sqrt();
    let crit_axial = dx / wave_speed;
    let crit_bending = 3.0_f64.sqrt() * dx * dx / (12.0 * wave_speed * r_g);
    (crit_axial, crit_bending)
}

/// Computes the largest stable central difference timestep, scaled by the
/// CFL factor, and stores it in `config.dt`.
///
/// # Arguments
///
/// * `config` - Material and CFL factor. `dt` is written on success.
/// * `geometry` - Element lengths and section properties.
///
/// # Returns
///
/// The estimate with the governing element and both candidate bounds.
pub fn calc_dt(
    config: &mut Config,
    geometry: &impl Geometry,
) -> Result<StabilityEstimate, StabilityErrors> {
    if !(config.cfl > 0.0 && config.cfl < 1.0) {
        return Err(StabilityErrors::CflOutOfRange(config.cfl));
    }
    let c = config.wave_speed();
    if !(c > 0.0 && c.is_finite()) {
        return Err(StabilityErrors::NonPositiveWaveSpeed(c));
    }
    if geometry.n_elements() == 0 {
        return Err(StabilityErrors::NoElements);
    }

    let mut governing = None;
    for ie in 0..geometry.n_elements() {
        let dx = geometry.dx_e(ie);
        if !(dx > 0.0) {
            return Err(StabilityErrors::NonPositiveLength {
                element: ie,
                length: dx,
            });
        }
        let a = geometry.a_e(ie);
        let i = geometry.i_e(ie);
        if !(a > 0.0 && i > 0.0) {
            return Err(StabilityErrors::NonPositiveSection { element: ie });
        }

        let (crit_axial, crit_bending) = element_critical_timestep(dx, a, i, c);
        let dt_element = crit_axial.min(crit_bending);
        match governing {
            Some((_, dt_min, _, _)) if dt_min <= dt_element => {}
            _ => governing = Some((ie, dt_element, crit_axial, crit_bending)),
        }
    }

    let Some((governing_element, dt_critical, crit_axial, crit_bending)) = governing else {
        return Err(StabilityErrors::NoElements);
    };

    let dt = config.cfl * dt_critical;
    if !(dt > 0.0) {
        return Err(StabilityErrors::NonPositiveTimestep(dt));
    }
    if !((config.t_end / dt).ceil() < usize::MAX as f64) {
        return Err(StabilityErrors::TooManySteps {
            t_end: config.t_end,
            dt,
        });
    }
    config.dt = dt;

    Ok(StabilityEstimate {
        dt,
        dt_critical,
        governing_element,
        crit_axial,
        crit_bending,
        wave_speed: c,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::geometry::{CrossSection, StraightBeam};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;
    const TOL: f64 = 1e-15;

    /// Beam with element lengths given explicitly.
    struct UnevenBeam {
        nodes: Vec<f64>,
        section: CrossSection,
    }

    impl Geometry for UnevenBeam {
        fn n_nodes(&self) -> usize {
            self.nodes.len()
        }
        fn n_elements(&self) -> usize {
            self.nodes.len() - 1
        }
        fn x0(&self, i: usize) -> Vector3<f64> {
            Vector3::new(self.nodes[i], 0.0, 0.0)
        }
        fn a_e(&self, _ie: usize) -> f64 {
            self.section.area
        }
        fn i_e(&self, _ie: usize) -> f64 {
            self.section.second_moment
        }
    }

    #[test]
    fn test_uniform_beam_axial_governs() {
        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        let section = CrossSection::tube(0.02, 0.0).unwrap();
        let geometry = StraightBeam::along_x(1.0, 10, section).unwrap();

        let estimate = calc_dt(&mut config, &geometry).unwrap();
        let c = config.wave_speed();
        let axial = 0.1 / c;
        let bending = 3.0_f64.sqrt() * 0.01 / (12.0 * c * 0.005);

        assert!(axial < bending);
        assert_abs_diff_eq!(estimate.crit_axial, axial, epsilon = TOL);
        assert_abs_diff_eq!(estimate.crit_bending, bending, epsilon = TOL);
        assert_abs_diff_eq!(estimate.dt, 0.9 * axial, epsilon = TOL);
        assert_abs_diff_eq!(config.dt, estimate.dt, epsilon = TOL);

        // every element satisfies the bound
        for ie in 0..geometry.n_elements() {
            let (a, b) = element_critical_timestep(
                geometry.dx_e(ie),
                section.area,
                section.second_moment,
                c,
            );
            assert!(config.dt <= config.cfl * a.min(b) + TOL);
        }
    }

    #[test]
    fn test_fine_mesh_bending_governs() {
        let mut config = ConfigBuilder::steel(1.0).with_cfl(0.5).build().unwrap();
        let section = CrossSection::tube(0.2, 0.0).unwrap();
        let geometry = StraightBeam::along_x(1.0, 100, section).unwrap();

        let estimate = calc_dt(&mut config, &geometry).unwrap();
        assert!(estimate.crit_bending < estimate.crit_axial);
        assert_abs_diff_eq!(estimate.dt, 0.5 * estimate.crit_bending, epsilon = TOL);
    }

    #[test]
    fn test_shortest_element_governs() {
        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        let section = CrossSection::tube(0.02, 0.0).unwrap();
        let geometry = UnevenBeam {
            nodes: vec![0.0, 0.3, 0.35, 0.8, 1.0],
            section,
        };

        let estimate = calc_dt(&mut config, &geometry).unwrap();
        assert_eq!(estimate.governing_element, 1);
        let (axial, bending) =
            element_critical_timestep(0.05, section.area, section.second_moment, config.wave_speed());
        assert_abs_diff_eq!(estimate.dt_critical, axial.min(bending), epsilon = TOL);
    }

    #[test]
    fn test_rejects_bad_input() {
        let section = CrossSection::tube(0.02, 0.0).unwrap();
        let geometry = StraightBeam::along_x(1.0, 10, section).unwrap();

        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        config.cfl = 1.0;
        assert!(matches!(
            calc_dt(&mut config, &geometry),
            Err(StabilityErrors::CflOutOfRange(_))
        ));

        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        config.youngs_modulus = 0.0;
        assert!(matches!(
            calc_dt(&mut config, &geometry),
            Err(StabilityErrors::NonPositiveWaveSpeed(_))
        ));
        assert_eq!(config.dt, 0.0);

        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        let collapsed = UnevenBeam {
            nodes: vec![0.0, 0.5, 0.5, 1.0],
            section,
        };
        assert!(matches!(
            calc_dt(&mut config, &collapsed),
            Err(StabilityErrors::NonPositiveLength { element: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_uncountable_step_count() {
        let section = CrossSection::tube(0.02, 0.0).unwrap();
        let geometry = StraightBeam::along_x(1.0, 10, section).unwrap();

        let mut config = ConfigBuilder::steel(1.0).build().unwrap();
        config.t_end = 1e300;
        assert!(matches!(
            calc_dt(&mut config, &geometry),
            Err(StabilityErrors::TooManySteps { .. })
        ));
        assert_eq!(config.dt, 0.0);
        assert_eq!(config.n_steps(), 0);

        config.t_end = f64::INFINITY;
        assert!(matches!(
            calc_dt(&mut config, &geometry),
            Err(StabilityErrors::TooManySteps { .. })
        ));
    }
}
