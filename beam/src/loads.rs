use crate::config::{Config, ConfigErrors};
use crate::geometry::Geometry;
use crate::state::Vec3Vec3;

/// Fills the time-invariant loads: gravity lumped like the translational
/// mass, then the configured point loads.
pub fn calc_static_loads(
    config: &Config,
    geometry: &impl Geometry,
    r_static: &mut [Vec3Vec3],
) -> Result<(), ConfigErrors> {
    config.validate_point_loads(r_static.len())?;

    r_static.iter_mut().for_each(Vec3Vec3::set_zero);

    for ie in 0..geometry.n_elements() {
        let (i, j) = geometry.element_nodes(ie);
        let half_weight = config.gravity * (0.5 * config.density * geometry.a_e(ie) * geometry.dx_e(ie));
        r_static[i].trans += half_weight;
        r_static[j].trans += half_weight;
    }

    for load in &config.point_loads {
        r_static[load.node].trans += load.force;
        r_static[load.node].rot += load.moment;
    }

    Ok(())
}
