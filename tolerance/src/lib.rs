/// Default closeness used for rotation algebra checks.
pub const SMALL_SCALAR: f64 = 1e-8;

#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    abs_tol: f64,
    rel_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs_tol: 1e-3,
            rel_tol: 1e-6,
        }
    }
}

impl Tolerances {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    pub fn check_error(&self, x0: f64, xf: f64) -> bool {
        check_error(x0, xf, self.rel_tol, self.abs_tol)
    }
}

/// True if `xf` is within `abs_tol` of `x0` or within `rel_tol` relative to it.
pub fn check_error(x0: f64, xf: f64, rel_tol: f64, abs_tol: f64) -> bool {
    let abs_diff = (xf - x0).abs();
    let rel_diff = if x0.abs() > 1e-10 {
        abs_diff / x0.abs()
    } else {
        0.0
    };
    abs_diff <= abs_tol || rel_diff <= rel_tol
}

/// Closeness with the tolerance scaled by the magnitude of the operands,
/// so the same `tol` works for numbers of very different sizes.
pub fn is_close(a: f64, b: f64, tol: f64) -> bool {
    let scaled_tol = tol * 1.0_f64.max(a.abs()).max(b.abs());
    (b - a).abs() <= scaled_tol
}
