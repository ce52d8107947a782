use statrs::function::gamma::ln_gamma;

/// Half-width of a unit-variance rectangular distribution, in units of sigma.
pub const RECTANGLE_HALF_WIDTH: f64 = 1.732_050_807_568_877_2; // sqrt(3)

#[inline]
pub fn gaussian(mean: f64, sigma: f64, x: f64) -> f64 {
    let vary = x - mean;
    (-vary * vary / (2.0 * sigma * sigma)).exp()
}

#[inline]
pub fn rectangle(mean: f64, sigma: f64, x: f64) -> f64 {
    let half_width = sigma.abs() * RECTANGLE_HALF_WIDTH;
    if x >= mean - half_width && x <= mean + half_width {
        1.0
    } else {
        0.0
    }
}

/// Log-normal density with `log_mean` and `log_sigma` given in ln(x) space.
///
/// The density vanishes for `x <= 0`.
#[inline]
pub fn lognormal(log_mean: f64, log_sigma: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let dev = x.ln() - log_mean;
    (-dev * dev / (2.0 * log_sigma * log_sigma)).exp() / (x * log_sigma)
}

/// Schulz (gamma) density, accumulated as a sum of logarithms and
/// exponentiated once so large `z` does not overflow.
///
/// The density vanishes for `x <= 0`.
#[inline]
pub fn schulz(mean: f64, sigma: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let z = (mean / sigma).powi(2) - 1.0;
    let zz = z + 1.0;
    let r = x / mean;
    let log_weight = zz * zz.ln() + z * r.ln() - r * zz - mean.ln() - ln_gamma(zz);
    log_weight.exp()
}
