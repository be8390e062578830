//! Voigt line profile plus constant baseline.
//!
//! ```text
//! f(x) = A · Re w(z) / (sigma · sqrt(2π)) + c,    z = (x - center + i·gamma) / (sigma · sqrt 2)
//! ```
//!
//! `A` is the integrated area of the line, `sigma` the Gaussian width and
//! `gamma` the Lorentzian width. Both widths are independent parameters.

use std::f64::consts::{PI, SQRT_2};

use num_complex::Complex64;

use crate::domain::VoigtParams;
use crate::math::{voigt_peak_factor, wofz};

/// Smallest width used in evaluation; keeps `z` finite when an optimizer step
/// drives sigma to zero.
const MIN_WIDTH: f64 = 1.0e-15;

/// Number of free parameters of [`ProfileModel`].
pub const FREE_PARAMS: usize = 5;

/// Area-normalised Voigt profile scaled by `amplitude`.
pub fn voigt(x: f64, amplitude: f64, center: f64, sigma: f64, gamma: f64) -> f64 {
    let sigma = sigma.max(MIN_WIDTH);
    let z = Complex64::new(x - center, gamma) / (sigma * SQRT_2);
    amplitude * wofz(z).re / (sigma * (2.0 * PI).sqrt())
}

/// Approximate full width at half maximum of a Voigt profile (Olivero–Longbothum form).
pub fn voigt_fwhm(sigma: f64, gamma: f64) -> f64 {
    1.0692 * gamma + (0.8664 * gamma * gamma + 5.545083 * sigma * sigma).sqrt()
}

/// Peak value of the profile above the baseline.
pub fn voigt_height(amplitude: f64, sigma: f64, gamma: f64) -> f64 {
    let sigma = sigma.max(MIN_WIDTH);
    amplitude * voigt_peak_factor(sigma, gamma) / (sigma * (2.0 * PI).sqrt())
}

/// The composite model fitted to a selected line.
///
/// Free-parameter vector layout: `[amplitude, center, sigma, gamma, c]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileModel;

impl ProfileModel {
    pub fn eval(&self, x: f64, p: &[f64; FREE_PARAMS]) -> f64 {
        voigt(x, p[0], p[1], p[2], p[3]) + p[4]
    }

    pub fn eval_all(&self, xs: &[f64], p: &[f64; FREE_PARAMS]) -> Vec<f64> {
        xs.iter().map(|&x| self.eval(x, p)).collect()
    }

    /// Expand a free-parameter vector into the reported parameter set.
    pub fn params(&self, p: &[f64; FREE_PARAMS]) -> VoigtParams {
        VoigtParams {
            amplitude: p[0],
            center: p[1],
            sigma: p[2],
            gamma: p[3],
            fwhm: voigt_fwhm(p[2], p[3]),
            height: voigt_height(p[0], p[2], p[3]),
            baseline: p[4],
        }
    }
}

/// Evaluate a reported parameter set at `x`.
pub fn predict(params: &VoigtParams, x: f64) -> f64 {
    voigt(x, params.amplitude, params.center, params.sigma, params.gamma) + params.baseline
}
