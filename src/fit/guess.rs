//! Starting values for a Voigt line fit.
//!
//! The shape guess is the usual peak heuristic (centre at the maximum or at
//! the mean of the half-maximum samples, width from the half-maximum span).
//! The amplitude is then anchored to the observed peak height through the
//! Voigt height/area relation
//!
//! ```text
//! amplitude = max(y) · sigma · sqrt(2π) / Re w(i·gamma / (sigma·sqrt 2))
//! ```
//!
//! so the optimizer starts from a profile as tall as the line it is fitting.

use std::f64::consts::PI;

use crate::domain::VoigtParams;
use crate::math::voigt_peak_factor;
use crate::models::{voigt_fwhm, voigt_height};

/// Scale applied to the raw area estimate of the peak heuristic.
const AMPLITUDE_SCALE: f64 = 1.5;
/// Scale applied to the half-width estimate of the peak heuristic.
const SIGMA_SCALE: f64 = 0.65;
/// Fraction of the height-anchored amplitude used as its lower bound.
pub const AMPLITUDE_FLOOR_FRACTION: f64 = 0.95;

/// Initial parameters plus the amplitude bound derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    pub params: VoigtParams,
    pub amplitude_floor: f64,
}

/// Peak heuristic for a pure Voigt shape. `x` and `y` must be non-empty and
/// equally long.
///
/// Returns amplitude/center/sigma/gamma/fwhm with `gamma = sigma`, baseline 0.
pub fn guess_from_peak(x: &[f64], y: &[f64]) -> Option<VoigtParams> {
    if x.is_empty() || x.len() != y.len() {
        return None;
    }

    let (mut imax, mut maxy, mut miny) = (0usize, f64::NEG_INFINITY, f64::INFINITY);
    for (i, &v) in y.iter().enumerate() {
        if v > maxy {
            maxy = v;
            imax = i;
        }
        miny = miny.min(v);
    }
    let maxx = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let minx = x.iter().copied().fold(f64::INFINITY, f64::min);

    let mut center = x[imax];
    let height = (maxy - miny) * 3.0;
    let mut sigma = (maxx - minx) / 6.0;

    let half = (maxy + miny) / 2.0;
    let above: Vec<f64> = x.iter().zip(y).filter(|&(_, &v)| v > half).map(|(&xi, _)| xi).collect();
    if above.len() > 2 {
        let lo = above.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = above.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        sigma = (hi - lo) / 2.0;
        center = above.iter().sum::<f64>() / above.len() as f64;
    }

    let amplitude = height * sigma * AMPLITUDE_SCALE;
    let sigma = sigma * SIGMA_SCALE;
    let gamma = sigma;

    Some(VoigtParams {
        amplitude,
        center,
        sigma,
        gamma,
        fwhm: voigt_fwhm(sigma, gamma),
        height: voigt_height(amplitude, sigma, gamma),
        baseline: 0.0,
    })
}

/// Amplitude of a Voigt profile whose peak equals `peak_height`.
pub fn amplitude_from_height(peak_height: f64, sigma: f64, gamma: f64) -> f64 {
    peak_height * sigma * (2.0 * PI).sqrt() / voigt_peak_factor(sigma, gamma)
}

/// Full starting point for the composite fit.
pub fn initial_guess(x: &[f64], y: &[f64]) -> Option<InitialGuess> {
    let shape = guess_from_peak(x, y)?;
    let peak = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let amplitude = amplitude_from_height(peak, shape.sigma, shape.gamma);

    let params = VoigtParams {
        amplitude,
        height: voigt_height(amplitude, shape.sigma, shape.gamma),
        ..shape
    };

    Some(InitialGuess {
        params,
        amplitude_floor: AMPLITUDE_FLOOR_FRACTION * amplitude,
    })
}
