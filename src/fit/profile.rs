//! Fit a single isolated line: Voigt profile plus constant baseline.
//!
//! Steps:
//! - peak-heuristic starting point, amplitude anchored to the observed maximum
//! - bounded Levenberg–Marquardt over `[amplitude, center, sigma, gamma, c]`
//! - fitted curve, residuals and summary statistics on the same window

use crate::domain::FitResult;
use crate::error::AssignError;
use crate::fit::guess::initial_guess;
use crate::fit::lm::{minimize, Bounds, LmOptions};
use crate::models::{ProfileModel, FREE_PARAMS};

/// Line-profile fitter. Stateless apart from its stopping rules.
#[derive(Debug, Clone, Default)]
pub struct LineProfileFitter {
    pub options: LmOptions,
}

impl LineProfileFitter {
    /// Fit the window `(x, y)`. Samples must be paired; order does not matter.
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<FitResult, AssignError> {
        if x.len() != y.len() {
            return Err(AssignError::FitConvergence {
                iterations: 0,
                reason: format!("window has {} positions but {} intensities", x.len(), y.len()),
            });
        }
        if x.len() < FREE_PARAMS {
            return Err(AssignError::InsufficientData {
                points: x.len(),
                required: FREE_PARAMS,
            });
        }
        if x.iter().chain(y).any(|v| !v.is_finite()) {
            return Err(degenerate("window contains non-finite samples"));
        }

        let guess = initial_guess(x, y).ok_or_else(|| degenerate("no initial guess"))?;
        let start = guess.params;
        if !(start.sigma > 0.0) || !start.amplitude.is_finite() {
            return Err(degenerate("window has no measurable width"));
        }

        let model = ProfileModel;
        let bounds = [
            Bounds::at_least(guess.amplitude_floor),
            Bounds::FREE,
            Bounds::at_least(0.0),
            Bounds::at_least(0.0),
            Bounds::FREE,
        ];
        let p0 = [start.amplitude, start.center, start.sigma, start.gamma, start.baseline];

        let solution = minimize(
            |p: &[f64]| match free_params(p) {
                Some(p) => model.eval_all(x, &p),
                None => vec![f64::NAN; x.len()],
            },
            y,
            &p0,
            &bounds,
            &self.options,
        )?;

        let p = free_params(&solution.params).ok_or_else(|| degenerate("optimizer returned a malformed vector"))?;
        let params = model.params(&p);
        if params.to_vec().iter().any(|v| !v.is_finite()) {
            return Err(AssignError::FitConvergence {
                iterations: solution.iterations,
                reason: "fitted parameters are not finite".to_string(),
            });
        }

        let y_fit = model.eval_all(x, &p);
        let residuals: Vec<f64> = y.iter().zip(&y_fit).map(|(o, f)| o - f).collect();
        let max_abs_residual = residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
        let chi_square = residuals.iter().map(|r| r * r).sum();

        log::debug!(
            "voigt fit: center={:.6} sigma={:.3e} gamma={:.3e} chi2={:.3e} after {} iterations",
            params.center,
            params.sigma,
            params.gamma,
            chi_square,
            solution.iterations
        );

        Ok(FitResult {
            params,
            initial: start,
            x: x.to_vec(),
            y_obs: y.to_vec(),
            y_fit,
            residuals,
            max_abs_residual,
            chi_square,
            iterations: solution.iterations,
        })
    }
}

/// Fit with the default stopping rules.
pub fn fit_line_profile(x: &[f64], y: &[f64]) -> Result<FitResult, AssignError> {
    LineProfileFitter::default().fit(x, y)
}

fn free_params(p: &[f64]) -> Option<[f64; FREE_PARAMS]> {
    p.try_into().ok()
}

fn degenerate(reason: &str) -> AssignError {
    AssignError::FitConvergence {
        iterations: 0,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::guess::amplitude_from_height;
    use crate::models::voigt;

    fn synthetic(center: f64, sigma: f64, gamma: f64, height: f64, baseline: f64) -> (Vec<f64>, Vec<f64>) {
        let area = amplitude_from_height(height, sigma, gamma);
        let x: Vec<f64> = (0..=100).map(|i| center - 1.0 + i as f64 * 0.02).collect();
        let y = x.iter().map(|&xi| voigt(xi, area, center, sigma, gamma) + baseline).collect();
        (x, y)
    }

    #[test]
    fn recovers_clean_voigt_parameters() {
        let (x, y) = synthetic(15.0, 0.05, 0.1, 4.0, 0.0);
        let fit = fit_line_profile(&x, &y).unwrap();

        assert!((fit.params.center - 15.0).abs() < 1e-6, "center={}", fit.params.center);
        assert!((fit.params.sigma - 0.05).abs() < 1e-4, "sigma={}", fit.params.sigma);
        assert!((fit.params.gamma - 0.1).abs() < 1e-4, "gamma={}", fit.params.gamma);
        assert!((fit.params.height - 4.0).abs() < 1e-4, "height={}", fit.params.height);
        assert!(fit.params.baseline.abs() < 1e-4, "c={}", fit.params.baseline);
        assert!(fit.max_abs_residual < 1e-6);
        assert_eq!(fit.x.len(), fit.residuals.len());
        assert_eq!(fit.y_fit.len(), fit.y_obs.len());
    }

    #[test]
    fn offset_line_is_still_centred() {
        // The amplitude anchor includes the baseline, so only the centre is exact here.
        let (x, y) = synthetic(15.0, 0.12, 0.05, 4.0, 1.0);
        let fit = fit_line_profile(&x, &y).unwrap();
        assert!((fit.params.center - 15.0).abs() < 1e-3, "center={}", fit.params.center);
    }

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let (x, y) = synthetic(3.0, 0.1, 0.1, 2.0, 0.0);
        let fit = fit_line_profile(&x, &y).unwrap();
        for i in 0..x.len() {
            assert_eq!(fit.residuals[i], fit.y_obs[i] - fit.y_fit[i]);
        }
        let chi: f64 = fit.residuals.iter().map(|r| r * r).sum();
        assert_eq!(fit.chi_square, chi);
    }

    #[test]
    fn amplitude_never_drops_below_floor() {
        let (x, y) = synthetic(0.0, 0.08, 0.02, 1.0, 0.2);
        let fit = fit_line_profile(&x, &y).unwrap();
        assert!(fit.params.amplitude >= 0.95 * fit.initial.amplitude * (1.0 - 1e-9));
        assert!(fit.params.sigma >= 0.0);
        assert!(fit.params.gamma >= 0.0);
    }

    #[test]
    fn identical_windows_fit_identically() {
        let (x, y) = synthetic(7.5, 0.1, 0.03, 3.0, 0.5);
        let a = fit_line_profile(&x, &y).unwrap();
        let b = fit_line_profile(&x, &y).unwrap();
        assert_eq!(a.params, b.params);
        assert_eq!(a.iterations, b.iterations);
    }

    #[test]
    fn four_points_are_insufficient() {
        let err = fit_line_profile(&[1.0, 2.0, 3.0, 4.0], &[0.0, 1.0, 1.0, 0.0]).unwrap_err();
        assert_eq!(err, AssignError::InsufficientData { points: 4, required: 5 });
    }

    #[test]
    fn non_finite_window_is_rejected() {
        let err = fit_line_profile(&[1.0, 2.0, 3.0, 4.0, 5.0], &[0.0, 1.0, f64::NAN, 1.0, 0.0]).unwrap_err();
        assert!(matches!(err, AssignError::FitConvergence { .. }));
    }
}
