//! Bounded Levenberg–Marquardt for small nonlinear least-squares problems.
//!
//! Given:
//! - a model `f(x; p)` evaluated on a fixed window
//! - observations `y`
//! - per-parameter bounds
//!
//! we minimize `Σ (y_i - f(x_i; p))²`.
//!
//! Bounds are handled by optimizing unconstrained internal variables and
//! mapping them onto the bounded external parameters:
//!
//! - `[min, max]`: `p = min + (sin u + 1)(max - min)/2`
//! - `[min, ∞)`:  `p = min - 1 + sqrt(u² + 1)`
//! - `(-∞, max]`: `p = max + 1 - sqrt(u² + 1)`
//!
//! The Jacobian is a forward difference in internal coordinates, and each
//! damped step is solved by SVD (see `math::ols`). Everything is
//! deterministic: identical inputs give bit-identical outputs.

use nalgebra::{DMatrix, DVector};

use crate::error::AssignError;
use crate::math::solve_damped_step;

/// Inclusive bounds of one parameter. Infinite ends mean unbounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const FREE: Bounds = Bounds {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn at_least(min: f64) -> Self {
        Bounds { min, max: f64::INFINITY }
    }

    fn clamp(&self, v: f64) -> f64 {
        v.max(self.min).min(self.max)
    }

    fn to_internal(&self, v: f64) -> f64 {
        let v = self.clamp(v);
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, true) => (2.0 * (v - self.min) / (self.max - self.min) - 1.0).clamp(-1.0, 1.0).asin(),
            (true, false) => ((v - self.min + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (false, true) => ((self.max - v + 1.0).powi(2) - 1.0).max(0.0).sqrt(),
            (false, false) => v,
        }
    }

    fn to_external(&self, u: f64) -> f64 {
        match (self.min.is_finite(), self.max.is_finite()) {
            (true, true) => self.min + (u.sin() + 1.0) * (self.max - self.min) / 2.0,
            (true, false) => self.min - 1.0 + (u * u + 1.0).sqrt(),
            (false, true) => self.max + 1.0 - (u * u + 1.0).sqrt(),
            (false, false) => u,
        }
    }
}

/// Stopping rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmOptions {
    pub max_iterations: usize,
    /// Relative reduction of the sum of squares below which we stop.
    pub ftol: f64,
    /// Relative step size below which we stop.
    pub xtol: f64,
}

impl Default for LmOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-10,
            xtol: 1e-10,
        }
    }
}

/// Converged solution.
#[derive(Debug, Clone, PartialEq)]
pub struct LmSolution {
    /// External (bounded) parameters.
    pub params: Vec<f64>,
    pub sse: f64,
    pub iterations: usize,
}

const INITIAL_DAMPING: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e16;
const MIN_DAMPING: f64 = 1e-15;

/// Minimize `Σ (y_i - model(p)_i)²` starting from `start`.
///
/// `model` maps external parameters to predictions on the window.
pub fn minimize<F>(
    model: F,
    y: &[f64],
    start: &[f64],
    bounds: &[Bounds],
    opts: &LmOptions,
) -> Result<LmSolution, AssignError>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let p = start.len();
    let n = y.len();
    if bounds.len() != p {
        return Err(not_converged(0, "parameter/bounds length mismatch"));
    }
    if n < p {
        return Err(AssignError::InsufficientData { points: n, required: p });
    }

    let to_external = |u: &[f64]| -> Vec<f64> {
        u.iter().zip(bounds).map(|(&ui, b)| b.to_external(ui)).collect()
    };

    let mut u: Vec<f64> = start.iter().zip(bounds).map(|(&v, b)| b.to_internal(v)).collect();
    let mut f = model(&to_external(&u));
    let Some(mut r) = residuals(y, &f) else {
        return Err(not_converged(0, "model is not finite at the initial guess"));
    };
    let mut sse = r.norm_squared();

    let mut lambda: Option<f64> = None;
    let mut nu = 2.0;

    for iter in 1..=opts.max_iterations {
        if sse == 0.0 {
            return Ok(solution(to_external(&u), sse, iter - 1));
        }

        let jac = jacobian(&model, &u, &f, bounds, n)
            .ok_or_else(|| not_converged(iter, "model is not finite near the current parameters"))?;

        let scale = DVector::from_iterator(
            p,
            jac.column_iter().map(|c| {
                let norm = c.norm();
                if norm > 0.0 { norm } else { 1.0 }
            }),
        );
        let lam = *lambda.get_or_insert_with(|| INITIAL_DAMPING * scale.iter().fold(0.0_f64, |m, s| m.max(s * s)));

        let step = solve_damped_step(&jac, &r, lam, &scale)
            .ok_or_else(|| not_converged(iter, "singular step system"))?;

        let u_norm = u.iter().map(|v| v * v).sum::<f64>().sqrt();
        let small_step = step.norm() <= opts.xtol * (u_norm + opts.xtol);

        let trial: Vec<f64> = u.iter().zip(step.iter()).map(|(a, d)| a + d).collect();
        let f_trial = model(&to_external(&trial));
        let accepted = residuals(y, &f_trial).map(|r_trial| {
            let sse_trial = r_trial.norm_squared();
            (r_trial, sse_trial)
        });

        match accepted {
            Some((r_trial, sse_trial)) if sse_trial < sse => {
                let reduction = (sse - sse_trial) / sse;
                u = trial;
                f = f_trial;
                r = r_trial;
                sse = sse_trial;
                lambda = Some((lam / 3.0).max(MIN_DAMPING));
                nu = 2.0;
                if reduction <= opts.ftol || small_step {
                    return Ok(solution(to_external(&u), sse, iter));
                }
            }
            _ => {
                // No improvement along a vanishing step: we are at a minimum.
                if small_step {
                    return Ok(solution(to_external(&u), sse, iter));
                }
                let next = lam * nu;
                nu *= 2.0;
                if next > MAX_DAMPING {
                    return Ok(solution(to_external(&u), sse, iter));
                }
                lambda = Some(next);
            }
        }
    }

    Err(not_converged(opts.max_iterations, "iteration limit reached"))
}

fn solution(params: Vec<f64>, sse: f64, iterations: usize) -> LmSolution {
    LmSolution { params, sse, iterations }
}

fn not_converged(iterations: usize, reason: &str) -> AssignError {
    AssignError::FitConvergence {
        iterations,
        reason: reason.to_string(),
    }
}

fn residuals(y: &[f64], f: &[f64]) -> Option<DVector<f64>> {
    if f.len() != y.len() || f.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(DVector::from_iterator(y.len(), y.iter().zip(f).map(|(a, b)| a - b)))
}

/// Forward-difference Jacobian of the model in internal coordinates.
fn jacobian<F>(model: &F, u: &[f64], f0: &[f64], bounds: &[Bounds], n: usize) -> Option<DMatrix<f64>>
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    let p = u.len();
    let mut jac = DMatrix::<f64>::zeros(n, p);
    let mut shifted = u.to_vec();

    for j in 0..p {
        let h = f64::EPSILON.sqrt() * u[j].abs().max(1.0);
        shifted[j] = u[j] + h;
        let ext: Vec<f64> = shifted.iter().zip(bounds).map(|(&ui, b)| b.to_external(ui)).collect();
        let fj = model(&ext);
        shifted[j] = u[j];

        if fj.len() != n {
            return None;
        }
        for i in 0..n {
            let d = (fj[i] - f0[i]) / h;
            if !d.is_finite() {
                return None;
            }
            jac[(i, j)] = d;
        }
    }

    Some(jac)
}
