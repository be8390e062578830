//! Linear least-squares solves used by the line-profile optimizer.
//!
//! Each Levenberg–Marquardt iteration solves a small damped problem
//!
//! ```text
//! minimize ||J δ - r||² + λ ||D δ||²
//! ```
//!
//! which is the ordinary least-squares problem for the stacked system
//! `[J; sqrt(λ) D] δ = [r; 0]`. The parameter dimension is tiny (5 columns),
//! so we solve through SVD: it copes with the tall, occasionally
//! rank-deficient Jacobians produced by flat windows.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped step `[J; sqrt(λ) diag(scale)] δ = [r; 0]`.
pub fn solve_damped_step(
    jac: &DMatrix<f64>,
    residuals: &DVector<f64>,
    lambda: f64,
    scale: &DVector<f64>,
) -> Option<DVector<f64>> {
    let (n, p) = jac.shape();
    let mut a = DMatrix::<f64>::zeros(n + p, p);
    let mut b = DVector::<f64>::zeros(n + p);

    a.view_mut((0, 0), (n, p)).copy_from(jac);
    b.rows_mut(0, n).copy_from(residuals);

    let root = lambda.max(0.0).sqrt();
    for j in 0..p {
        a[(n + j, j)] = root * scale[j];
    }

    solve_least_squares(&a, &b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn damping_shrinks_the_step() {
        let jac = DMatrix::from_row_slice(3, 1, &[1.0, 1.0, 1.0]);
        let r = DVector::from_row_slice(&[1.0, 1.0, 1.0]);
        let scale = DVector::from_element(1, 1.0);

        let free = solve_damped_step(&jac, &r, 0.0, &scale).unwrap();
        let damped = solve_damped_step(&jac, &r, 3.0, &scale).unwrap();
        assert!((free[0] - 1.0).abs() < 1e-10);
        // (JᵀJ + λ) δ = Jᵀr  ->  δ = 3 / 6
        assert!((damped[0] - 0.5).abs() < 1e-10);
    }
}
