//! Faddeeva function `w(z) = exp(-z²) erfc(-iz)`.
//!
//! Evaluated with Weideman's rational expansion (SIAM J. Numer. Anal. 31,
//! 1994) using `N = 32` terms:
//!
//! ```text
//! w(z) = 2 p(Z) / (L - iz)^2 + 1 / (sqrt(pi) (L - iz)),   Z = (L + iz) / (L - iz)
//! ```
//!
//! The expansion holds in the closed upper half-plane. The lower half-plane is
//! reached through `w(z) = 2 exp(-z²) - w(-z)`. Coefficients of `p` are a
//! cosine transform computed once on first use.

use std::f64::consts::PI;
use std::sync::OnceLock;

use num_complex::Complex64;

/// Number of terms in the rational expansion.
const N_TERMS: usize = 32;

struct Expansion {
    l: f64,
    /// `coeffs[n - 1]` multiplies `Z^(n - 1)`.
    coeffs: [f64; N_TERMS],
}

fn expansion() -> &'static Expansion {
    static TABLE: OnceLock<Expansion> = OnceLock::new();
    TABLE.get_or_init(|| {
        let m = 2 * N_TERMS as i64;
        let l = (N_TERMS as f64 / std::f64::consts::SQRT_2).sqrt();

        // Samples of exp(-t²)(L² + t²) at t = L tan(k π / 2M), k = -M+1..M-1.
        // The k = -M sample is zero and drops out.
        let samples: Vec<(f64, f64)> = (-(m - 1)..=(m - 1))
            .map(|k| {
                let theta = k as f64 * PI / m as f64;
                let t = l * (theta / 2.0).tan();
                (k as f64, (-t * t).exp() * (l * l + t * t))
            })
            .collect();

        let mut coeffs = [0.0; N_TERMS];
        for (idx, c) in coeffs.iter_mut().enumerate() {
            let n = (idx + 1) as f64;
            let sum: f64 = samples
                .iter()
                .map(|&(k, f)| f * (PI * k * n / m as f64).cos())
                .sum();
            *c = sum / (2 * m) as f64;
        }
        Expansion { l, coeffs }
    })
}

/// Faddeeva function for any complex argument.
pub fn wofz(z: Complex64) -> Complex64 {
    if z.im < 0.0 {
        let upper = wofz_upper(-z);
        return 2.0 * (-(z * z)).exp() - upper;
    }
    wofz_upper(z)
}

fn wofz_upper(z: Complex64) -> Complex64 {
    let exp = expansion();
    let iz = Complex64::i() * z;
    let denom = exp.l - iz;
    let zz = (exp.l + iz) / denom;

    let mut p = Complex64::new(0.0, 0.0);
    for &c in exp.coeffs.iter().rev() {
        p = p * zz + c;
    }

    2.0 * p / (denom * denom) + (1.0 / PI.sqrt()) / denom
}

/// `Re w(i·gamma / (sigma·sqrt 2))`: the Voigt peak-height factor.
///
/// A Voigt profile of unit area peaks at `factor / (sigma·sqrt(2π))`.
pub fn voigt_peak_factor(sigma: f64, gamma: f64) -> f64 {
    let z = Complex64::new(0.0, gamma / (sigma * std::f64::consts::SQRT_2));
    wofz(z).re
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wofz_at_origin_is_one() {
        let w = wofz(Complex64::new(0.0, 0.0));
        assert!((w.re - 1.0).abs() < 1e-9, "w(0) = {w}");
        assert!(w.im.abs() < 1e-9);
    }

    #[test]
    fn wofz_on_real_axis_has_gaussian_real_part() {
        for &x in &[0.3_f64, 1.0, 2.0] {
            let w = wofz(Complex64::new(x, 0.0));
            let expected = (-x * x).exp();
            assert!((w.re - expected).abs() < 1e-7, "x={x}: {} vs {expected}", w.re);
        }
    }

    #[test]
    fn wofz_on_imaginary_axis_matches_erfcx() {
        // erfcx(1) and erfcx(0.5) reference values.
        let w1 = wofz(Complex64::new(0.0, 1.0));
        assert!((w1.re - 0.427_583_576_155_807).abs() < 1e-7);
        assert!(w1.im.abs() < 1e-9);

        let w05 = wofz(Complex64::new(0.0, 0.5));
        assert!((w05.re - 0.615_690_344_192_926).abs() < 1e-7);
    }

    #[test]
    fn upper_half_plane_is_mirror_symmetric() {
        // w(-conj(z)) = conj(w(z)).
        let z = Complex64::new(0.7, 0.4);
        let mirrored = wofz(-z.conj());
        assert!((mirrored - wofz(z).conj()).norm() < 1e-7);
    }

    #[test]
    fn lower_half_plane_is_continuous_across_real_axis() {
        let above = wofz(Complex64::new(1.3, 1e-9));
        let below = wofz(Complex64::new(1.3, -1e-9));
        assert!((above - below).norm() < 1e-6);
    }

    #[test]
    fn peak_factor_is_one_for_pure_gaussian() {
        assert!((voigt_peak_factor(0.5, 0.0) - 1.0).abs() < 1e-9);
        assert!(voigt_peak_factor(0.5, 0.5) < 1.0);
    }
}
