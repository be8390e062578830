//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a line fit in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed samples: `o`
//! - fitted profile: `-` line
//! - residual strip below: `*` on a `.` zero line

use crate::domain::FitResult;
use crate::models::predict;

/// Render the fitted window and its residuals.
pub fn render_fit_plot(fit: &FitResult, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(&fit.x).unwrap_or((fit.params.center - 1.0, fit.params.center + 1.0));
    let curve = sample_profile(fit, x_min, x_max, width);

    let observed: Vec<(f64, f64)> = fit.x.iter().copied().zip(fit.y_obs.iter().copied()).collect();
    let residuals: Vec<(f64, f64)> = fit.x.iter().copied().zip(fit.residuals.iter().copied()).collect();

    let (y_min, y_max) = y_range(&observed, &curve).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let mut out = format!("Fit: x=[{x_min:.4}, {x_max:.4}] | y=[{y_min:.4}, {y_max:.4}]\n");
    let mut grid = vec![vec![' '; width]; height];
    draw_curve(&mut grid, &curve, (x_min, x_max), (y_min, y_max), '-');
    plot_points(&mut grid, &observed, (x_min, x_max), (y_min, y_max), 'o');
    push_grid(&mut out, grid);

    // The residual strip always shows the zero line.
    let (r_min, r_max) = y_range(&residuals, &[(x_min, 0.0)]).unwrap_or((-1.0, 1.0));
    let (r_min, r_max) = pad_range(r_min, r_max, 0.05);
    out.push_str(&format!("Residuals: y=[{r_min:.4}, {r_max:.4}]\n"));
    let mut strip = vec![vec![' '; width]; (height / 3).max(3)];
    draw_curve(&mut strip, &[(x_min, 0.0), (x_max, 0.0)], (x_min, x_max), (r_min, r_max), '.');
    plot_points(&mut strip, &residuals, (x_min, x_max), (r_min, r_max), '*');
    push_grid(&mut out, strip);

    out
}

fn push_grid(out: &mut String, grid: Vec<Vec<char>>) {
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
}

fn x_range(xs: &[f64]) -> Option<(f64, f64)> {
    let min_x = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max_x = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn sample_profile(fit: &FitResult, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, predict(&fit.params, x))
        })
        .collect()
}

fn y_range(points: &[(f64, f64)], extra: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for &(_, y) in points.iter().chain(extra) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn plot_points(grid: &mut [Vec<char>], points: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    let height = grid.len();
    let width = grid.first().map_or(0, Vec::len);
    for &(x, y) in points {
        if !y.is_finite() {
            continue;
        }
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        grid[row][col] = ch;
    }
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], xr: (f64, f64), yr: (f64, f64), ch: char) {
    if curve.len() < 2 || grid.is_empty() {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        let col = map_x(x, xr.0, xr.1, width);
        let row = map_y(y, yr.0, yr.1, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, ch);
        } else {
            grid[row][col] = ch;
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VoigtParams;

    #[test]
    fn plot_golden_snapshot_small() {
        // Zero amplitude: the profile is the flat baseline y = 1.
        let params = VoigtParams {
            amplitude: 0.0,
            center: 4.5,
            sigma: 1.0,
            gamma: 0.0,
            fwhm: 2.3548,
            height: 0.0,
            baseline: 1.0,
        };
        let fit = FitResult {
            params,
            initial: params,
            x: vec![0.0, 9.0],
            y_obs: vec![1.0, 2.0],
            y_fit: vec![1.0, 1.0],
            residuals: vec![0.0, 1.0],
            max_abs_residual: 1.0,
            chi_square: 1.0,
            iterations: 0,
        };

        let txt = render_fit_plot(&fit, 10, 5);
        let expected = concat!(
            "Fit: x=[0.0000, 9.0000] | y=[0.9500, 2.0500]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
            "Residuals: y=[-0.0500, 1.0500]\n",
            "         *\n",
            "          \n",
            "*.........\n",
        );
        assert_eq!(txt, expected);
    }
}
