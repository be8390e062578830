//! Line-fit JSON export.
//!
//! Fit JSON is the portable representation of one line-profile fit:
//! - the source spectrum and the selected window
//! - the fitted (and initial) Voigt parameters plus fit statistics
//! - a dense model grid over the window for quick plotting
//!
//! The per-sample arrays of the fit are stored too, so a file can be
//! reloaded into a full [`FitResult`].

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::FitResult;
use crate::error::AppError;
use crate::models::predict;

/// Dense model samples over the fitted window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitGrid {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// On-disk schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitFile {
    pub tool: String,
    pub source: PathBuf,
    pub xmin: f64,
    pub xmax: f64,
    pub fit: FitResult,
    pub grid: FitGrid,
}

/// Write a fit JSON file.
pub fn write_fit_json(path: &Path, source: &Path, xmin: f64, xmax: f64, fit: &FitResult) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    let doc = FitFile {
        tool: "rova".to_string(),
        source: source.to_path_buf(),
        xmin,
        xmax,
        fit: fit.clone(),
        grid: build_grid(fit, xmin, xmax, 201),
    };

    serde_json::to_writer_pretty(file, &doc).map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    Ok(())
}

fn build_grid(fit: &FitResult, xmin: f64, xmax: f64, n: usize) -> FitGrid {
    let n = n.max(2);
    let (mut x0, mut x1) = (xmin, xmax);
    if !(x0.is_finite() && x1.is_finite()) || x1 <= x0 {
        x0 = fit.params.center - fit.params.fwhm.max(1e-6);
        x1 = fit.params.center + fit.params.fwhm.max(1e-6);
    }

    let x: Vec<f64> = (0..n)
        .map(|i| x0 + (x1 - x0) * i as f64 / (n as f64 - 1.0))
        .collect();
    let y = x.iter().map(|&xi| predict(&fit.params, xi)).collect();
    FitGrid { x, y }
}
