//! Seeded synthetic spectra for demos and tests.
//!
//! The line list is a single R-branch ladder
//!
//! ```text
//! nu(J) = nu0 + 2B(J + 1) - 4D(J + 1)^3,   I(J) ∝ (2J + 1) exp(-B J (J + 1) / kT)
//! ```
//!
//! and the "measured" spectrum places every line slightly off its predicted
//! position (normal scatter), either as sticks or as Voigt profiles on a
//! uniform grid with additive noise.

use std::fs;
use std::path::{Path, PathBuf};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{LineRecord, LineTable, SpectralSeries, SpectrumKind};
use crate::error::AppError;
use crate::fit::amplitude_from_height;
use crate::io::CONFIG_FILE;
use crate::models::voigt;

/// Generator settings. Units are wavenumbers (cm⁻¹).
#[derive(Debug, Clone)]
pub struct SynthOptions {
    pub seed: u64,
    pub lines: usize,
    pub kind: SpectrumKind,
    pub band_origin: f64,
    pub rotational_constant: f64,
    pub centrifugal_constant: f64,
    /// `kT` in the same units as the rotational constant.
    pub temperature: f64,
    /// Standard deviation of observed-minus-calculated positions.
    pub position_scatter: f64,
    pub sigma: f64,
    pub gamma: f64,
    pub grid_step: f64,
    /// Noise standard deviation as a fraction of the strongest line.
    pub noise: f64,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            lines: 12,
            kind: SpectrumKind::High,
            band_origin: 1000.0,
            rotational_constant: 0.4,
            centrifugal_constant: 1e-5,
            temperature: 8.0,
            position_scatter: 0.005,
            sigma: 0.02,
            gamma: 0.01,
            grid_step: 0.005,
            noise: 0.002,
        }
    }
}

/// A generated experimental spectrum and its matching line list.
#[derive(Debug, Clone)]
pub struct SyntheticSet {
    pub experimental: SpectralSeries,
    pub lines: LineTable,
}

/// Files written by [`write_synthetic`].
#[derive(Debug, Clone)]
pub struct WrittenFiles {
    pub experimental: PathBuf,
    pub lines: PathBuf,
    pub config: PathBuf,
    pub files: Vec<PathBuf>,
}

const LINE_COLUMNS: [&str; 5] = ["wavenumber", "intensity", "J_upper", "J_lower", "branch"];
const SERIES_COLUMNS: [&str; 2] = ["wavenumber", "intensity"];

pub fn generate(opts: &SynthOptions) -> Result<SyntheticSet, AppError> {
    if opts.lines == 0 {
        return Err(AppError::new(2, "Line count must be > 0."));
    }
    if !(opts.grid_step.is_finite() && opts.grid_step > 0.0 && opts.sigma > 0.0 && opts.gamma >= 0.0) {
        return Err(AppError::new(2, "Invalid line-shape or grid settings."));
    }

    let mut rng = StdRng::seed_from_u64(opts.seed);
    let scatter = Normal::new(0.0, opts.position_scatter.max(0.0))
        .map_err(|e| AppError::new(4, format!("Scatter distribution error: {e}")))?;
    let noise = Normal::new(0.0, opts.noise.max(0.0))
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let (b, d, kt) = (opts.rotational_constant, opts.centrifugal_constant, opts.temperature);
    let mut records = Vec::with_capacity(opts.lines);
    let mut observed = Vec::with_capacity(opts.lines);
    for j in 0..opts.lines {
        let m = (j + 1) as f64;
        let jf = j as f64;
        let position = opts.band_origin + 2.0 * b * m - 4.0 * d * m.powi(3);
        let intensity = (2.0 * jf + 1.0) * (-b * jf * (jf + 1.0) / kt).exp();

        records.push(LineRecord {
            position,
            intensity,
            cells: vec![
                format!("{position:.6}"),
                format!("{intensity:.6}"),
                (j + 1).to_string(),
                j.to_string(),
                "R".to_string(),
            ],
        });
        observed.push((position + scatter.sample(&mut rng), intensity));
    }

    let peak = observed.iter().map(|&(_, i)| i).fold(0.0_f64, f64::max);
    let experimental = match opts.kind {
        SpectrumKind::Stick => {
            let mut series = SpectralSeries {
                header: SERIES_COLUMNS.iter().map(|s| s.to_string()).collect(),
                ..SpectralSeries::default()
            };
            for &(x, i) in &observed {
                let i = i * (1.0 + noise.sample(&mut rng));
                series.positions.push(x);
                series.intensities.push(i);
                series.rows.push(vec![format!("{x:.6}"), format!("{i:.6}")]);
            }
            series
        }
        SpectrumKind::High => {
            let lo = observed.first().map_or(opts.band_origin, |o| o.0) - 1.0;
            let hi = observed.last().map_or(opts.band_origin, |o| o.0) + 1.0;
            let n = ((hi - lo) / opts.grid_step).floor() as usize + 1;

            let areas: Vec<(f64, f64)> = observed
                .iter()
                .map(|&(x, i)| (x, amplitude_from_height(i, opts.sigma, opts.gamma)))
                .collect();

            let mut series = SpectralSeries {
                header: SERIES_COLUMNS.iter().map(|s| s.to_string()).collect(),
                ..SpectralSeries::default()
            };
            for k in 0..n {
                let x = lo + k as f64 * opts.grid_step;
                let clean: f64 = areas
                    .iter()
                    .map(|&(c, a)| voigt(x, a, c, opts.sigma, opts.gamma))
                    .sum();
                let y = clean + peak * noise.sample(&mut rng);
                series.positions.push(x);
                series.intensities.push(y);
                series.rows.push(vec![format!("{x:.6}"), format!("{y:.6}")]);
            }
            series
        }
    };

    Ok(SyntheticSet {
        experimental,
        lines: LineTable::from_records(LINE_COLUMNS.iter().map(|s| s.to_string()).collect(), records),
    })
}

/// Generate and write `experimental.csv`, `lines.csv` and a matching `config.txt`.
pub fn write_synthetic(dir: &Path, opts: &SynthOptions) -> Result<WrittenFiles, AppError> {
    let set = generate(opts)?;
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", dir.display())))?;

    let experimental = dir.join("experimental.csv");
    let lines = dir.join("lines.csv");
    let config = dir.join(CONFIG_FILE);

    write_rows(&experimental, &set.experimental.header, &set.experimental.rows)?;
    let line_rows: Vec<Vec<String>> = set.lines.records.iter().map(|r| r.cells.clone()).collect();
    write_rows(&lines, &set.lines.columns, &line_rows)?;

    let text = format!(
        "exp-datafile {}\nexp-type {}\ncalc-datafile {}\ncalc-type stick\n",
        experimental.display(),
        opts.kind.label(),
        lines.display()
    );
    fs::write(&config, text)
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", config.display())))?;

    log::info!(
        "synthetic set: {} lines, {} experimental samples (seed {})",
        set.lines.len(),
        set.experimental.len(),
        opts.seed
    );

    Ok(WrittenFiles {
        files: vec![experimental.clone(), lines.clone(), config.clone()],
        experimental,
        lines,
        config,
    })
}

fn write_rows(path: &Path, header: &[String], rows: &[Vec<String>]) -> Result<(), AppError> {
    let err = |e: csv::Error| AppError::new(2, format!("Failed to write '{}': {e}", path.display()));
    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    writer.write_record(header).map_err(err)?;
    for row in rows {
        writer.write_record(row).map_err(err)?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    Ok(())
}
