//! Debug bundle writer for inspecting a session's inputs, pending selections
//! and the last profile fit.

use std::fs::{create_dir_all, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::AssignmentSession;
use crate::domain::{PendingExperiment, SessionConfig, VoigtParams};
use crate::error::AppError;

pub fn write_debug_bundle(session: &AssignmentSession, config: &SessionConfig) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), session, config)
}

/// Same as [`write_debug_bundle`], into an explicit directory.
pub fn write_debug_bundle_in(
    dir: &Path,
    session: &AssignmentSession,
    config: &SessionConfig,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir).map_err(|e| AppError::new(4, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("rova_debug_{ts}.md"));

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(4, format!("Failed to create debug file: {e}")))?;
    write_bundle(&mut file, session, config).map_err(|e| AppError::new(4, format!("Failed to write debug: {e}")))?;

    log::info!("debug bundle written to {}", path.display());
    Ok(path)
}

fn write_bundle(file: &mut File, session: &AssignmentSession, config: &SessionConfig) -> io::Result<()> {
    let store = session.store();

    writeln!(file, "# rova debug bundle")?;
    writeln!(file, "- generated: {}", Local::now().to_rfc3339())?;
    writeln!(
        file,
        "- experimental: {} ({})",
        config.experimental_path.display(),
        config.experimental_kind.label()
    )?;
    writeln!(
        file,
        "- theoretical: {} ({})",
        config.theoretical_path.display(),
        config.theoretical_kind.label()
    )?;
    if let Some(lines) = &config.line_list_path {
        writeln!(file, "- line_list: {}", lines.display())?;
    }
    writeln!(file, "- assignments: {}", config.assignments_path.display())?;
    writeln!(file, "- separator: {:?}", config.separator)?;

    writeln!(file, "\n## Data")?;
    writeln!(file, "| series | n | min | max |")?;
    writeln!(file, "| - | - | - | - |")?;
    let bounds = |b: Option<(f64, f64)>| b.unwrap_or((f64::NAN, f64::NAN));
    let (lo, hi) = bounds(store.experimental.bounds());
    writeln!(file, "| experimental | {} | {lo:.6} | {hi:.6} |", store.experimental.len())?;
    let (lo, hi) = bounds(store.theoretical.bounds());
    writeln!(file, "| theoretical | {} | {lo:.6} | {hi:.6} |", store.theoretical.len())?;
    let (lo, hi) = bounds(store.lines.positions.first().copied().zip(store.lines.positions.last().copied()));
    writeln!(file, "| lines | {} | {lo:.6} | {hi:.6} |", store.lines.len())?;
    writeln!(file, "- truncated: {}", store.truncated)?;

    writeln!(file, "\n## Session")?;
    writeln!(file, "- state: {}", session.state().label())?;
    writeln!(file, "- committed: {}", session.history().len())?;
    match session.pending_theory() {
        Some(t) => writeln!(file, "- theory: #{} {}", t.index, t.record.cells.join(" "))?,
        None => writeln!(file, "- theory: -")?,
    }
    match session.pending_experiment() {
        Some(PendingExperiment::Stick { index, cells, .. }) => {
            writeln!(file, "- experiment: #{index} {}", cells.join(" "))?
        }
        Some(PendingExperiment::Profile(fit)) => writeln!(file, "- experiment: fit at {:.6}", fit.params.center)?,
        None => writeln!(file, "- experiment: -")?,
    }

    let Some(fit) = session.last_fit() else {
        writeln!(file, "\nNo profile fit yet.")?;
        return Ok(());
    };

    writeln!(file, "\n## Last fit")?;
    writeln!(
        file,
        "iterations={} chi2={:.6e} max|res|={:.6e}",
        fit.iterations, fit.chi_square, fit.max_abs_residual
    )?;
    writeln!(file, "| param | value | initial |")?;
    writeln!(file, "| - | - | - |")?;
    for ((name, value), start) in VoigtParams::NAMES
        .iter()
        .zip(fit.params.to_vec())
        .zip(fit.initial.to_vec())
    {
        writeln!(file, "| {name} | {value:.8e} | {start:.8e} |")?;
    }

    writeln!(file, "\n### Samples")?;
    writeln!(file, "| x | y_obs | y_fit | residual |")?;
    writeln!(file, "| - | - | - | - |")?;
    for (((x, y), f), r) in fit.x.iter().zip(&fit.y_obs).zip(&fit.y_fit).zip(&fit.residuals) {
        writeln!(file, "| {x:.6} | {y:.6} | {f:.6} | {r:.3e} |")?;
    }

    Ok(())
}
