//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized (important for snapshot tests)

use std::path::Path;

use crate::app::{AssignmentSession, SessionState};
use crate::domain::{Assignment, FitResult, LineRecord, LineTable, PendingExperiment, VoigtParams};

/// Full report of one line-profile fit.
pub fn format_fit_report(fit: &FitResult, source: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== rova - line profile fit ===\n");
    out.push_str(&format!("Source: {}\n", source.display()));
    out.push_str(&format!(
        "Window: n={} | x=[{:.6}, {:.6}]\n",
        fit.x.len(),
        fit.x.first().copied().unwrap_or(f64::NAN),
        fit.x.last().copied().unwrap_or(f64::NAN),
    ));
    out.push_str(&format!(
        "Fit: iterations={} chi2={:.6e} max|res|={:.6e}\n",
        fit.iterations, fit.chi_square, fit.max_abs_residual
    ));

    out.push('\n');
    out.push_str(&format_params_table(&fit.params, Some(&fit.initial)));
    out
}

/// Parameter table, optionally next to the starting values.
pub fn format_params_table(params: &VoigtParams, initial: Option<&VoigtParams>) -> String {
    let mut out = String::new();
    out.push_str(format!("{:<10} {:>16} {:>16}\n", "param", "value", "initial").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<16} {:-<16}\n", "", "", "").trim_end());
    out.push('\n');

    let init = initial.map(VoigtParams::to_vec);
    for (i, (name, value)) in VoigtParams::NAMES.iter().zip(params.to_vec()).enumerate() {
        let start = init
            .as_ref()
            .and_then(|v| v.get(i))
            .map(|v| format!("{v:.8e}"))
            .unwrap_or_default();
        out.push_str(format!("{name:<10} {value:>16.8e} {start:>16}\n").trim_end());
        out.push('\n');
    }
    out
}

/// One theoretical line with its labelled fields.
pub fn format_line_record(table: &LineTable, record: &LineRecord, index: usize, matches: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Line #{index}: position={} intensity={}\n",
        record.position, record.intensity
    ));
    for (name, value) in table.labelled_fields(record) {
        out.push_str(&format!("  {name:<12} {value}\n"));
    }
    if matches > 1 {
        out.push_str(&format!(
            "({matches} lines in the window; the lowest-position one is used)\n"
        ));
    }
    out
}

/// One-line summary of the session for the status bar.
pub fn format_status(session: &AssignmentSession) -> String {
    let theory = session
        .pending_theory()
        .map(|t| format!("{:.6}", t.record.position))
        .unwrap_or_else(|| "-".to_string());
    let experiment = session
        .pending_experiment()
        .map(|e| match e {
            PendingExperiment::Stick { point, .. } => format!("{:.6}", point.position),
            PendingExperiment::Profile(fit) => format!("{:.6} (fit)", fit.params.center),
        })
        .unwrap_or_else(|| "-".to_string());

    let hint = match session.state() {
        SessionState::Idle => "",
        SessionState::TheorySelected => " | select an experimental line",
        SessionState::ExperimentFitted => " | select a theoretical line",
        SessionState::ReadyToCommit => " | press 'a' to commit",
    };

    format!(
        "[{}] {} | exp={experiment} theory={theory} | committed={}{hint}",
        session.mode().label(),
        session.state().label(),
        session.history().len(),
    )
}

/// A committed record, as it reads in the log.
pub fn format_assignment(assignment: &Assignment, separator: &str) -> String {
    format!(
        "{} {separator} {}",
        assignment.experimental.join(" "),
        assignment.theoretical.join(" ")
    )
}
