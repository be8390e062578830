use std::fs;
use std::path::{Path, PathBuf};

use rova::app::{AssignmentSession, SessionState};
use rova::domain::{Delimiter, SelectionTarget, SelectionWindow, SessionConfig, SpectrumKind, DEFAULT_SEPARATOR};
use rova::error::AssignError;
use rova::io::SpectrumStore;

/// Baseline 1 with a Gaussian line of height 4 at 15, sampled every 0.05 on [10, 20].
fn write_high_res(path: &Path) {
    let mut text = String::from("wavenumber,intensity\n");
    for i in 0..=200 {
        let x = 10.0 + i as f64 * 0.05;
        let y = 1.0 + 4.0 * (-(x - 15.0_f64).powi(2) / (2.0 * 0.25_f64.powi(2))).exp();
        text.push_str(&format!("{x:.2},{y}\n"));
    }
    fs::write(path, text).unwrap();
}

fn write_stick(path: &Path) {
    let mut text = String::from("wavenumber,intensity\n");
    for i in 10..=20 {
        let y = if i == 15 { 5.0 } else { 1.0 };
        text.push_str(&format!("{i},{y}\n"));
    }
    fs::write(path, text).unwrap();
}

fn write_lines(path: &Path) {
    fs::write(
        path,
        "wavenumber,intensity,J_upper,J_lower,branch\n\
         9.5,0.1,0,1,P\n\
         12.1,0.4,2,1,R\n\
         15.02,1.0,5,4,R\n\
         15.4,0.7,6,5,R\n\
         25.0,0.1,9,8,R\n",
    )
    .unwrap();
}

fn setup(dir: &Path, kind: SpectrumKind) -> SessionConfig {
    let exp = dir.join("experimental.csv");
    let calc = dir.join("lines.csv");
    match kind {
        SpectrumKind::High => write_high_res(&exp),
        SpectrumKind::Stick => write_stick(&exp),
    }
    write_lines(&calc);
    SessionConfig {
        experimental_path: exp,
        experimental_kind: kind,
        theoretical_path: calc,
        theoretical_kind: SpectrumKind::Stick,
        line_list_path: None,
        assignments_path: dir.join("assignments.txt"),
        delimiter: Delimiter::COMMA,
        separator: DEFAULT_SEPARATOR.to_string(),
    }
}

fn start(config: &SessionConfig) -> AssignmentSession {
    let store = SpectrumStore::load(config).unwrap();
    AssignmentSession::new(store, config)
}

fn line_count(path: &PathBuf) -> usize {
    fs::read_to_string(path).map(|t| t.lines().count()).unwrap_or(0)
}

#[test]
fn load_truncates_lines_to_experimental_range() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), SpectrumKind::Stick);
    let session = start(&config);

    let lines = &session.store().lines;
    assert_eq!(lines.positions, vec![12.1, 15.02, 15.4]);
    assert!(lines.positions.iter().all(|&p| (10.0..=20.0).contains(&p)));
    assert_eq!(session.store().truncated, 2);
}

#[test]
fn high_res_cycle_fits_commits_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), SpectrumKind::High);
    let mut session = start(&config);

    let state = session
        .select_region(SelectionWindow::new(14.9, 15.1, SelectionTarget::Theoretical))
        .unwrap();
    assert_eq!(state, SessionState::TheorySelected);
    let matched = session.pending_theory().unwrap().record.cells.clone();
    assert_eq!(matched, vec!["15.02", "1.0", "5", "4", "R"]);

    // Spans may be dragged right to left.
    let state = session
        .select_region(SelectionWindow::new(16.0, 14.0, SelectionTarget::Experimental))
        .unwrap();
    assert_eq!(state, SessionState::ReadyToCommit);

    let fit = session.last_fit().unwrap().clone();
    assert_eq!(fit.x.len(), 41);
    assert!((fit.params.center - 15.0).abs() < 0.1, "center {}", fit.params.center);

    let written = session.commit().unwrap();
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(written.experimental.len(), 7);

    let logged = session.log().read_all().unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].theoretical, matched);
    let center: f64 = logged[0].experimental[1].parse().unwrap();
    assert_eq!(center, fit.params.center);

    let text = fs::read_to_string(&config.assignments_path).unwrap();
    assert!(text.contains(",-> Assignment ->,15.02,1.0,5,4,R"));
}

#[test]
fn fitting_the_same_window_twice_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), SpectrumKind::High);
    let mut session = start(&config);

    let first = session.fit_profile(14.0, 16.0).unwrap().params;
    let second = session.fit_profile(14.0, 16.0).unwrap().params;
    assert_eq!(first, second);
}

#[test]
fn stick_cycle_persists_the_raw_experimental_row() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), SpectrumKind::Stick);
    let mut session = start(&config);

    session.select_experimental_region(14.5, 15.5).unwrap();
    session.select_theoretical_region(15.0, 15.5).unwrap();
    let written = session.commit().unwrap();
    assert_eq!(written.experimental, vec!["15", "5"]);
    assert_eq!(written.theoretical, vec!["15.02", "1.0", "5", "4", "R"]);

    let err = session.fit_profile(14.0, 16.0).unwrap_err();
    assert!(matches!(err, AssignError::UnsupportedOperation { .. }));
}

#[test]
fn incomplete_commit_leaves_the_log_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), SpectrumKind::Stick);
    let mut session = start(&config);

    session.select_experimental_region(11.5, 12.5).unwrap();
    session.select_theoretical_region(11.9, 12.2).unwrap();
    session.commit().unwrap();
    let before = line_count(&config.assignments_path);
    assert_eq!(before, 1);

    session.select_theoretical_region(15.0, 15.1).unwrap();
    let err = session.commit().unwrap_err();
    assert_eq!(
        err,
        AssignError::IncompleteSelection {
            missing: "experimental line"
        }
    );
    assert_eq!(line_count(&config.assignments_path), before);
    assert_eq!(session.state(), SessionState::TheorySelected);
}

#[test]
fn empty_selection_is_reported_and_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let config = setup(dir.path(), SpectrumKind::High);
    let mut session = start(&config);

    let err = session
        .select_region(SelectionWindow::new(100.0, 101.0, SelectionTarget::Experimental))
        .unwrap_err();
    assert!(matches!(err, AssignError::EmptySelection { .. }));
    assert!(err.is_recoverable());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.last_fit().is_none());
}

#[test]
fn missing_line_list_for_broadened_theory_fails_to_load() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = setup(dir.path(), SpectrumKind::Stick);
    config.theoretical_kind = SpectrumKind::High;

    let err = SpectrumStore::load(&config).unwrap_err();
    assert!(matches!(err, AssignError::DataLoad { .. }));
    assert!(!err.is_recoverable());
}
