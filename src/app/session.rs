//! The assignment session: the stateful core shared by every front-end.
//!
//! A session owns the loaded spectra, the two pending halves of an assignment
//! (a theoretical line and an experimental line or profile fit) and the most
//! recent successful fit. Front-ends feed it selection events and trigger
//! commits; it never renders anything.
//!
//! Every failed operation leaves the session exactly as it was.

use crate::domain::{
    Assignment, ExperimentalMode, FitResult, LineRecord, PendingExperiment, SelectionTarget, SelectionWindow,
    SessionConfig,
};
use crate::error::AssignError;
use crate::fit::LineProfileFitter;
use crate::io::{AssignmentLog, SpectrumStore};
use crate::math::index_range;

/// Where the session is in the select/select/commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    TheorySelected,
    ExperimentFitted,
    ReadyToCommit,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::TheorySelected => "theory selected",
            SessionState::ExperimentFitted => "experiment selected",
            SessionState::ReadyToCommit => "ready to commit",
        }
    }
}

/// The theoretical half of a pending assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTheory {
    /// Index into the (truncated) line table.
    pub index: usize,
    pub record: LineRecord,
}

#[derive(Debug)]
pub struct AssignmentSession {
    store: SpectrumStore,
    mode: ExperimentalMode,
    fitter: LineProfileFitter,
    log: AssignmentLog,
    pending_theory: Option<PendingTheory>,
    pending_experiment: Option<PendingExperiment>,
    last_fit: Option<FitResult>,
    history: Vec<Assignment>,
}

impl AssignmentSession {
    /// Start a session. The experimental mode is fixed from `config` for the
    /// session's lifetime.
    pub fn new(store: SpectrumStore, config: &SessionConfig) -> Self {
        Self {
            store,
            mode: config.experimental_mode(),
            fitter: LineProfileFitter::default(),
            log: AssignmentLog::new(&config.assignments_path, config.separator.clone()),
            pending_theory: None,
            pending_experiment: None,
            last_fit: None,
            history: Vec::new(),
        }
    }

    pub fn store(&self) -> &SpectrumStore {
        &self.store
    }

    pub fn mode(&self) -> ExperimentalMode {
        self.mode
    }

    pub fn log(&self) -> &AssignmentLog {
        &self.log
    }

    pub fn state(&self) -> SessionState {
        match (self.pending_theory.is_some(), self.pending_experiment.is_some()) {
            (false, false) => SessionState::Idle,
            (true, false) => SessionState::TheorySelected,
            (false, true) => SessionState::ExperimentFitted,
            (true, true) => SessionState::ReadyToCommit,
        }
    }

    pub fn pending_theory(&self) -> Option<&PendingTheory> {
        self.pending_theory.as_ref()
    }

    pub fn pending_experiment(&self) -> Option<&PendingExperiment> {
        self.pending_experiment.as_ref()
    }

    /// Most recent successful fit. Survives commits and failed fits.
    pub fn last_fit(&self) -> Option<&FitResult> {
        self.last_fit.as_ref()
    }

    /// Assignments committed during this session, oldest first.
    pub fn history(&self) -> &[Assignment] {
        &self.history
    }

    /// Dispatch a selection event from the interaction surface.
    pub fn select_region(&mut self, window: SelectionWindow) -> Result<SessionState, AssignError> {
        let window = SelectionWindow::new(window.xmin, window.xmax, window.target);
        log::debug!("selection {:?} [{}, {}]", window.target, window.xmin, window.xmax);
        match window.target {
            SelectionTarget::Theoretical => self.select_theoretical_region(window.xmin, window.xmax).map(|_| ()),
            SelectionTarget::Experimental => self.select_experimental_region(window.xmin, window.xmax).map(|_| ()),
        }?;
        Ok(self.state())
    }

    /// Match the first theoretical line inside the interval.
    pub fn select_theoretical_region(&mut self, xmin: f64, xmax: f64) -> Result<&PendingTheory, AssignError> {
        let (xmin, xmax) = ordered(xmin, xmax);
        let (index, record) = self.store.line_in(xmin, xmax).inspect_err(|e| log::warn!("{e}"))?;

        log::debug!("theory line {index} at {}", record.position);
        let pending = PendingTheory {
            index,
            record: record.clone(),
        };
        Ok(self.pending_theory.insert(pending))
    }

    /// Pick the experimental half: the first sample in stick mode, a profile
    /// fit of the window in high-res mode.
    pub fn select_experimental_region(&mut self, xmin: f64, xmax: f64) -> Result<&PendingExperiment, AssignError> {
        let (xmin, xmax) = ordered(xmin, xmax);
        let pending = match self.mode {
            ExperimentalMode::Stick => self.pick_stick(xmin, xmax)?,
            ExperimentalMode::HighRes => PendingExperiment::Profile(self.run_fit(xmin, xmax)?),
        };
        Ok(self.pending_experiment.insert(pending))
    }

    /// Explicit fit request. Only meaningful for resolved line shapes.
    pub fn fit_profile(&mut self, xmin: f64, xmax: f64) -> Result<&FitResult, AssignError> {
        if self.mode == ExperimentalMode::Stick {
            let err = AssignError::UnsupportedOperation {
                operation: "line-profile fitting",
                mode: self.mode.label(),
            };
            log::warn!("{err}");
            return Err(err);
        }
        match self.select_experimental_region(xmin, xmax)? {
            PendingExperiment::Profile(fit) => Ok(fit),
            PendingExperiment::Stick { .. } => Err(AssignError::UnsupportedOperation {
                operation: "line-profile fitting",
                mode: ExperimentalMode::Stick.label(),
            }),
        }
    }

    /// Persist the pending pair and return to idle.
    ///
    /// On failure both pending slots are kept.
    pub fn commit(&mut self) -> Result<Assignment, AssignError> {
        let theory = self.pending_theory.as_ref();
        let experiment = self.pending_experiment.as_ref();
        let (theory, experiment) = match (theory, experiment) {
            (Some(t), Some(e)) => (t, e),
            (None, _) => {
                return Err(AssignError::IncompleteSelection {
                    missing: "theoretical line",
                });
            }
            (_, None) => {
                return Err(AssignError::IncompleteSelection {
                    missing: "experimental line",
                });
            }
        };

        let assignment = Assignment {
            experimental: experiment.fields(),
            theoretical: theory.record.cells.clone(),
        };

        if let Err(e) = self.log.append(&assignment) {
            log::error!("{e}");
            return Err(e);
        }

        log::info!(
            "assigned experimental {:.6} -> theoretical {:.6} ({})",
            experiment.position(),
            theory.record.position,
            self.log.path().display()
        );

        self.pending_theory = None;
        self.pending_experiment = None;
        self.history.push(assignment.clone());
        Ok(assignment)
    }

    fn pick_stick(&self, xmin: f64, xmax: f64) -> Result<PendingExperiment, AssignError> {
        let series = &self.store.experimental;
        let range = index_range(&series.positions, xmin, xmax).inspect_err(|e| log::warn!("{e}"))?;
        let index = range.start;
        let point = series
            .point(index)
            .ok_or(AssignError::EmptySelection { xmin, xmax })?;
        Ok(PendingExperiment::Stick {
            index,
            point,
            cells: series.rows.get(index).cloned().unwrap_or_default(),
        })
    }

    fn run_fit(&mut self, xmin: f64, xmax: f64) -> Result<FitResult, AssignError> {
        let (x, y) = self
            .store
            .experimental_window(xmin, xmax)
            .inspect_err(|e| log::warn!("{e}"))?;

        log::info!("fitting {} samples in [{xmin}, {xmax}]", x.len());
        let fit = self.fitter.fit(x, y).inspect_err(|e| log::warn!("{e}"))?;
        log::info!(
            "fit center={:.6} fwhm={:.4e} height={:.4e} max|res|={:.3e}",
            fit.params.center,
            fit.params.fwhm,
            fit.params.height,
            fit.max_abs_residual
        );

        self.last_fit = Some(fit.clone());
        Ok(fit)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::{Delimiter, LineTable, SpectralSeries, SpectrumKind, DEFAULT_SEPARATOR};
    use crate::fit::amplitude_from_height;
    use crate::models::voigt;

    fn lines() -> LineTable {
        let rec = |p: f64, qn: &str| LineRecord {
            position: p,
            intensity: 1.0,
            cells: vec![p.to_string(), "1".to_string(), qn.to_string()],
        };
        LineTable::from_records(
            vec!["nu".into(), "I".into(), "J".into()],
            vec![rec(11.0, "1"), rec(15.02, "2"), rec(15.3, "3")],
        )
    }

    fn stick_series() -> SpectralSeries {
        let positions: Vec<f64> = (10..=20).map(f64::from).collect();
        let intensities: Vec<f64> = positions.iter().map(|&p| if p == 15.0 { 5.0 } else { 1.0 }).collect();
        let rows = positions
            .iter()
            .zip(&intensities)
            .map(|(p, i)| vec![p.to_string(), i.to_string()])
            .collect();
        SpectralSeries {
            header: vec!["nu".into(), "I".into()],
            positions,
            intensities,
            rows,
        }
    }

    fn dense_series() -> SpectralSeries {
        let positions: Vec<f64> = (0..=200).map(|i| 10.0 + i as f64 * 0.05).collect();
        let area = amplitude_from_height(4.0, 0.12, 0.15);
        let intensities = positions.iter().map(|&x| voigt(x, area, 15.0, 0.12, 0.15)).collect();
        SpectralSeries {
            header: vec!["nu".into(), "I".into()],
            rows: vec![Vec::new(); positions.len()],
            positions,
            intensities,
        }
    }

    fn config(kind: SpectrumKind, log: PathBuf) -> SessionConfig {
        SessionConfig {
            experimental_path: PathBuf::from("exp.csv"),
            experimental_kind: kind,
            theoretical_path: PathBuf::from("calc.csv"),
            theoretical_kind: SpectrumKind::Stick,
            line_list_path: None,
            assignments_path: log,
            delimiter: Delimiter::COMMA,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    fn session(kind: SpectrumKind, log: PathBuf) -> AssignmentSession {
        let exp = match kind {
            SpectrumKind::Stick => stick_series(),
            SpectrumKind::High => dense_series(),
        };
        let store = SpectrumStore::from_parts(exp, SpectralSeries::default(), lines());
        AssignmentSession::new(store, &config(kind, log))
    }

    #[test]
    fn state_follows_pending_slots() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::Stick, dir.path().join("a.txt"));
        assert_eq!(s.state(), SessionState::Idle);

        s.select_theoretical_region(14.9, 15.1).unwrap();
        assert_eq!(s.state(), SessionState::TheorySelected);

        s.select_experimental_region(14.5, 15.5).unwrap();
        assert_eq!(s.state(), SessionState::ReadyToCommit);

        s.commit().unwrap();
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn stick_commit_writes_raw_row_then_theory() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::Stick, dir.path().join("a.txt"));
        s.select_region(SelectionWindow::new(15.5, 14.5, SelectionTarget::Experimental))
            .unwrap();
        s.select_region(SelectionWindow::new(15.0, 15.1, SelectionTarget::Theoretical))
            .unwrap();

        let a = s.commit().unwrap();
        assert_eq!(a.experimental, vec!["15", "5"]);
        assert_eq!(a.theoretical, vec!["15.02", "1", "2"]);
        assert_eq!(s.history(), &[a.clone()]);
        assert_eq!(s.log().read_all().unwrap(), vec![a]);
    }

    #[test]
    fn wide_selection_takes_first_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::Stick, dir.path().join("a.txt"));
        let t = s.select_theoretical_region(14.0, 16.0).unwrap();
        assert_eq!(t.record.position, 15.02);
    }

    #[test]
    fn commit_with_only_theory_is_incomplete_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut s = session(SpectrumKind::Stick, path.clone());
        s.select_theoretical_region(10.9, 11.1).unwrap();

        let err = s.commit().unwrap_err();
        assert_eq!(err, AssignError::IncompleteSelection { missing: "experimental line" });
        assert_eq!(s.state(), SessionState::TheorySelected);
        assert!(!path.exists());
    }

    #[test]
    fn empty_theory_selection_leaves_state_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::Stick, dir.path().join("a.txt"));
        s.select_theoretical_region(10.9, 11.1).unwrap();

        let err = s.select_theoretical_region(100.0, 101.0).unwrap_err();
        assert!(matches!(err, AssignError::EmptySelection { .. }));
        assert_eq!(s.pending_theory().unwrap().record.position, 11.0);
        assert_eq!(s.state(), SessionState::TheorySelected);
    }

    #[test]
    fn stick_mode_rejects_profile_fits() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::Stick, dir.path().join("a.txt"));
        let err = s.fit_profile(14.0, 16.0).unwrap_err();
        assert!(matches!(err, AssignError::UnsupportedOperation { .. }));
        assert_eq!(s.state(), SessionState::Idle);
    }

    #[test]
    fn high_res_selection_fits_and_commits_parameter_vector() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::High, dir.path().join("a.txt"));

        let fit = s.fit_profile(14.0, 16.0).unwrap().clone();
        assert!((fit.params.center - 15.0).abs() < 0.1);
        assert_eq!(s.state(), SessionState::ExperimentFitted);

        s.select_theoretical_region(15.0, 15.1).unwrap();
        let a = s.commit().unwrap();
        assert_eq!(a.experimental.len(), 7);
        assert_eq!(a.experimental[1], fit.params.center.to_string());
        assert_eq!(s.last_fit(), Some(&fit));
    }

    #[test]
    fn failed_fit_keeps_previous_fit() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::High, dir.path().join("a.txt"));
        let first = s.fit_profile(14.0, 16.0).unwrap().clone();

        // Three samples: too few for five free parameters.
        let err = s.fit_profile(14.99, 15.11).unwrap_err();
        assert!(matches!(err, AssignError::InsufficientData { points: 3, .. }));
        assert_eq!(s.last_fit(), Some(&first));
        assert_eq!(s.pending_experiment(), Some(&PendingExperiment::Profile(first)));
    }

    #[test]
    fn log_write_failure_keeps_both_slots() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = session(SpectrumKind::Stick, dir.path().join("no-such-dir").join("a.txt"));
        s.select_theoretical_region(10.9, 11.1).unwrap();
        s.select_experimental_region(10.9, 11.1).unwrap();

        let err = s.commit().unwrap_err();
        assert!(matches!(err, AssignError::LogWrite { .. }));
        assert_eq!(s.state(), SessionState::ReadyToCommit);
        assert!(s.history().is_empty());
    }
}
