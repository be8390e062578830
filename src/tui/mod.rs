//! Ratatui-based terminal UI.
//!
//! A thin front-end over [`AssignmentSession`]: three stacked panels share one
//! x view (residuals, experimental spectrum, theoretical sticks drawn
//! downward), and a keyboard span selector turns cursor movements into
//! `(xmin, xmax, target)` selection events.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};

use crate::app::AssignmentSession;
use crate::domain::{ExperimentalMode, PendingExperiment, SelectionTarget, SelectionWindow, SessionConfig, SpectrumKind};
use crate::error::AppError;
use crate::math::{index_range, nearest_index};
use crate::models::predict;

mod plotters_chart;

use plotters_chart::{padded_y_bounds, SpectrumChart};

/// Start the TUI on an already loaded session.
pub fn run(session: AssignmentSession, config: SessionConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(session, config);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    session: AssignmentSession,
    config: SessionConfig,
    target: SelectionTarget,
    cursor: f64,
    /// First edge of a span in progress.
    anchor: Option<f64>,
    last_span: Option<(f64, f64)>,
    full_view: [f64; 2],
    view: [f64; 2],
    show_fit: bool,
    message: String,
}

impl App {
    fn new(session: AssignmentSession, config: SessionConfig) -> Self {
        let full_view = match session.store().experimental.bounds() {
            Some((lo, hi)) if hi > lo => [lo, hi],
            Some((x, _)) => [x - 1.0, x + 1.0],
            None => [0.0, 1.0],
        };
        Self {
            session,
            config,
            target: SelectionTarget::Experimental,
            cursor: full_view[0],
            anchor: None,
            last_span: None,
            full_view,
            view: full_view,
            show_fit: false,
            message: "Tab switches trace, Space marks a span.".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Apply one key press. Returns `true` to quit.
    ///
    /// Session errors are reported in the status line; none of them ends the
    /// session.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let coarse = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab => {
                self.target = match self.target {
                    SelectionTarget::Experimental => SelectionTarget::Theoretical,
                    SelectionTarget::Theoretical => SelectionTarget::Experimental,
                };
                self.anchor = None;
                self.message = format!("target: {}", target_label(self.target));
            }
            KeyCode::Left => self.move_cursor(false, coarse),
            KeyCode::Right => self.move_cursor(true, coarse),
            KeyCode::Esc => {
                if self.anchor.take().is_some() {
                    self.message = "Span cancelled.".to_string();
                }
            }
            KeyCode::Char(' ') => self.mark_span(),
            KeyCode::Char('f') => self.show_last_fit(),
            KeyCode::Char('a') => match self.session.commit() {
                Ok(assignment) => {
                    self.message = format!(
                        "committed: {}",
                        crate::report::format_assignment(&assignment, &self.config.separator)
                    );
                }
                Err(err) => self.message = err.to_string(),
            },
            KeyCode::Char('z') => match self.last_span {
                Some((a, b)) if b > a => {
                    self.view = [a, b];
                    self.cursor = self.cursor.clamp(a, b);
                    self.message = format!("view: [{a:.6}, {b:.6}]");
                }
                _ => self.message = "Mark a span wider than zero to zoom.".to_string(),
            },
            KeyCode::Char('u') => {
                self.view = self.full_view;
                self.message = "view reset".to_string();
            }
            KeyCode::Char('d') => match crate::debug::write_debug_bundle(&self.session, &self.config) {
                Ok(path) => {
                    self.message = format!("Wrote debug bundle: {}", path.display());
                }
                Err(err) => {
                    self.message = format!("Debug write failed: {err}");
                }
            },
            _ => {}
        }

        false
    }

    fn target_positions(&self) -> &[f64] {
        let store = self.session.store();
        match self.target {
            SelectionTarget::Experimental => &store.experimental.positions,
            SelectionTarget::Theoretical => &store.lines.positions,
        }
    }

    fn move_cursor(&mut self, forward: bool, coarse: bool) {
        self.cursor = step_cursor(self.target_positions(), self.view, self.cursor, forward, coarse);
    }

    fn mark_span(&mut self) {
        let Some(anchor) = self.anchor.take() else {
            self.anchor = Some(self.cursor);
            self.message = format!("span from {:.6}: move and press Space again", self.cursor);
            return;
        };

        let window = SelectionWindow::new(anchor, self.cursor, self.target);
        self.last_span = Some((window.xmin, window.xmax));
        self.message = match self.session.select_region(window) {
            Ok(state) => {
                let picked = match window.target {
                    SelectionTarget::Theoretical => self
                        .session
                        .pending_theory()
                        .map(|t| format!("line #{} at {:.6}", t.index, t.record.position)),
                    SelectionTarget::Experimental => self.session.pending_experiment().map(|e| match e {
                        PendingExperiment::Stick { point, .. } => format!("line at {:.6}", point.position),
                        PendingExperiment::Profile(fit) => {
                            format!("fit center {:.6} fwhm {:.4e}", fit.params.center, fit.params.fwhm)
                        }
                    }),
                };
                if self.session.mode() == ExperimentalMode::HighRes && window.target == SelectionTarget::Experimental {
                    self.show_fit = true;
                }
                format!("{} -> {}", picked.unwrap_or_default(), state.label())
            }
            Err(err) => err.to_string(),
        };
    }

    fn show_last_fit(&mut self) {
        if self.session.mode() == ExperimentalMode::Stick {
            let (a, b) = self.last_span.unwrap_or((self.cursor, self.cursor));
            if let Err(err) = self.session.fit_profile(a, b) {
                self.message = err.to_string();
            }
            return;
        }
        match self.session.last_fit() {
            Some(fit) => {
                self.show_fit = true;
                self.message = format!(
                    "fit: center {:.6} height {:.4e} max|res| {:.3e} ({} iterations)",
                    fit.params.center, fit.params.height, fit.max_abs_residual, fit.iterations
                );
            }
            None => self.message = "No fit yet: mark a span on the experimental trace.".to_string(),
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(4)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_panels(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let store = self.session.store();
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("rova", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " | exp: {} ({}) | theory: {} | {} lines",
                self.config.experimental_path.display(),
                self.session.mode().label(),
                self.config.theoretical_path.display(),
                store.lines.len(),
            )),
        ]));

        let readout = nearest_index(self.target_positions(), self.cursor)
            .map(|i| format!(" | nearest {:.6}", self.target_positions()[i]))
            .unwrap_or_default();
        let anchor = self.anchor.map(|a| format!(" | anchor {a:.6}")).unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!(
                "target: {} | cursor {:.6}{readout}{anchor} | view [{:.4}, {:.4}]",
                target_label(self.target),
                self.cursor,
                self.view[0],
                self.view[1],
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_panels(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(20), Constraint::Percentage(45), Constraint::Percentage(35)])
            .split(area);

        let store = self.session.store();
        let fit = self.session.last_fit().filter(|_| self.show_fit);
        let span = self.anchor.map(|a| (a.min(self.cursor), a.max(self.cursor))).or(self.last_span);

        // Residuals.
        let residuals: Vec<(f64, f64)> = fit
            .map(|f| f.x.iter().copied().zip(f.residuals.iter().copied()).collect())
            .unwrap_or_default();
        self.draw_chart(
            frame,
            chunks[0],
            "Residuals",
            SpectrumChart {
                trace: &residuals,
                sticks: &[],
                overlay: &[],
                marked: &[],
                cursor: Some(self.cursor),
                span,
                zero_line: true,
                x_bounds: self.view,
                y_bounds: padded_y_bounds(&residuals, true),
                y_label: "obs - fit",
                active: false,
            },
        );

        // Experimental spectrum.
        let exp = visible(&store.experimental.positions, &store.experimental.intensities, self.view, 1.0);
        let (trace, sticks) = match self.session.mode() {
            ExperimentalMode::HighRes => (exp, Vec::new()),
            ExperimentalMode::Stick => (Vec::new(), exp),
        };
        let overlay: Vec<(f64, f64)> = fit.map(|f| profile_curve(&f.params, &f.x)).unwrap_or_default();
        let marked: Vec<(f64, f64)> = match self.session.pending_experiment() {
            Some(PendingExperiment::Stick { point, .. }) => vec![(point.position, point.intensity)],
            Some(PendingExperiment::Profile(f)) => vec![(f.params.center, predict(&f.params, f.params.center))],
            None => Vec::new(),
        };
        let exp_bounds = padded_y_bounds(
            trace.iter().chain(&sticks).chain(&overlay),
            self.session.mode() == ExperimentalMode::Stick,
        );
        self.draw_chart(
            frame,
            chunks[1],
            "Experimental",
            SpectrumChart {
                trace: &trace,
                sticks: &sticks,
                overlay: &overlay,
                marked: &marked,
                cursor: Some(self.cursor),
                span,
                zero_line: false,
                x_bounds: self.view,
                y_bounds: exp_bounds,
                y_label: "intensity",
                active: self.target == SelectionTarget::Experimental,
            },
        );

        // Theory, drawn downward.
        let theory_sticks = visible(&store.lines.positions, &line_intensities(self), self.view, -1.0);
        let theory_trace = if self.config.theoretical_kind == SpectrumKind::High {
            visible(&store.theoretical.positions, &store.theoretical.intensities, self.view, -1.0)
        } else {
            Vec::new()
        };
        let theory_marked: Vec<(f64, f64)> = self
            .session
            .pending_theory()
            .map(|t| vec![(t.record.position, -t.record.intensity)])
            .unwrap_or_default();
        self.draw_chart(
            frame,
            chunks[2],
            "Theoretical",
            SpectrumChart {
                trace: &theory_trace,
                sticks: &theory_sticks,
                overlay: &[],
                marked: &theory_marked,
                cursor: Some(self.cursor),
                span,
                zero_line: false,
                x_bounds: self.view,
                y_bounds: padded_y_bounds(theory_sticks.iter().chain(&theory_trace), true),
                y_label: "intensity",
                active: self.target == SelectionTarget::Theoretical,
            },
        );
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, chart: SpectrumChart<'_>) {
        let style = if chart.active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let block = Block::default().title(title.to_string()).title_style(style).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);
        frame.render_widget(chart, inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab target  ←/→ move (Shift coarse)  Space span  f fit  a commit  z zoom  u unzoom  d debug  q quit";
        let lines = vec![
            Line::from(Span::styled(help, Style::default().fg(Color::Gray))),
            Line::from(vec![
                Span::raw(crate::report::format_status(&self.session)),
                Span::raw(" | "),
                Span::styled(&self.message, Style::default().fg(Color::Yellow)),
            ]),
        ];
        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn target_label(target: SelectionTarget) -> &'static str {
    match target {
        SelectionTarget::Experimental => "experimental",
        SelectionTarget::Theoretical => "theoretical",
    }
}

fn line_intensities(app: &App) -> Vec<f64> {
    app.session.store().lines.records.iter().map(|r| r.intensity).collect()
}

/// Points of a series inside the view, with intensities scaled by `sign`.
fn visible(positions: &[f64], intensities: &[f64], view: [f64; 2], sign: f64) -> Vec<(f64, f64)> {
    let Ok(range) = index_range(positions, view[0], view[1]) else {
        return Vec::new();
    };
    positions[range.clone()]
        .iter()
        .zip(&intensities[range])
        .map(|(&x, &y)| (x, sign * y))
        .collect()
}

/// The fitted profile on a dense grid across the fit window.
fn profile_curve(params: &crate::domain::VoigtParams, x: &[f64]) -> Vec<(f64, f64)> {
    let (Some(&lo), Some(&hi)) = (x.first(), x.last()) else {
        return Vec::new();
    };
    let n = 200usize;
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = lo + u * (hi - lo);
            (x, predict(params, x))
        })
        .collect()
}

/// Next cursor position.
///
/// Fine steps snap to the neighbouring sample of the active trace; coarse
/// steps move a twentieth of the view. The result stays inside the view.
fn step_cursor(positions: &[f64], view: [f64; 2], cursor: f64, forward: bool, coarse: bool) -> f64 {
    let width = view[1] - view[0];
    let next = match nearest_index(positions, cursor) {
        Some(i) if !coarse => {
            let snapped = positions[i];
            let j = if (forward && snapped > cursor) || (!forward && snapped < cursor) {
                i
            } else if forward {
                (i + 1).min(positions.len() - 1)
            } else {
                i.saturating_sub(1)
            };
            positions[j]
        }
        Some(_) => cursor + if forward { width / 20.0 } else { -width / 20.0 },
        None => cursor + if forward { width / 200.0 } else { -width / 200.0 },
    };
    next.clamp(view[0], view[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Delimiter, LineRecord, LineTable, SpectralSeries};
    use crate::io::SpectrumStore;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn stick_app(dir: &std::path::Path) -> App {
        let exp = SpectralSeries {
            header: vec!["x".into(), "y".into()],
            positions: vec![14.0, 15.0, 16.0],
            intensities: vec![1.0, 5.0, 1.0],
            rows: vec![
                vec!["14".into(), "1".into()],
                vec!["15".into(), "5".into()],
                vec!["16".into(), "1".into()],
            ],
        };
        let lines = LineTable::from_records(
            vec!["nu".into(), "I".into(), "J".into()],
            vec![LineRecord {
                position: 15.02,
                intensity: 1.0,
                cells: vec!["15.02".into(), "1".into(), "2".into()],
            }],
        );
        let config = SessionConfig {
            experimental_path: "exp.csv".into(),
            experimental_kind: SpectrumKind::Stick,
            theoretical_path: "calc.csv".into(),
            theoretical_kind: SpectrumKind::Stick,
            line_list_path: None,
            assignments_path: dir.join("assignments.txt"),
            delimiter: Delimiter::COMMA,
            separator: "->".into(),
        };
        let store = SpectrumStore::from_parts(exp, SpectralSeries::default(), lines);
        App::new(AssignmentSession::new(store, &config), config)
    }

    #[test]
    fn fine_steps_snap_to_samples() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let view = [0.0, 5.0];
        assert_eq!(step_cursor(&xs, view, 2.0, true, false), 3.0);
        assert_eq!(step_cursor(&xs, view, 2.4, true, false), 3.0);
        assert_eq!(step_cursor(&xs, view, 2.6, true, false), 3.0);
        assert_eq!(step_cursor(&xs, view, 2.0, false, false), 1.0);
        assert_eq!(step_cursor(&xs, view, 1.0, false, false), 1.0);
        assert_eq!(step_cursor(&xs, view, 4.0, true, false), 4.0);
    }

    #[test]
    fn coarse_steps_stay_in_view() {
        let xs = [1.0, 2.0];
        assert_eq!(step_cursor(&xs, [0.0, 10.0], 2.0, true, true), 2.5);
        assert_eq!(step_cursor(&xs, [0.0, 10.0], 0.2, false, true), 0.0);
        assert_eq!(step_cursor(&[], [0.0, 10.0], 9.98, true, false), 10.0);
    }

    #[test]
    fn keyboard_span_selects_and_commits() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = stick_app(dir.path());
        assert_eq!(app.cursor, 14.0);

        // Theory: span [14, 15.02].
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.cursor, 15.02);
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.session.pending_theory().is_some());

        // Experiment: span [15, 15.02] picks the line at 15.
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.cursor, 15.0);
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.last_span, Some((15.0, 15.02)));

        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.session.history().len(), 1);
        assert!(app.message.starts_with("committed: 15 5 -> 15.02 1 2"));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn errors_surface_in_the_status_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = stick_app(dir.path());

        app.handle_key(key(KeyCode::Char('a')));
        assert!(app.message.contains("no theoretical line selected"));

        app.handle_key(key(KeyCode::Char('f')));
        assert!(app.message.contains("not available for a stick"));

        // An empty theory span leaves the session idle.
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Char(' ')));
        assert!(app.message.starts_with("no data points inside the selection"));
        assert!(app.session.pending_theory().is_none());
    }

    #[test]
    fn zoom_follows_last_span() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = stick_app(dir.path());
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Right));
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Char('z')));
        assert_eq!(app.view, [14.0, 15.0]);
        app.handle_key(key(KeyCode::Char('u')));
        assert_eq!(app.view, [14.0, 16.0]);
    }
}
