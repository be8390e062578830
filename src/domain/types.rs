//! Shared domain types.
//!
//! Spectra and line tables are immutable after load; the fit and assignment
//! types are small value objects that the session hands to front-ends and the
//! persistence layer.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Separator token written between the experimental and theoretical halves of
/// an assignment record.
pub const DEFAULT_SEPARATOR: &str = "-> Assignment ->";

/// Default file name of the append-only assignment log.
pub const DEFAULT_ASSIGNMENTS_FILE: &str = "assignments.txt";

/// Column separator of the input files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// One byte, with CSV quoting.
    Byte(u8),
    /// Any run of spaces or tabs, as in column-aligned text exports.
    Whitespace,
}

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter::Byte(b',');
}

/// Declared resolution of an input spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumKind {
    /// Discrete (position, intensity) lines without resolved shapes.
    Stick,
    /// Resolved line profiles (a sampled, broadened spectrum).
    High,
}

impl SpectrumKind {
    /// Parse the tokens accepted in `config.txt`.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "stick" => Some(SpectrumKind::Stick),
            "high" | "high-res" | "highres" => Some(SpectrumKind::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpectrumKind::Stick => "stick",
            SpectrumKind::High => "high",
        }
    }
}

/// Which experimental branch a session runs. Fixed for the session lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentalMode {
    Stick,
    HighRes,
}

impl ExperimentalMode {
    pub fn label(self) -> &'static str {
        match self {
            ExperimentalMode::Stick => "stick",
            ExperimentalMode::HighRes => "high-res",
        }
    }
}

impl From<SpectrumKind> for ExperimentalMode {
    fn from(kind: SpectrumKind) -> Self {
        match kind {
            SpectrumKind::Stick => ExperimentalMode::Stick,
            SpectrumKind::High => ExperimentalMode::HighRes,
        }
    }
}

/// One sample of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralPoint {
    pub position: f64,
    pub intensity: f64,
}

/// A spectrum sorted ascending by position.
///
/// Positions and intensities are stored as parallel arrays so range lookups can
/// run directly on `positions`. `rows` keeps every input cell as read, which is
/// what a stick-mode assignment persists.
#[derive(Debug, Clone, Default)]
pub struct SpectralSeries {
    pub header: Vec<String>,
    pub positions: Vec<f64>,
    pub intensities: Vec<f64>,
    pub rows: Vec<Vec<String>>,
}

impl SpectralSeries {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn point(&self, index: usize) -> Option<SpectralPoint> {
        Some(SpectralPoint {
            position: *self.positions.get(index)?,
            intensity: *self.intensities.get(index)?,
        })
    }

    /// `(min, max)` position, or `None` for an empty series.
    pub fn bounds(&self) -> Option<(f64, f64)> {
        Some((*self.positions.first()?, *self.positions.last()?))
    }

}

/// A single cell of a line-table row, typed by inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Empty,
}

impl FieldValue {
    pub fn guess(raw: &str) -> Self {
        let s = raw.trim();
        if s.is_empty() {
            return FieldValue::Empty;
        }
        if let Ok(i) = s.parse::<i64>() {
            return FieldValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return FieldValue::Float(f);
        }
        FieldValue::Text(s.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Empty => Ok(()),
        }
    }
}

/// One theoretical line: position, intensity and its identifying fields.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    pub position: f64,
    pub intensity: f64,
    /// Every column of the input row as read (position and intensity first).
    pub cells: Vec<String>,
}

impl LineRecord {
    /// The identifying (quantum-number) cells: everything after intensity.
    pub fn quantum_numbers(&self) -> &[String] {
        self.cells.get(2..).unwrap_or(&[])
    }
}

/// Theoretical line list, sorted by position and truncated to the
/// experimental range at load time.
#[derive(Debug, Clone, Default)]
pub struct LineTable {
    pub columns: Vec<String>,
    pub records: Vec<LineRecord>,
    /// `records[i].position`, kept contiguous for range lookups.
    pub positions: Vec<f64>,
}

impl LineTable {
    pub fn from_records(columns: Vec<String>, records: Vec<LineRecord>) -> Self {
        let positions = records.iter().map(|r| r.position).collect();
        Self {
            columns,
            records,
            positions,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Named, typed view of a record's quantum-number fields.
    pub fn labelled_fields<'a>(&'a self, record: &'a LineRecord) -> Vec<(&'a str, FieldValue)> {
        self.columns
            .iter()
            .skip(2)
            .zip(record.quantum_numbers())
            .map(|(name, raw)| (name.as_str(), FieldValue::guess(raw)))
            .collect()
    }
}

/// Fitted (or guessed) Voigt + constant parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoigtParams {
    pub amplitude: f64,
    pub center: f64,
    /// Gaussian width.
    pub sigma: f64,
    /// Lorentzian width.
    pub gamma: f64,
    pub fwhm: f64,
    pub height: f64,
    /// Constant baseline.
    pub baseline: f64,
}

impl VoigtParams {
    /// Column names of the persisted parameter vector.
    pub const NAMES: [&'static str; 7] = ["amplitude", "center", "sigma", "gamma", "fwhm", "height", "c"];

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.amplitude,
            self.center,
            self.sigma,
            self.gamma,
            self.fwhm,
            self.height,
            self.baseline,
        ]
    }
}

/// Output of one line-profile fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub params: VoigtParams,
    /// Starting point handed to the optimizer.
    pub initial: VoigtParams,
    pub x: Vec<f64>,
    pub y_obs: Vec<f64>,
    pub y_fit: Vec<f64>,
    /// `y_obs - y_fit`.
    pub residuals: Vec<f64>,
    pub max_abs_residual: f64,
    pub chi_square: f64,
    pub iterations: usize,
}

/// Which trace a selection was made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionTarget {
    Experimental,
    Theoretical,
}

/// A user-selected x interval. Always stored with `xmin <= xmax`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionWindow {
    pub xmin: f64,
    pub xmax: f64,
    pub target: SelectionTarget,
}

impl SelectionWindow {
    pub fn new(a: f64, b: f64, target: SelectionTarget) -> Self {
        let (xmin, xmax) = if a <= b { (a, b) } else { (b, a) };
        Self { xmin, xmax, target }
    }
}

/// The experimental half of a pending assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingExperiment {
    /// A raw experimental line (stick mode).
    Stick {
        index: usize,
        point: SpectralPoint,
        cells: Vec<String>,
    },
    /// A fitted line profile (high-res mode).
    Profile(FitResult),
}

impl PendingExperiment {
    /// Fields persisted for this half of the assignment.
    pub fn fields(&self) -> Vec<String> {
        match self {
            PendingExperiment::Stick { cells, .. } => cells.clone(),
            PendingExperiment::Profile(fit) => fit.params.to_vec().iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn position(&self) -> f64 {
        match self {
            PendingExperiment::Stick { point, .. } => point.position,
            PendingExperiment::Profile(fit) => fit.params.center,
        }
    }
}

/// A committed assignment as persisted: experimental fields, then the
/// theoretical record's cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub experimental: Vec<String>,
    pub theoretical: Vec<String>,
}

/// Resolved run configuration (CLI flags and/or `config.txt`).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub experimental_path: PathBuf,
    pub experimental_kind: SpectrumKind,
    pub theoretical_path: PathBuf,
    pub theoretical_kind: SpectrumKind,
    /// Separate line list, required when the theoretical file is a broadened
    /// (`high`) spectrum.
    pub line_list_path: Option<PathBuf>,
    pub assignments_path: PathBuf,
    pub delimiter: Delimiter,
    pub separator: String,
}

impl SessionConfig {
    pub fn experimental_mode(&self) -> ExperimentalMode {
        self.experimental_kind.into()
    }
}
