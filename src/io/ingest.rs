//! Spectrum ingest and the in-memory spectrum store.
//!
//! This module turns the experimental spectrum, the theoretical spectrum and
//! the theoretical line list into sorted, immutable arrays that the session
//! can query by interval.
//!
//! Design goals:
//! - **Strict numeric columns**: column 1 (position) and column 2 (intensity)
//!   must parse in every row, otherwise the load fails naming the line
//! - **Verbatim cells**: every other cell is kept as read, so persisted
//!   assignments reproduce the input exactly
//! - **Deterministic behavior**: rows are stably sorted by position

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use csv::StringRecord;

use crate::domain::{Delimiter, LineRecord, LineTable, SessionConfig, SpectralSeries, SpectrumKind};
use crate::error::AssignError;
use crate::math::index_range;

/// A parsed data row: position, intensity and every cell as read.
#[derive(Debug, Clone)]
struct Row {
    position: f64,
    intensity: f64,
    cells: Vec<String>,
}

/// Header plus rows of one input file, sorted by position.
#[derive(Debug, Clone)]
struct Table {
    header: Vec<String>,
    rows: Vec<Row>,
}

/// Loaded spectra and line list. Read-only after construction.
#[derive(Debug, Clone)]
pub struct SpectrumStore {
    pub experimental: SpectralSeries,
    pub theoretical: SpectralSeries,
    pub lines: LineTable,
    /// Theory rows dropped because they fell outside the experimental range.
    pub truncated: usize,
}

impl SpectrumStore {
    /// Load every input named by `config`.
    pub fn load(config: &SessionConfig) -> Result<Self, AssignError> {
        let experimental = read_table(&config.experimental_path, config.delimiter)?;
        let theoretical = read_table(&config.theoretical_path, config.delimiter)?;

        let line_list = match config.theoretical_kind {
            SpectrumKind::Stick => None,
            SpectrumKind::High => {
                let path = config.line_list_path.as_deref().ok_or_else(|| {
                    AssignError::data_load(
                        &config.theoretical_path,
                        "a broadened theoretical spectrum needs a separate line list (Line-List)",
                    )
                })?;
                Some(read_table(path, config.delimiter)?)
            }
        };

        let store = Self::from_tables(experimental, theoretical, line_list)
            .map_err(|reason| AssignError::data_load(&config.experimental_path, reason))?;

        log::info!(
            "loaded {} experimental samples, {} theoretical samples, {} lines ({} theory rows outside the experimental range)",
            store.experimental.len(),
            store.theoretical.len(),
            store.lines.len(),
            store.truncated
        );
        Ok(store)
    }

    /// Build a store from in-memory series. The theoretical series and the
    /// line table are truncated to the experimental range.
    pub fn from_parts(experimental: SpectralSeries, theoretical: SpectralSeries, lines: LineTable) -> Self {
        let Some((lo, hi)) = experimental.bounds() else {
            let truncated = theoretical.len() + lines.len();
            return Self {
                experimental,
                theoretical: SpectralSeries::default(),
                lines: LineTable::default(),
                truncated,
            };
        };

        let (theoretical, dropped_series) = truncate_series(theoretical, lo, hi);
        let (lines, dropped_lines) = truncate_lines(lines, lo, hi);
        Self {
            experimental,
            theoretical,
            lines,
            truncated: dropped_series.max(dropped_lines),
        }
    }

    fn from_tables(experimental: Table, theoretical: Table, line_list: Option<Table>) -> Result<Self, String> {
        if experimental.rows.is_empty() {
            return Err("experimental spectrum has no data rows".to_string());
        }
        let lines = match &line_list {
            Some(table) => table_to_lines(table),
            None => table_to_lines(&theoretical),
        };
        Ok(Self::from_parts(
            table_to_series(experimental),
            table_to_series(theoretical),
            lines,
        ))
    }

    /// Experimental samples with `xmin <= x <= xmax`.
    pub fn experimental_window(&self, xmin: f64, xmax: f64) -> Result<(&[f64], &[f64]), AssignError> {
        let range = index_range(&self.experimental.positions, xmin, xmax)?;
        Ok((
            &self.experimental.positions[range.clone()],
            &self.experimental.intensities[range],
        ))
    }

    /// First theoretical line inside `[xmin, xmax]`.
    pub fn line_in(&self, xmin: f64, xmax: f64) -> Result<(usize, &LineRecord), AssignError> {
        let range = index_range(&self.lines.positions, xmin, xmax)?;
        let idx = range.start;
        Ok((idx, &self.lines.records[idx]))
    }
}

/// Read a position/intensity file into a sorted series.
pub fn read_series(path: &Path, delimiter: Delimiter) -> Result<SpectralSeries, AssignError> {
    read_table(path, delimiter).map(table_to_series)
}

/// Read a line list (position, intensity, identifying columns...).
pub fn read_line_table(path: &Path, delimiter: Delimiter) -> Result<LineTable, AssignError> {
    read_table(path, delimiter).map(|t| table_to_lines(&t))
}

fn read_table(path: &Path, delimiter: Delimiter) -> Result<Table, AssignError> {
    let file = File::open(path).map_err(|e| AssignError::data_load(path, format!("cannot open: {e}")))?;

    match delimiter {
        Delimiter::Byte(byte) => parse_table(path, csv_reader(byte, file)),
        Delimiter::Whitespace => {
            let text = io::read_to_string(file).map_err(|e| AssignError::data_load(path, format!("cannot read: {e}")))?;
            let collapsed = collapse_whitespace(&text);
            parse_table(path, csv_reader(b' ', collapsed.as_bytes()))
        }
    }
}

fn csv_reader<R: Read>(delimiter: u8, source: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source)
}

/// Rewrite every run of blanks as one space. Line breaks are kept so
/// reported line numbers still match the file.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        for (i, field) in line.split_whitespace().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(field);
        }
        out.push('\n');
    }
    out
}

fn parse_table<R: Read>(path: &Path, mut reader: csv::Reader<R>) -> Result<Table, AssignError> {
    let header: Vec<String> = reader
        .headers()
        .map_err(|e| AssignError::data_load(path, format!("cannot read header: {e}")))?
        .iter()
        .map(normalize_header_name)
        .collect();
    if header.len() < 2 {
        return Err(AssignError::data_load(
            path,
            "expected at least two columns (position, intensity)",
        ));
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header, lines are 1-based
        let line = idx + 2;
        let record = result.map_err(|e| AssignError::data_load(path, format!("line {line}: {e}")))?;
        // Blank lines are skipped by the reader, so prefer its own count.
        let line = record.position().map_or(line, |p| p.line() as usize);
        if record.iter().all(|c| c.is_empty()) {
            continue;
        }
        let row = parse_row(&record).map_err(|reason| AssignError::data_load(path, format!("line {line}: {reason}")))?;
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(AssignError::data_load(path, "no data rows after the header"));
    }

    // Stable, so equal positions keep file order.
    rows.sort_by(|a, b| a.position.total_cmp(&b.position));

    Ok(Table { header, rows })
}

fn normalize_header_name(name: &str) -> String {
    // Strip a UTF-8 BOM on the first header cell.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn parse_row(record: &StringRecord) -> Result<Row, String> {
    let position = parse_number(record.get(0), "position")?;
    let intensity = parse_number(record.get(1), "intensity")?;
    Ok(Row {
        position,
        intensity,
        cells: record.iter().map(str::to_string).collect(),
    })
}

fn parse_number(cell: Option<&str>, what: &str) -> Result<f64, String> {
    let raw = cell.ok_or_else(|| format!("missing {what} column"))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{what} '{raw}' is not a number"))?;
    if !value.is_finite() {
        return Err(format!("{what} '{raw}' is not finite"));
    }
    Ok(value)
}

fn table_to_series(table: Table) -> SpectralSeries {
    let mut series = SpectralSeries {
        header: table.header,
        ..SpectralSeries::default()
    };
    for row in table.rows {
        series.positions.push(row.position);
        series.intensities.push(row.intensity);
        series.rows.push(row.cells);
    }
    series
}

fn table_to_lines(table: &Table) -> LineTable {
    let records = table
        .rows
        .iter()
        .map(|r| LineRecord {
            position: r.position,
            intensity: r.intensity,
            cells: r.cells.clone(),
        })
        .collect();
    LineTable::from_records(table.header.clone(), records)
}

fn truncate_series(series: SpectralSeries, lo: f64, hi: f64) -> (SpectralSeries, usize) {
    let total = series.len();
    let Ok(range) = index_range(&series.positions, lo, hi) else {
        return (
            SpectralSeries {
                header: series.header,
                ..SpectralSeries::default()
            },
            total,
        );
    };
    let kept = SpectralSeries {
        header: series.header,
        positions: series.positions[range.clone()].to_vec(),
        intensities: series.intensities[range.clone()].to_vec(),
        rows: series.rows[range].to_vec(),
    };
    let dropped = total - kept.len();
    (kept, dropped)
}

fn truncate_lines(lines: LineTable, lo: f64, hi: f64) -> (LineTable, usize) {
    let total = lines.len();
    let LineTable { columns, records, positions } = lines;
    let Ok(range) = index_range(&positions, lo, hi) else {
        return (LineTable::from_records(columns, Vec::new()), total);
    };
    let kept: Vec<LineRecord> = records[range].to_vec();
    let dropped = total - kept.len();
    (LineTable::from_records(columns, kept), dropped)
}
