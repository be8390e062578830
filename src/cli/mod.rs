//! Command-line parsing for the RoVA line-assignment tool.
//!
//! The goal of this module is to keep **argument parsing** and **config
//! resolution** separate from the session and fitting code.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::domain::{Delimiter, SessionConfig, SpectrumKind, DEFAULT_ASSIGNMENTS_FILE, DEFAULT_SEPARATOR};
use crate::error::AppError;
use crate::io::{ConfigFile, CONFIG_FILE};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rova", version, about = "Rovibrational line assignment: fit, match and record spectral lines")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive assignment window.
    ///
    /// Inputs come from the positional arguments or, when those are omitted,
    /// from `config.txt` in the working directory.
    Assign(AssignArgs),
    /// Fit one line profile in an experimental spectrum and print the result.
    Fit(FitArgs),
    /// Print the first theoretical line inside a window.
    Lookup(LookupArgs),
    /// Write a seeded synthetic spectrum and line list.
    Synth(SynthArgs),
}

/// Inputs and output options of an assignment session.
#[derive(Debug, Args, Clone)]
pub struct AssignArgs {
    /// Experimental spectrum (position, intensity, ...).
    pub exp: Option<PathBuf>,

    /// Experimental spectrum type: `stick` or `high`.
    #[arg(value_parser = parse_kind)]
    pub exp_type: Option<SpectrumKind>,

    /// Theoretical spectrum or line list.
    pub calc: Option<PathBuf>,

    /// Theoretical spectrum type: `stick` or `high`.
    #[arg(value_parser = parse_kind)]
    pub calc_type: Option<SpectrumKind>,

    /// Line list, required when the theoretical spectrum is `high`.
    pub line_list: Option<PathBuf>,

    /// Configuration file used when positional inputs are omitted.
    #[arg(long, default_value = CONFIG_FILE)]
    pub config: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Log file (the terminal is taken by the UI).
    #[arg(long, default_value = "rova.log")]
    pub log_file: PathBuf,
}

/// Options shared by every command that reads spectra or writes assignments.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Assignment log to append to.
    #[arg(long, default_value = DEFAULT_ASSIGNMENTS_FILE)]
    pub assignments: PathBuf,

    /// Field delimiter of the input files (a single character, `tab`, or
    /// `whitespace` for column-aligned text).
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: Delimiter,

    /// Token written between the experimental and theoretical fields.
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    pub separator: String,
}

/// Options for a one-off profile fit.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Experimental spectrum.
    #[arg(long, value_name = "FILE")]
    pub exp: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    pub xmin: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub xmax: f64,

    /// Render an ASCII plot of the window and the fitted profile.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the fit (parameters + dense model grid) to JSON.
    #[arg(long = "export-fit", value_name = "JSON")]
    pub export_fit: Option<PathBuf>,

    /// Field delimiter of the input file.
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: Delimiter,
}

/// Options for a line-list lookup.
#[derive(Debug, Args, Clone)]
pub struct LookupArgs {
    /// Theoretical line list.
    #[arg(long, value_name = "FILE")]
    pub calc: PathBuf,

    #[arg(long, allow_negative_numbers = true)]
    pub xmin: f64,

    #[arg(long, allow_negative_numbers = true)]
    pub xmax: f64,

    /// Truncate the list to this experimental spectrum's range first.
    #[arg(long, value_name = "FILE")]
    pub exp: Option<PathBuf>,

    /// Field delimiter of the input files.
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: Delimiter,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Output directory (created if missing).
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of lines.
    #[arg(long, default_value_t = 12)]
    pub lines: usize,

    /// Experimental spectrum type to generate.
    #[arg(long, default_value = "high", value_parser = parse_kind)]
    pub kind: SpectrumKind,
}

fn parse_kind(raw: &str) -> Result<SpectrumKind, String> {
    SpectrumKind::parse(raw).ok_or_else(|| format!("'{raw}' is not a spectrum type (use 'stick' or 'high')"))
}

fn parse_delimiter(raw: &str) -> Result<Delimiter, String> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(Delimiter::Byte(b'\t')),
        // A lone space never matches padded columns.
        "whitespace" | "ws" | " " => Ok(Delimiter::Whitespace),
        _ => match raw.as_bytes() {
            [b] if b.is_ascii() => Ok(Delimiter::Byte(*b)),
            _ => Err(format!(
                "delimiter must be a single ASCII character, `tab` or `whitespace`, got '{raw}'"
            )),
        },
    }
}

impl AssignArgs {
    /// Merge positional inputs with `config.txt`. Positional values win.
    pub fn resolve(&self) -> Result<SessionConfig, AppError> {
        let file = if self.exp.is_some() && self.exp_type.is_some() && self.calc.is_some() && self.calc_type.is_some()
        {
            ConfigFile::default()
        } else {
            ConfigFile::read(&self.config)?.ok_or_else(|| {
                AppError::new(
                    2,
                    format!(
                        "'{}' doesn't exist: provide it in the working directory or pass EXP EXP_TYPE CALC CALC_TYPE [LINE_LIST]",
                        self.config.display()
                    ),
                )
            })?
        };

        let experimental_path = require(self.exp.clone().or(file.exp_datafile), "exp-datafile")?;
        let experimental_kind = require(self.exp_type.or(file.exp_type), "exp-type")?;
        let theoretical_path = require(self.calc.clone().or(file.calc_datafile), "calc-datafile")?;
        let theoretical_kind = require(self.calc_type.or(file.calc_type), "calc-type")?;
        let line_list_path = self.line_list.clone().or(file.line_list);

        ensure_exists(&experimental_path, "experimental data file")?;
        ensure_exists(&theoretical_path, "theoretical data file")?;
        match (&line_list_path, theoretical_kind) {
            (Some(p), _) => ensure_exists(p, "line list")?,
            (None, SpectrumKind::High) => {
                return Err(AppError::new(
                    2,
                    "calc-type 'high' needs a line list (Line-List in config.txt or a fifth argument)",
                ));
            }
            (None, SpectrumKind::Stick) => {}
        }

        Ok(SessionConfig {
            experimental_path,
            experimental_kind,
            theoretical_path,
            theoretical_kind,
            line_list_path,
            assignments_path: self.output.assignments.clone(),
            delimiter: self.output.delimiter,
            separator: self.output.separator.clone(),
        })
    }
}

fn require<T>(value: Option<T>, key: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::new(2, format!("Missing input: `{key}` (argument or {CONFIG_FILE} entry)")))
}

fn ensure_exists(path: &Path, what: &str) -> Result<(), AppError> {
    if path.exists() {
        Ok(())
    } else {
        Err(AppError::new(
            2,
            format!("Your input {what} '{}' can't be found.", path.display()),
        ))
    }
}
