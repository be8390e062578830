//! `config.txt` parsing.
//!
//! The file is a list of whitespace-separated `key value` lines:
//!
//! ```text
//! exp-datafile   spectrum.csv
//! exp-type       high
//! calc-datafile  model.csv
//! calc-type      stick
//! Line-List      lines.csv
//! ```
//!
//! Blank lines and lines starting with `#` are skipped, unknown keys are
//! ignored and the first occurrence of a key wins.

use std::path::{Path, PathBuf};

use crate::domain::SpectrumKind;
use crate::error::AppError;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "config.txt";

/// Raw values read from `config.txt`. Every key is optional here; the CLI
/// layer decides what is required after merging in command-line values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub exp_datafile: Option<PathBuf>,
    pub exp_type: Option<SpectrumKind>,
    pub calc_datafile: Option<PathBuf>,
    pub calc_type: Option<SpectrumKind>,
    pub line_list: Option<PathBuf>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, AppError> {
        let mut cfg = ConfigFile::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };

            match key {
                "exp-datafile" => set_once(&mut cfg.exp_datafile, PathBuf::from(value)),
                "calc-datafile" => set_once(&mut cfg.calc_datafile, PathBuf::from(value)),
                "Line-List" => set_once(&mut cfg.line_list, PathBuf::from(value)),
                "exp-type" | "calc-type" => {
                    let kind = SpectrumKind::parse(value).ok_or_else(|| {
                        AppError::new(
                            2,
                            format!(
                                "{CONFIG_FILE} line {}: '{value}' is not a spectrum type (use 'stick' or 'high')",
                                idx + 1
                            ),
                        )
                    })?;
                    let slot = if key == "exp-type" { &mut cfg.exp_type } else { &mut cfg.calc_type };
                    set_once(slot, kind);
                }
                _ => {}
            }
        }

        Ok(cfg)
    }

    /// Read `path`. A missing file yields `Ok(None)`.
    pub fn read(path: &Path) -> Result<Option<Self>, AppError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::new(
                2,
                format!("Failed to read config '{}': {e}", path.display()),
            )),
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) {
    if slot.is_none() {
        *slot = Some(value);
    }
}
