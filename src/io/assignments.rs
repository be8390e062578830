//! The append-only assignment log.
//!
//! One headerless CSV record per committed assignment:
//!
//! ```text
//! <experimental fields...>,<separator token>,<theoretical fields...>
//! ```
//!
//! Each record is encoded in memory first and appended with a single
//! `write_all`, so a failed write never leaves half a record behind from this
//! process. The file is never rewritten.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::Assignment;
use crate::error::AssignError;

#[derive(Debug, Clone)]
pub struct AssignmentLog {
    path: PathBuf,
    separator: String,
}

impl AssignmentLog {
    pub fn new(path: impl Into<PathBuf>, separator: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            separator: separator.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Append one assignment as a single line.
    pub fn append(&self, assignment: &Assignment) -> Result<(), AssignError> {
        let line = self.encode(assignment)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.write_error(e))?;
        file.write_all(&line).map_err(|e| self.write_error(e))?;
        file.flush().map_err(|e| self.write_error(e))?;
        Ok(())
    }

    /// Encode one record, trailing newline included.
    pub fn encode(&self, assignment: &Assignment) -> Result<Vec<u8>, AssignError> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        let record = assignment
            .experimental
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.separator.as_str()))
            .chain(assignment.theoretical.iter().map(String::as_str));
        writer.write_record(record).map_err(|e| self.write_error(e))?;
        writer.into_inner().map_err(|e| self.write_error(e.error()))
    }

    /// Every assignment in the log, oldest first. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<Assignment>, AssignError> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AssignError::data_load(&self.path, format!("cannot open: {e}"))),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut out = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let line = idx + 1;
            let record = result.map_err(|e| AssignError::data_load(&self.path, format!("line {line}: {e}")))?;
            let fields: Vec<String> = record.iter().map(str::to_string).collect();
            let Some(split) = fields.iter().position(|f| *f == self.separator) else {
                return Err(AssignError::data_load(
                    &self.path,
                    format!("line {line}: separator '{}' not found", self.separator),
                ));
            };
            out.push(Assignment {
                experimental: fields[..split].to_vec(),
                theoretical: fields[split + 1..].to_vec(),
            });
        }
        Ok(out)
    }

    fn write_error(&self, err: impl std::fmt::Display) -> AssignError {
        AssignError::LogWrite {
            path: self.path.clone(),
            reason: err.to_string(),
        }
    }
}
