//! Error types.
//!
//! Two layers:
//!
//! - [`AssignError`]: the per-interaction error taxonomy of the assignment
//!   workflow. Everything except [`AssignError::DataLoad`] is local to one
//!   selection/fit/commit step and leaves the session in its prior state.
//! - [`AppError`]: what the binary reports at the process boundary
//!   (message + exit code).

use std::path::PathBuf;

/// Errors produced by the assignment workflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AssignError {
    #[error("failed to load '{}': {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    #[error("no data points inside the selection [{xmin}, {xmax}]")]
    EmptySelection { xmin: f64, xmax: f64 },

    #[error("a line-profile fit needs at least {required} points, the selection holds {points}")]
    InsufficientData { points: usize, required: usize },

    #[error("line-profile fit did not converge after {iterations} iterations: {reason}")]
    FitConvergence { iterations: usize, reason: String },

    #[error("cannot commit an assignment: no {missing} selected yet")]
    IncompleteSelection { missing: &'static str },

    #[error("{operation} is not available for a {mode} experimental spectrum")]
    UnsupportedOperation { operation: &'static str, mode: &'static str },

    #[error("failed to append to assignment log '{}': {reason}", path.display())]
    LogWrite { path: PathBuf, reason: String },
}

impl AssignError {
    pub(crate) fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        AssignError::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether the session can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, AssignError::DataLoad { .. })
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<AssignError> for AppError {
    fn from(err: AssignError) -> Self {
        let code = match err {
            AssignError::DataLoad { .. } => 2,
            _ => 3,
        };
        AppError::new(code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
