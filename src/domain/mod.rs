//! Domain types used throughout the workflow.
//!
//! This module defines:
//!
//! - spectra and the theoretical line table (`SpectralSeries`, `LineTable`)
//! - selection and fit values (`SelectionWindow`, `FitResult`)
//! - the assignment record and run configuration

pub mod types;

pub use types::*;
