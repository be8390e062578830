//! Reporting utilities: formatted terminal output for fits, line lookups and
//! session status.

pub mod format;

pub use format::*;
