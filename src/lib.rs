//! `rova` library crate: interactive assignment of experimental spectral lines
//! to theoretical transitions.
//!
//! The binary (`rova`) is a thin wrapper around this library so that:
//!
//! - the assignment workflow is testable without a terminal
//! - the fitting and lookup code is reusable from the one-off commands

pub mod app;
pub mod cli;
pub mod data;
pub mod debug;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
pub mod tui;
