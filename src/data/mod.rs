//! Data sources.
//!
//! - seeded synthetic spectra and line lists (`synth`)

pub mod synth;

pub use synth::*;
