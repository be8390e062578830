//! Line-profile fitting.
//!
//! Responsibilities:
//!
//! - initial guess from the windowed samples (`guess`)
//! - bounded Levenberg–Marquardt (`lm`)
//! - the Voigt + baseline fit and its residuals (`profile`)

pub mod guess;
pub mod lm;
pub mod profile;

pub use guess::*;
pub use lm::*;
pub use profile::*;
