//! Line-shape models.
//!
//! Models are implemented as small, pure functions so the optimizer code can
//! stay generic over the parameter vector.

pub mod voigt;

pub use voigt::*;
