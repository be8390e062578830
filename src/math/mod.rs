//! Mathematical utilities: range lookups, the Faddeeva function and
//! least-squares step solving.

pub mod faddeeva;
pub mod ols;
pub mod range;

pub use faddeeva::*;
pub use ols::*;
pub use range::*;
