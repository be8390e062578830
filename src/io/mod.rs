//! Input/output helpers.
//!
//! - spectrum + line-list ingest and the spectrum store (`ingest`)
//! - the append-only assignment log (`assignments`)
//! - `config.txt` parsing (`config`)
//! - fit JSON read/write (`fit_json`)

pub mod assignments;
pub mod config;
pub mod fit_json;
pub mod ingest;

pub use assignments::*;
pub use config::*;
pub use fit_json::*;
pub use ingest::*;
