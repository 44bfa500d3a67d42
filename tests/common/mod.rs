//! Common test infrastructure
//!
//! Builds temporary source trees of NDJSON song and log files plus an
//! in-memory warehouse to load them into. Tests should only import from this
//! module.

mod constants;
mod fixtures;

pub use constants::*;
pub use fixtures::*;
