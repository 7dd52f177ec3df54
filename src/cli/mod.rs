//! Command-line interface
//!
//! Script-style commands operating on the data directory as the operator.

pub mod commands;

pub use commands::*;
