//! CLI module
//!
//! Command-line interface for running exports.
//!
//! # Commands
//!
//! - `run` - Export every configured table to object storage
//! - `check` - Test the database connection
//! - `validate` - Validate the export definition
//! - `tables` - List configured table mappings

mod commands;
mod runner;

pub use commands::{Cli, Commands};
pub use runner::Runner;
