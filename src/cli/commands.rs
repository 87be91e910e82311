//! CLI commands and argument parsing

use crate::profiles::DEFAULT_PROFILE;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Snapshot export CLI
#[derive(Parser, Debug)]
#[command(name = "snapshot-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Built-in profile name or export definition file (YAML)
    #[arg(short, long, global = true, default_value = DEFAULT_PROFILE)]
    pub config: String,

    /// Dotenv file loaded before templates are rendered (skipped if absent)
    #[arg(long, global = true, default_value = ".env")]
    pub env_file: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export every configured table to object storage
    Run {
        /// Tables to export (comma-separated, empty = all)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,

        /// Attempt every table even after one fails
        #[arg(long)]
        keep_going: bool,

        /// Override the destination URL
        /// Supports: /path, file:///path, s3://bucket, r2://bucket, gs://bucket, az://container
        #[arg(short, long)]
        destination: Option<String>,
    },

    /// Validate the definition and test the database connection
    Check,

    /// Validate the export definition
    Validate,

    /// List configured table mappings
    Tables,
}
