// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Snapshot Export
//!
//! Periodic full-snapshot export of relational tables to object storage.
//!
//! ## Features
//!
//! - **Full Snapshots**: Every configured table is read in full on each run
//! - **Column Relabeling**: Source columns are written under destination labels
//! - **Timestamp Normalization**: Timestamps rendered as `YYYY-MM-DD HH:MM:SS`
//! - **Object Storage**: S3, R2, GCS, Azure or a local directory
//! - **Fail-Fast Runs**: The first failing table ends the run with an error
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use snapshot_export::{load_config, ObjectPublisher, Pipeline, TemplateContext, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = load_config("gestion")?;
//!     let publisher = ObjectPublisher::parse(&config.destination.url)?;
//!
//!     let report = Pipeline::new(config)
//!         .execute(&publisher, &TemplateContext::from_env())
//!         .await?;
//!     println!("{} rows exported", report.total_rows());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           Pipeline                             │
//! │  open connection → for each table: TableExporter → close       │
//! └────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌────────────┬─────────────┬───┴─────────┬────────────┬──────────┐
//! │  Extract   │   Format    │    Write    │  Publish   │ Cleanup  │
//! ├────────────┼─────────────┼─────────────┼────────────┼──────────┤
//! │ RowSource  │ Timestamps  │ CSV header  │ Publisher  │ Artifact │
//! │ DuckDB     │ Passthrough │ + rows      │ ObjectStore│ release  │
//! └────────────┴─────────────┴─────────────┴────────────┴──────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Value rendering and timestamp normalization
pub mod format;

/// CSV writing and object publishing
pub mod output;

/// Table export cycle and run orchestration
pub mod engine;

/// YAML loader for export definitions
pub mod loader;

/// Template interpolation
pub mod template;

/// Command-line interface
pub mod cli;

/// Built-in export profiles
pub mod profiles;

/// Database access via DuckDB
pub mod database;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use database::{DatabaseEngine, RowSource};
pub use engine::{ExportState, Pipeline, TableExporter};
pub use loader::{load_config, load_config_from_str, ExportConfig, FailurePolicy, TableSpec};
pub use output::{ObjectPublisher, Publisher, RemoteKey};
pub use template::TemplateContext;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
