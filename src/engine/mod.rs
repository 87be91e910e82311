//! Execution engine module
//!
//! Table export cycle and run orchestration.
//!
//! # Overview
//!
//! The engine module provides:
//! - `TableExporter` - Runs extract → format → write → publish → cleanup for one table
//! - `Pipeline` - Owns the export config and drives every table in order
//! - `Artifact` - Scoped staging file, always removed at the end of a cycle

mod artifact;
mod exporter;
mod types;

pub use artifact::Artifact;
pub use exporter::TableExporter;
pub use types::ExportState;

use crate::database::{DatabaseEngine, RowSource};
use crate::error::{Error, Result};
use crate::loader::{ExportConfig, FailurePolicy};
use crate::output::{CsvWriterConfig, Publisher};
use crate::template::TemplateContext;
use crate::types::{RunReport, TableFailure};
use std::path::PathBuf;
use std::time::Instant;

/// Drives a full export run over every configured table
pub struct Pipeline {
    /// Immutable export definition
    config: ExportConfig,
}

impl Pipeline {
    /// Create a pipeline for an export definition
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    /// Get the export definition
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Directory for transient artifacts
    pub fn staging_dir(&self) -> PathBuf {
        self.config
            .staging_dir
            .as_ref()
            .map_or_else(std::env::temp_dir, PathBuf::from)
    }

    /// Open the database, export every table, then close the database
    ///
    /// A connection failure aborts before any table is processed. The
    /// connection is closed whatever the outcome of the tables.
    pub async fn execute<P: Publisher + ?Sized>(
        &self,
        publisher: &P,
        context: &TemplateContext,
    ) -> Result<RunReport> {
        let engine = DatabaseEngine::open(&self.config.database, context)?;

        let result = self.run(&engine, publisher).await;

        if let Err(e) = engine.close() {
            tracing::warn!("{}", e);
        }
        result
    }

    /// Export every table in configuration order over an open source
    ///
    /// Under [`FailurePolicy::FailFast`] the first failing table ends the run
    /// and later tables are never attempted. Under [`FailurePolicy::Continue`]
    /// every table is attempted and the run fails afterwards if any did.
    pub async fn run<S: RowSource + ?Sized, P: Publisher + ?Sized>(
        &self,
        source: &S,
        publisher: &P,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let total = self.config.tables.len();
        let mut exporter = TableExporter::new(
            source,
            publisher,
            self.config.destination.prefix.as_str(),
            self.staging_dir(),
        )
        .with_writer_config(CsvWriterConfig::from(&self.config.csv));
        let mut report = RunReport::default();

        tracing::info!("Starting export '{}' ({} tables)", self.config.name, total);

        for (i, table) in self.config.tables.iter().enumerate() {
            tracing::info!("[{}/{}] Exporting table {}", i + 1, total, table.name);

            match exporter.export(table).await {
                Ok(table_report) => report.tables.push(table_report),
                Err(e) => match self.config.on_table_error {
                    FailurePolicy::FailFast => {
                        let skipped = total - i - 1;
                        if skipped > 0 {
                            tracing::error!(
                                "Aborting export '{}'; {} remaining table(s) not attempted",
                                self.config.name,
                                skipped
                            );
                        }
                        return Err(e);
                    }
                    FailurePolicy::Continue => report.failed.push(TableFailure {
                        table: table.name.clone(),
                        kind: e.kind(),
                        message: e.to_string(),
                    }),
                },
            }
        }

        if !report.failed.is_empty() {
            for failure in &report.failed {
                tracing::error!(
                    "Table {} failed ({:?}): {}",
                    failure.table,
                    failure.kind,
                    failure.message
                );
            }
            tracing::error!(
                "Export '{}' finished with {} failed table(s)",
                self.config.name,
                report.failed.len()
            );
            return Err(Error::TablesFailed {
                failed: report.failed.len(),
                total,
            });
        }

        tracing::info!(
            "Export '{}' completed: {} tables, {} rows in {}ms",
            self.config.name,
            report.tables.len(),
            report.total_rows(),
            start.elapsed().as_millis()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests;
