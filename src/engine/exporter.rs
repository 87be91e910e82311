//! Single-table export cycle
//!
//! Extract → format → write → publish → cleanup for one [`TableSpec`].

use super::artifact::Artifact;
use super::types::ExportState;
use crate::database::RowSource;
use crate::error::Result;
use crate::format::format_rows;
use crate::loader::TableSpec;
use crate::output::{write_csv, CsvWriterConfig, Publisher, RemoteKey};
use crate::types::{FormattedRow, TableReport};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Runs the export cycle for one table at a time
pub struct TableExporter<'a, S: RowSource + ?Sized, P: Publisher + ?Sized> {
    source: &'a S,
    publisher: &'a P,
    prefix: String,
    staging_dir: PathBuf,
    writer_config: CsvWriterConfig,
    state: ExportState,
}

impl<'a, S: RowSource + ?Sized, P: Publisher + ?Sized> TableExporter<'a, S, P> {
    /// Create an exporter publishing under `prefix`, staging in `staging_dir`
    pub fn new(
        source: &'a S,
        publisher: &'a P,
        prefix: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            publisher,
            prefix: prefix.into(),
            staging_dir: staging_dir.into(),
            writer_config: CsvWriterConfig::default(),
            state: ExportState::Idle,
        }
    }

    /// Set the CSV writer configuration
    #[must_use]
    pub fn with_writer_config(mut self, config: CsvWriterConfig) -> Self {
        self.writer_config = config;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> ExportState {
        self.state
    }

    fn transition(&mut self, table: &str, next: ExportState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        tracing::debug!("{}: {} -> {}", table, self.state, next);
        self.state = next;
    }

    /// Export one table, ending in `Done` or `Failed`
    ///
    /// The transient artifact, once created, is removed before this returns
    /// whatever the outcome.
    pub async fn export(&mut self, table: &TableSpec) -> Result<TableReport> {
        if self.state.is_terminal() {
            self.transition(&table.name, ExportState::Idle);
        }

        let start = Instant::now();
        let result = self.run_cycle(table).await;

        match result {
            Ok((rows, key, location)) => {
                self.transition(&table.name, ExportState::Done);
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::info!(
                    "Table {} exported: {} rows to {} in {}ms",
                    table.name,
                    rows,
                    location,
                    elapsed_ms
                );
                Ok(TableReport {
                    table: table.name.clone(),
                    rows,
                    key: key.to_string(),
                    location,
                    elapsed_ms,
                })
            }
            Err(e) => {
                tracing::error!("Export of table {} failed: {}", table.name, e);
                self.transition(&table.name, ExportState::Failed);
                Err(e)
            }
        }
    }

    async fn run_cycle(&mut self, table: &TableSpec) -> Result<(usize, RemoteKey, String)> {
        self.transition(&table.name, ExportState::Extracting);
        let rows = self.source.extract(table)?;

        self.transition(&table.name, ExportState::Formatting);
        let rows = format_rows(rows);

        self.transition(&table.name, ExportState::Writing);
        let artifact = Artifact::create(&self.staging_dir, &table.name)?;

        let outcome = self.write_and_publish(table, &rows, artifact.path()).await;

        self.transition(&table.name, ExportState::CleaningUp);
        if let Err(e) = artifact.release() {
            tracing::warn!("{}", e);
        }

        outcome
    }

    async fn write_and_publish(
        &mut self,
        table: &TableSpec,
        rows: &[FormattedRow],
        artifact: &Path,
    ) -> Result<(usize, RemoteKey, String)> {
        let written = write_csv(artifact, table.labels(), rows, &self.writer_config)?;
        tracing::debug!("Wrote {} rows to {}", written, artifact.display());

        self.transition(&table.name, ExportState::Publishing);
        let key = RemoteKey::new(&self.prefix, &table.name);
        let location = self.publisher.publish(artifact, &key).await?;

        Ok((written, key, location))
    }
}
