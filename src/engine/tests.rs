//! Tests for engine module

use super::*;
use crate::loader::{load_config_from_str, CsvFormatDef, LineTerminator, TableSpec};
use crate::output::RemoteKey;
use crate::types::{Row, Value};
use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tempfile::{tempdir, TempDir};

// ============================================================================
// Test Doubles
// ============================================================================

/// Row source serving canned rows per table, or failing for listed tables
#[derive(Default)]
struct MockSource {
    tables: HashMap<String, Vec<Row>>,
    failing: Vec<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSource {
    fn with_table(mut self, name: &str, rows: Vec<Row>) -> Self {
        self.tables.insert(name.to_string(), rows);
        self
    }

    fn failing(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RowSource for MockSource {
    fn extract(&self, table: &TableSpec) -> crate::Result<Vec<Row>> {
        self.calls.lock().unwrap().push(table.name.clone());
        if self.failing.contains(&table.name) {
            return Err(Error::extraction(&table.name, "connection reset"));
        }
        Ok(self.tables.get(&table.name).cloned().unwrap_or_default())
    }
}

/// One observed publish call
#[derive(Debug, Clone)]
struct Published {
    key: String,
    artifact: std::path::PathBuf,
    content: String,
}

/// Publisher that captures artifacts, optionally failing for one key
#[derive(Default)]
struct MockPublisher {
    fail_key: Option<String>,
    published: Mutex<Vec<Published>>,
}

impl MockPublisher {
    fn failing_on(key: &str) -> Self {
        Self {
            fail_key: Some(key.to_string()),
            ..Default::default()
        }
    }

    fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    fn keys(&self) -> Vec<String> {
        self.published().into_iter().map(|p| p.key).collect()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    async fn publish(&self, artifact: &Path, key: &RemoteKey) -> crate::Result<String> {
        let content = std::fs::read_to_string(artifact)?;
        self.published.lock().unwrap().push(Published {
            key: key.to_string(),
            artifact: artifact.to_path_buf(),
            content,
        });

        if self.fail_key.as_deref() == Some(key.as_str()) {
            return Err(Error::publish(key.as_str(), "bucket does not exist"));
        }
        Ok(format!("mock://bucket/{key}"))
    }
}

fn ts(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> Value {
    Value::Timestamp(
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap(),
    )
}

fn categoria() -> TableSpec {
    TableSpec::new(
        "categoria",
        ["id", "name", "created_at"],
        ["id", "nombre", "fecha_creacion"],
    )
}

fn staging_is_empty(dir: &TempDir) -> bool {
    std::fs::read_dir(dir.path()).unwrap().next().is_none()
}

fn three_table_config(staging: &Path, policy: &str) -> ExportConfig {
    let yaml = format!(
        r#"
name: test
database:
  engine: duckdb
destination:
  url: mock://bucket
  prefix: Gestion
staging_dir: "{}"
on_table_error: {policy}
tables:
  - name: categoria
    source_columns: [id]
  - name: producto
    source_columns: [id]
  - name: movimiento_inventario
    source_columns: [id]
"#,
        staging.display()
    );
    load_config_from_str(&yaml).unwrap()
}

// ============================================================================
// ExportState Tests
// ============================================================================

#[test]
fn test_state_happy_path_transitions() {
    use ExportState::*;
    let path = [Idle, Extracting, Formatting, Writing, Publishing, CleaningUp, Done];
    for pair in path.windows(2) {
        assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
    }
}

#[test]
fn test_state_failed_reachable_from_non_terminal_only() {
    use ExportState::*;
    for state in [Idle, Extracting, Formatting, Writing, Publishing, CleaningUp] {
        assert!(state.can_advance_to(Failed));
        assert!(!state.is_terminal());
    }
    assert!(!Done.can_advance_to(Failed));
    assert!(!Failed.can_advance_to(Done));
    assert!(Done.is_terminal());
    assert!(Failed.is_terminal());
}

#[test]
fn test_state_no_skipping() {
    use ExportState::*;
    assert!(!Idle.can_advance_to(Writing));
    assert!(!Extracting.can_advance_to(Publishing));
    assert!(!Publishing.can_advance_to(Done));
}

#[test]
fn test_state_display() {
    assert_eq!(ExportState::CleaningUp.to_string(), "cleaning_up");
    assert_eq!(ExportState::default(), ExportState::Idle);
}

// ============================================================================
// TableExporter Tests
// ============================================================================

#[tokio::test]
async fn test_export_success() {
    let staging = tempdir().unwrap();
    let source = MockSource::default().with_table(
        "categoria",
        vec![
            vec![Value::Int(1), Value::from("Bebidas"), ts(2024, 1, 15, 10, 30, 0)],
            vec![Value::Int(2), Value::from("Lácteos, frescos"), Value::Null],
        ],
    );
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", staging.path());

    let report = exporter.export(&categoria()).await.unwrap();

    assert_eq!(exporter.state(), ExportState::Done);
    assert_eq!(report.table, "categoria");
    assert_eq!(report.rows, 2);
    assert_eq!(report.key, "Gestion/categoria.csv");
    assert_eq!(report.location, "mock://bucket/Gestion/categoria.csv");

    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].content,
        "id,nombre,fecha_creacion\r\n1,Bebidas,2024-01-15 10:30:00\r\n2,\"Lácteos, frescos\",\r\n"
    );
    assert!(!published[0].artifact.exists());
    assert!(staging_is_empty(&staging));
}

#[tokio::test]
async fn test_export_empty_table_publishes_header() {
    let staging = tempdir().unwrap();
    let source = MockSource::default().with_table("categoria", vec![]);
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", staging.path());

    let report = exporter.export(&categoria()).await.unwrap();

    assert_eq!(report.rows, 0);
    assert_eq!(publisher.published()[0].content, "id,nombre,fecha_creacion\r\n");
}

#[tokio::test]
async fn test_export_header_uses_labels_not_source_columns() {
    let staging = tempdir().unwrap();
    let source = MockSource::default();
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", staging.path());

    exporter.export(&categoria()).await.unwrap();

    let content = &publisher.published()[0].content;
    assert_eq!(content.lines().next().unwrap(), "id,nombre,fecha_creacion");
}

#[tokio::test]
async fn test_export_extraction_failure() {
    let staging = tempdir().unwrap();
    let source = MockSource::default().failing("categoria");
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", staging.path());

    let err = exporter.export(&categoria()).await.unwrap_err();

    assert!(matches!(err, Error::Extraction { .. }));
    assert_eq!(exporter.state(), ExportState::Failed);
    assert!(publisher.published().is_empty());
    assert!(staging_is_empty(&staging));
}

#[tokio::test]
async fn test_export_publish_failure_still_removes_artifact() {
    let staging = tempdir().unwrap();
    let source = MockSource::default().with_table("categoria", vec![vec![
        Value::Int(1),
        Value::from("x"),
        Value::Null,
    ]]);
    let publisher = MockPublisher::failing_on("Gestion/categoria.csv");
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", staging.path());

    let err = exporter.export(&categoria()).await.unwrap_err();

    assert!(matches!(err, Error::Publish { .. }));
    assert_eq!(exporter.state(), ExportState::Failed);
    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert!(!published[0].artifact.exists());
    assert!(staging_is_empty(&staging));
}

#[tokio::test]
async fn test_export_write_failure() {
    let staging = tempdir().unwrap();
    let missing = staging.path().join("does-not-exist");
    let source = MockSource::default().with_table("categoria", vec![]);
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", &missing);

    let err = exporter.export(&categoria()).await.unwrap_err();

    assert!(matches!(err, Error::Write { .. }));
    assert!(publisher.published().is_empty());
}

#[tokio::test]
async fn test_exporter_is_reusable_across_tables() {
    let staging = tempdir().unwrap();
    let source = MockSource::default().failing("malo");
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "Gestion", staging.path());

    let malo = TableSpec::new("malo", ["id"], ["id"]);
    assert!(exporter.export(&malo).await.is_err());
    assert_eq!(exporter.state(), ExportState::Failed);

    exporter.export(&categoria()).await.unwrap();
    assert_eq!(exporter.state(), ExportState::Done);
}

#[tokio::test]
async fn test_export_lf_writer_config() {
    let staging = tempdir().unwrap();
    let source = MockSource::default();
    let publisher = MockPublisher::default();
    let mut exporter = TableExporter::new(&source, &publisher, "p", staging.path())
        .with_writer_config(CsvWriterConfig::new().with_terminator(LineTerminator::Lf));

    exporter.export(&categoria()).await.unwrap();
    assert_eq!(
        publisher.published()[0].content,
        "id,nombre,fecha_creacion\n"
    );
}

// ============================================================================
// Pipeline Tests
// ============================================================================

#[tokio::test]
async fn test_pipeline_exports_all_tables_in_order() {
    let staging = tempdir().unwrap();
    let pipeline = Pipeline::new(three_table_config(staging.path(), "fail_fast"));
    let source = MockSource::default()
        .with_table("categoria", vec![vec![Value::Int(1)]])
        .with_table("producto", vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
    let publisher = MockPublisher::default();

    let report = pipeline.run(&source, &publisher).await.unwrap();

    assert_eq!(
        source.calls(),
        vec!["categoria", "producto", "movimiento_inventario"]
    );
    assert_eq!(
        publisher.keys(),
        vec![
            "Gestion/categoria.csv",
            "Gestion/producto.csv",
            "Gestion/movimiento_inventario.csv"
        ]
    );
    assert_eq!(report.tables.len(), 3);
    assert_eq!(report.total_rows(), 3);
    assert!(report.failed.is_empty());
    assert!(staging_is_empty(&staging));
}

#[tokio::test]
async fn test_pipeline_fail_fast_stops_at_first_failure() {
    let staging = tempdir().unwrap();
    let pipeline = Pipeline::new(three_table_config(staging.path(), "fail_fast"));
    let source = MockSource::default()
        .with_table("categoria", vec![vec![Value::Int(1)]])
        .failing("producto");
    let publisher = MockPublisher::default();

    let err = pipeline.run(&source, &publisher).await.unwrap_err();

    assert!(matches!(err, Error::Extraction { ref table, .. } if table == "producto"));
    // Table 1 fully processed, table 3 never extracted
    assert_eq!(source.calls(), vec!["categoria", "producto"]);
    assert_eq!(publisher.keys(), vec!["Gestion/categoria.csv"]);
    assert!(staging_is_empty(&staging));
}

#[tokio::test]
async fn test_pipeline_fail_fast_on_publish_error() {
    let staging = tempdir().unwrap();
    let pipeline = Pipeline::new(three_table_config(staging.path(), "fail_fast"));
    let source = MockSource::default();
    let publisher = MockPublisher::failing_on("Gestion/categoria.csv");

    let err = pipeline.run(&source, &publisher).await.unwrap_err();

    assert!(matches!(err, Error::Publish { .. }));
    assert_eq!(source.calls(), vec!["categoria"]);
}

#[tokio::test]
async fn test_pipeline_continue_attempts_every_table() {
    let staging = tempdir().unwrap();
    let pipeline = Pipeline::new(three_table_config(staging.path(), "continue"));
    let source = MockSource::default().failing("producto");
    let publisher = MockPublisher::default();

    let err = pipeline.run(&source, &publisher).await.unwrap_err();

    assert!(matches!(err, Error::TablesFailed { failed: 1, total: 3 }));
    assert_eq!(
        source.calls(),
        vec!["categoria", "producto", "movimiento_inventario"]
    );
    assert_eq!(
        publisher.keys(),
        vec!["Gestion/categoria.csv", "Gestion/movimiento_inventario.csv"]
    );
}

#[tokio::test]
async fn test_pipeline_continue_after_publish_failure() {
    let staging = tempdir().unwrap();
    let pipeline = Pipeline::new(three_table_config(staging.path(), "continue"));
    let source = MockSource::default();
    let publisher = MockPublisher::failing_on("Gestion/producto.csv");

    let err = pipeline.run(&source, &publisher).await.unwrap_err();

    assert!(matches!(err, Error::TablesFailed { failed: 1, total: 3 }));
    assert_eq!(publisher.keys().len(), 3);
    assert!(staging_is_empty(&staging));
}

#[tokio::test]
async fn test_pipeline_applies_csv_dialect() {
    let staging = tempdir().unwrap();
    let mut config = three_table_config(staging.path(), "fail_fast");
    config.csv = CsvFormatDef {
        delimiter: ';',
        line_terminator: LineTerminator::Lf,
    };
    let pipeline = Pipeline::new(config);
    let source = MockSource::default().with_table(
        "categoria",
        vec![vec![Value::from("Bebidas; frías")]],
    );
    let publisher = MockPublisher::default();

    pipeline.run(&source, &publisher).await.unwrap();

    assert_eq!(
        publisher.published()[0].content,
        "id\n\"Bebidas; frías\"\n"
    );
}

#[tokio::test]
async fn test_pipeline_execute_connection_failure_is_fatal() {
    let staging = tempdir().unwrap();
    let mut config = three_table_config(staging.path(), "fail_fast");
    config.database.database = Some(
        staging
            .path()
            .join("missing.duckdb")
            .display()
            .to_string(),
    );
    let pipeline = Pipeline::new(config);
    let publisher = MockPublisher::default();

    let err = pipeline
        .execute(&publisher, &TemplateContext::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection { .. }));
    assert!(publisher.published().is_empty());
}

#[test]
fn test_staging_dir_defaults_to_temp() {
    let staging = tempdir().unwrap();
    let mut config = three_table_config(staging.path(), "fail_fast");
    assert_eq!(Pipeline::new(config.clone()).staging_dir(), staging.path());

    config.staging_dir = None;
    assert_eq!(Pipeline::new(config).staging_dir(), std::env::temp_dir());
}
