//! YAML Loader module
//!
//! Parse export definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `ExportConfig` - Declarative export specification
//! - `TableSpec` - One table's column mapping
//! - YAML parsing with validation

mod parser;
mod types;

pub use parser::{load_config, load_config_from_str, select_tables, validate_config};
pub use types::{
    CsvFormatDef, DatabaseConnectionDef, DatabaseEngine, DestinationDef, ExportConfig,
    FailurePolicy, LineTerminator, PortDef, TableSpec,
};
