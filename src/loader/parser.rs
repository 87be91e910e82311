//! YAML parser for export definitions
//!
//! Parses and validates export YAML files.
//! Supports both built-in profiles (by name) and custom YAML files (by path).

use crate::error::{Error, Result};
use crate::loader::types::ExportConfig;
use crate::profiles;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Load an export definition from a profile name or file path
///
/// # Examples
///
/// ```ignore
/// // Load built-in profile by name
/// let config = load_config("gestion")?;
///
/// // Load custom definition from file
/// let config = load_config("./nightly.yaml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ExportConfig> {
    let path = path.as_ref();
    let path_str = path.to_string_lossy();

    // A bare name without separators or extension may be a built-in profile
    if !path_str.contains('/')
        && !path_str.contains('\\')
        && !path_str.ends_with(".yaml")
        && !path_str.ends_with(".yml")
    {
        if let Some(yaml) = profiles::get_builtin(&path_str) {
            return load_config_from_str(yaml);
        }
    }

    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config(format!(
                "Export definition '{}' not found. Built-in profiles: {}. Or provide a path to a YAML file.",
                path.display(),
                profiles::list_builtin().join(", ")
            ))
        } else {
            Error::config(format!(
                "Failed to read export definition '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_config_from_str(&content)
}

/// Load an export definition from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<ExportConfig> {
    let config: ExportConfig = serde_yaml::from_str(yaml)?;

    validate_config(&config)?;
    Ok(config)
}

/// Validate an export definition
pub fn validate_config(config: &ExportConfig) -> Result<()> {
    if config.name.is_empty() {
        return Err(Error::config("Export name cannot be empty"));
    }

    if config.destination.url.trim().is_empty() {
        return Err(Error::config("Destination url cannot be empty"));
    }

    let prefix = config.destination.prefix.trim_matches('/');
    if !prefix.is_empty() && prefix.split('/').any(str::is_empty) {
        return Err(Error::config(format!(
            "Destination prefix '{}' contains an empty path segment",
            config.destination.prefix
        )));
    }

    let delimiter = config.csv.delimiter;
    if !delimiter.is_ascii() || matches!(delimiter, '"' | '\r' | '\n') {
        return Err(Error::config(format!(
            "CSV delimiter {delimiter:?} must be a single ASCII character other than a quote or line break"
        )));
    }

    if config.tables.is_empty() {
        return Err(Error::config("Export must have at least one table"));
    }

    // Two tables with one name would overwrite the same object
    let names: HashSet<_> = config.tables.iter().map(|t| &t.name).collect();
    if names.len() != config.tables.len() {
        return Err(Error::config("Duplicate table names found"));
    }

    for table in &config.tables {
        validate_table(table)?;
    }

    Ok(())
}

/// Validate a table mapping
fn validate_table(table: &crate::loader::types::TableSpec) -> Result<()> {
    if table.name.trim().is_empty() {
        return Err(Error::config("Table name cannot be empty"));
    }

    if table.name.split('.').any(|part| part.trim().is_empty()) {
        return Err(Error::invalid_table(
            &table.name,
            "table name has an empty schema or table part",
        ));
    }

    if table.source_columns.is_empty() {
        return Err(Error::invalid_table(
            &table.name,
            "at least one source column is required",
        ));
    }

    if table.source_columns.iter().any(|c| c.trim().is_empty()) {
        return Err(Error::invalid_table(&table.name, "empty source column name"));
    }

    let labels = table.labels();
    if labels.len() != table.source_columns.len() {
        return Err(Error::invalid_table(
            &table.name,
            format!(
                "{} source columns but {} destination columns",
                table.source_columns.len(),
                labels.len()
            ),
        ));
    }

    Ok(())
}

/// Restrict a config to a subset of tables, keeping declaration order
///
/// An empty `names` selects every table.
pub fn select_tables(config: &ExportConfig, names: &[String]) -> Result<ExportConfig> {
    if names.is_empty() {
        return Ok(config.clone());
    }

    let unknown: Vec<&str> = names
        .iter()
        .filter(|n| config.table(n).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(Error::config(format!(
            "Unknown table(s): {}. Configured: {}",
            unknown.join(", "),
            config.table_names().join(", ")
        )));
    }

    let mut selected = config.clone();
    selected.tables.retain(|t| names.contains(&t.name));
    Ok(selected)
}
