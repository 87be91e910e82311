//! Error types for snapshot-export
//!
//! Every fallible operation in the crate returns `Result<T, Error>`. The
//! variants form a closed taxonomy: connection, extraction, artifact write,
//! publish and cleanup failures, plus configuration problems caught before
//! any table is touched.

use serde::Serialize;
use thiserror::Error;

/// The main error type for snapshot-export
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid table mapping for '{table}': {message}")]
    InvalidTableSpec { table: String, message: String },

    #[error("Undefined variable in template: {variable}")]
    UndefinedVariable { variable: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to serialize JSON: {0}")]
    Json(#[from] serde_json::Error),

    // ============================================================================
    // Pipeline Errors
    // ============================================================================
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Extraction failed for table '{table}': {message}")]
    Extraction { table: String, message: String },

    #[error("Failed to write artifact {path}: {message}")]
    Write { path: String, message: String },

    #[error("Failed to publish {key}: {message}")]
    Publish { key: String, message: String },

    #[error("Failed to remove artifact {path}: {message}")]
    Cleanup { path: String, message: String },

    #[error("{failed} of {total} tables failed to export")]
    TablesFailed { failed: usize, total: usize },

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], as reported per failed table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Connection,
    Extraction,
    Write,
    Publish,
    Cleanup,
    Other,
}

impl Error {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an invalid table mapping error
    pub fn invalid_table(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTableSpec {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an undefined variable error
    pub fn undefined_var(variable: impl Into<String>) -> Self {
        Self::UndefinedVariable {
            variable: variable.into(),
        }
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create an extraction error
    pub fn extraction(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Create an artifact write error
    pub fn write(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a publish error
    pub fn publish(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a cleanup error
    pub fn cleanup(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Cleanup {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config { .. }
            | Error::InvalidTableSpec { .. }
            | Error::UndefinedVariable { .. }
            | Error::YamlParse(_) => ErrorKind::Config,
            Error::Connection { .. } => ErrorKind::Connection,
            Error::Extraction { .. } => ErrorKind::Extraction,
            Error::Write { .. } => ErrorKind::Write,
            Error::Publish { .. } => ErrorKind::Publish,
            Error::Cleanup { .. } => ErrorKind::Cleanup,
            Error::TablesFailed { .. } | Error::Json(_) | Error::Io(_) => ErrorKind::Other,
        }
    }

}

/// Result type alias for snapshot-export
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("test message");
        assert_eq!(err.to_string(), "Configuration error: test message");

        let err = Error::extraction("producto", "relation does not exist");
        assert_eq!(
            err.to_string(),
            "Extraction failed for table 'producto': relation does not exist"
        );

        let err = Error::publish("Gestion/producto.csv", "access denied");
        assert_eq!(
            err.to_string(),
            "Failed to publish Gestion/producto.csv: access denied"
        );

        let err = Error::TablesFailed {
            failed: 1,
            total: 3,
        };
        assert_eq!(err.to_string(), "1 of 3 tables failed to export");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::connection("refused").kind(), ErrorKind::Connection);
        assert_eq!(Error::extraction("t", "x").kind(), ErrorKind::Extraction);
        assert_eq!(Error::write("/tmp/a", "x").kind(), ErrorKind::Write);
        assert_eq!(Error::publish("k", "x").kind(), ErrorKind::Publish);
        assert_eq!(Error::cleanup("/tmp/a", "x").kind(), ErrorKind::Cleanup);
        assert_eq!(Error::invalid_table("t", "x").kind(), ErrorKind::Config);
        assert_eq!(Error::undefined_var("env.X").kind(), ErrorKind::Config);
    }

    #[test]
    fn test_parse_and_serialize_errors_are_classified() {
        let yaml = serde_yaml::from_str::<serde_yaml::Value>("a: [").unwrap_err();
        assert_eq!(Error::from(yaml).kind(), ErrorKind::Config);

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(Error::from(json).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::Extraction).unwrap(),
            "\"extraction\""
        );
        assert_eq!(
            serde_json::to_string(&Error::publish("k", "x").kind()).unwrap(),
            "\"publish\""
        );
    }
}
