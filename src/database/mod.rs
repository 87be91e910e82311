//! Database access via DuckDB
//!
//! This module provides database connectivity using DuckDB as the query engine.
//! DuckDB can read from PostgreSQL, MySQL, SQLite, and DuckDB files.

mod engine;
mod source;

pub use engine::DatabaseEngine;
pub use source::RowSource;
