//! Output module
//!
//! Handles CSV artifact writing and publishing to object storage.
//!
//! # Overview
//!
//! This module provides utilities for:
//! - Writing a header plus formatted rows as a CSV artifact
//! - Deriving remote object keys from a prefix and table name
//! - Uploading artifacts to cloud storage (S3, R2, GCS, Azure) or a local directory

mod cloud;
mod writer;

pub use cloud::{ObjectPublisher, Publisher, RemoteKey};
pub use writer::{write_csv, CsvWriter, CsvWriterConfig};
