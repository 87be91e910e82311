//! Transient local artifacts
//!
//! An [`Artifact`] is the staging file for one table export. It is deleted
//! when released, and on drop if it was never released, so it cannot outlive
//! the export cycle that created it on any exit path.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Scoped staging file for one table export
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    guard: Option<TempPath>,
}

impl Artifact {
    /// Allocate a fresh, uniquely named artifact in `dir`
    pub fn create(dir: &Path, table: &str) -> Result<Self> {
        let stem: String = table
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
            .collect();

        let file = tempfile::Builder::new()
            .prefix(&format!("{stem}-"))
            .suffix(".csv")
            .tempfile_in(dir)
            .map_err(|e| {
                Error::write(
                    dir.display().to_string(),
                    format!("Failed to allocate artifact: {e}"),
                )
            })?;

        let guard = file.into_temp_path();
        Ok(Self {
            path: guard.to_path_buf(),
            guard: Some(guard),
        })
    }

    /// Local path of the artifact
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the artifact now, reporting failure
    ///
    /// An artifact that is already gone counts as released.
    pub fn release(mut self) -> Result<()> {
        let Some(guard) = self.guard.take() else {
            return Ok(());
        };

        match guard.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::cleanup(self.path.display().to_string(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_release() {
        let dir = tempdir().unwrap();
        let artifact = Artifact::create(dir.path(), "producto").unwrap();
        let path = artifact.path().to_path_buf();

        assert!(path.exists());
        assert!(path.starts_with(dir.path()));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("producto-"));
        assert!(name.ends_with(".csv"));

        artifact.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_deletes() {
        let dir = tempdir().unwrap();
        let path = {
            let artifact = Artifact::create(dir.path(), "categoria").unwrap();
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_release_after_external_delete() {
        let dir = tempdir().unwrap();
        let artifact = Artifact::create(dir.path(), "t").unwrap();
        std::fs::remove_file(artifact.path()).unwrap();
        artifact.release().unwrap();
    }

    #[test]
    fn test_fresh_path_per_artifact() {
        let dir = tempdir().unwrap();
        let a = Artifact::create(dir.path(), "t").unwrap();
        let b = Artifact::create(dir.path(), "t").unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_table_name_is_sanitized() {
        let dir = tempdir().unwrap();
        let artifact = Artifact::create(dir.path(), "ventas.pedido").unwrap();
        let name = artifact.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("ventas_pedido-"));
    }

    #[test]
    fn test_missing_staging_dir_is_write_error() {
        let dir = tempdir().unwrap();
        let err = Artifact::create(&dir.path().join("nope"), "t").unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }
}
