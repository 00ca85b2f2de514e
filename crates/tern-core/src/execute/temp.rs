//! Scoped temporary artifacts.

use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::Result;

/// A temporary artifact file, removed when dropped.
///
/// Dropping happens on every exit path of the scope that owns it, so
/// repeated runs and test packages never leave files behind.
#[derive(Debug)]
pub struct TempArtifact {
    file: NamedTempFile,
}

impl TempArtifact {
    /// Create an empty file in the system temp directory named `<prefix>XXXXXX`.
    pub fn new(prefix: &str) -> Result<Self> {
        let file = tempfile::Builder::new().prefix(prefix).tempfile()?;
        tracing::debug!("temporary artifact {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
