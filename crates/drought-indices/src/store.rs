//! Key-addressed artifact store.
//!
//! All reuse between invocations goes through this store: an artifact key is
//! derived from (product, region, date-range) and computation happens at
//! most once per key for the lifetime of the output directory.

use std::path::PathBuf;

use tracing::debug;

use drought_common::{DroughtError, DroughtResult};

/// Persistent store for output artifacts, addressed by deterministic key.
pub trait ArtifactStore {
    /// Whether an artifact already exists under this key.
    fn exists(&self, key: &str) -> bool;

    /// Persist an artifact; returns its final path.
    fn write(&self, key: &str, bytes: &[u8]) -> DroughtResult<PathBuf>;

    /// Read an artifact back.
    fn read(&self, key: &str) -> DroughtResult<Vec<u8>>;

    /// The path an artifact with this key resolves to.
    fn path(&self, key: &str) -> PathBuf;
}

/// Filesystem-backed artifact store rooted at the output directory.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ArtifactStore for FsArtifactStore {
    fn exists(&self, key: &str) -> bool {
        self.path(key).is_file()
    }

    fn write(&self, key: &str, bytes: &[u8]) -> DroughtResult<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let final_path = self.path(key);
        // write whole-file via a temp sibling so readers never see a torn artifact
        let temp_path = self.root.join(format!("{}.partial", key));
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &final_path)?;
        debug!(path = %final_path.display(), bytes = bytes.len(), "wrote artifact");
        Ok(final_path)
    }

    fn read(&self, key: &str) -> DroughtResult<Vec<u8>> {
        let path = self.path(key);
        std::fs::read(&path).map_err(|e| {
            DroughtError::artifact(format!("failed to read {}: {}", path.display(), e))
        })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}
