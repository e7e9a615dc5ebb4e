use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::install::remove_dir_forced;

/// Scratch directory owned by one sync run.
///
/// Holds downloaded archives and extraction output. Dropping it removes
/// everything; [`Workspace::close`] does the same but falls back to the
/// permission-normalizing removal used by the installer.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> Result<Self, SyncError> {
        let dir = tempfile::Builder::new()
            .prefix("reposnap-")
            .tempdir()
            .map_err(SyncError::Workspace)?;
        debug!("Workspace created at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the archive for `name` is downloaded to
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{}.zip", name))
    }

    /// Per-repository directory for extraction or cloning
    pub fn scratch_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join(format!("{}-tree", name))
    }

    pub fn close(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            debug!("Plain workspace removal failed ({}), forcing", e);
            if let Err(e) = remove_dir_forced(&path) {
                warn!("Failed to remove workspace {}: {}", path.display(), e);
            }
        }
    }
}
