//! Scoped run workspace
//!
//! Each run gets its own directory under the workspace base. The directory
//! is removed exactly once: by an explicit `cleanup()` or, failing that, on drop.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Working directory owned by one pipeline run
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    removed: bool,
}

impl Workspace {
    /// Creates `<base>/<service>-<run_id>`
    pub fn create(base: &Path, service: &str, run_id: Uuid) -> io::Result<Self> {
        let path = base.join(format!("{}-{}", service, run_id));
        std::fs::create_dir_all(&path)?;
        debug!("Created workspace {}", path.display());

        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the workspace directory
    ///
    /// Returns `true` if this call removed it, `false` if it was already gone.
    pub fn cleanup(&mut self) -> io::Result<bool> {
        if self.removed {
            return Ok(false);
        }
        self.removed = true;

        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                info!("Removed workspace {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            warn!("Failed to remove workspace {} on drop: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_runs_once() {
        let base = tempfile::tempdir().unwrap();
        let mut workspace = Workspace::create(base.path(), "backend", Uuid::new_v4()).unwrap();
        std::fs::write(workspace.path().join("scratch.txt"), "data").unwrap();

        assert!(workspace.path().is_dir());
        assert!(workspace.cleanup().unwrap());
        assert!(!workspace.path().exists());
        assert!(!workspace.cleanup().unwrap());
    }

    #[test]
    fn test_drop_removes_directory() {
        let base = tempfile::tempdir().unwrap();
        let path = {
            let workspace = Workspace::create(base.path(), "backend", Uuid::new_v4()).unwrap();
            workspace.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_concurrent_runs_get_isolated_directories() {
        let base = tempfile::tempdir().unwrap();
        let first = Workspace::create(base.path(), "backend", Uuid::new_v4()).unwrap();
        let second = Workspace::create(base.path(), "backend", Uuid::new_v4()).unwrap();

        assert_ne!(first.path(), second.path());
    }
}
