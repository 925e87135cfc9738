use crate::error::{FetchError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

const WORKSPACE_PREFIX: &str = "highrate-";

/// Scoped temporary directory owned by one station run. Every intermediate
/// file lives here; dropping the workspace removes all of them.
#[derive(Debug)]
pub struct Workspace {
    temp_dir: TempDir,
    work_dir: PathBuf,
}

impl Workspace {
    /// Workspace under the system temporary directory.
    pub fn new(label: &str) -> Result<Self> {
        Self::create(Builder::new().prefix(WORKSPACE_PREFIX).tempdir(), label)
    }

    /// Workspace under `parent`, which is created if missing.
    pub fn new_in(parent: &Path, label: &str) -> Result<Self> {
        fs::create_dir_all(parent)?;
        Self::create(
            Builder::new().prefix(WORKSPACE_PREFIX).tempdir_in(parent),
            label,
        )
    }

    fn create(temp_dir: std::io::Result<TempDir>, label: &str) -> Result<Self> {
        let temp_dir = temp_dir.map_err(|e| {
            FetchError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create temporary directory: {}", e),
            ))
        })?;

        let work_dir = temp_dir.path().join(sanitize(label));
        fs::create_dir_all(&work_dir)?;

        Ok(Self { temp_dir, work_dir })
    }

    /// Directory where downloads and conversions happen.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Root of the temporary tree; archives are written here, next to `work_dir`.
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Remove the tree now, reporting failures instead of ignoring them on drop.
    pub fn close(self) -> Result<()> {
        self.temp_dir.close()?;
        Ok(())
    }
}

fn sanitize(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "work".to_string()
    } else {
        cleaned
    }
}
