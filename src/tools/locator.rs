use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{FetchError, Result};
use crate::utils::constants::TOOL_SUBDIRS;

/// Finds an external executable by priority: explicit path, environment
/// override, well-known subdirectories of the tools dir, then `PATH`.
#[derive(Debug, Clone)]
pub struct ToolLocator {
    name: String,
    env_var: String,
    explicit: Option<PathBuf>,
    tools_dir: PathBuf,
}

impl ToolLocator {
    pub fn new(name: &str, env_var: &str, tools_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            env_var: env_var.to_string(),
            explicit: None,
            tools_dir: tools_dir.to_path_buf(),
        }
    }

    pub fn with_explicit_path(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn locate(&self) -> Result<PathBuf> {
        self.locate_with(env::var_os(&self.env_var), env::var_os("PATH"))
    }

    /// Same as [`locate`](Self::locate) with the environment supplied by the caller.
    pub fn locate_with(
        &self,
        env_override: Option<OsString>,
        search_path: Option<OsString>,
    ) -> Result<PathBuf> {
        let binary = executable_name(&self.name);
        let mut candidates: Vec<PathBuf> = Vec::new();

        if let Some(path) = &self.explicit {
            candidates.push(path.clone());
        }

        if let Some(path) = env_override.filter(|p| !p.is_empty()) {
            candidates.push(PathBuf::from(path));
        }

        for subdir in TOOL_SUBDIRS {
            candidates.push(self.tools_dir.join(subdir).join(&binary));
        }

        let local_candidates = candidates.len();
        if let Some(paths) = search_path {
            candidates.extend(env::split_paths(&paths).map(|dir| dir.join(&binary)));
        }

        for candidate in &candidates {
            if candidate.is_file() && ensure_executable(candidate) {
                debug!(tool = %self.name, path = %candidate.display(), "located external tool");
                return Ok(candidate.clone());
            }
        }

        Err(FetchError::ToolMissing {
            tool: self.name.clone(),
            searched: candidates
                .iter()
                .take(local_candidates)
                .map(|p| p.display().to_string())
                .chain(std::iter::once("$PATH".to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// OS-specific executable file name.
pub fn executable_name(name: &str) -> String {
    if cfg!(windows) && !name.to_ascii_lowercase().ends_with(".exe") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

/// Make sure the candidate can be executed, fixing the mode bits on Unix
/// when a bundled binary lost them.
#[cfg(unix)]
fn ensure_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if metadata.permissions().mode() & 0o111 != 0 {
        return true;
    }

    let mut permissions = metadata.permissions();
    permissions.set_mode(0o755);
    match std::fs::set_permissions(path, permissions) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot mark tool executable");
            false
        }
    }
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> bool {
    true
}
