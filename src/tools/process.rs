use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::error::Result;

/// Captured result of one tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty line of stderr, or stdout when stderr is silent.
    pub fn diagnostic(&self) -> String {
        let last_line = |text: &str| {
            text.lines()
                .rev()
                .find(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string())
        };
        let detail = last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or_default();

        match self.exit_code {
            Some(code) => format!("exit code {} {}", code, detail).trim().to_string(),
            None => format!("terminated by signal {}", detail).trim().to_string(),
        }
    }
}

/// One synchronous, retry-free subprocess call. Shared by the converter and
/// the merger so all process-boundary handling lives behind this trait.
pub trait ExternalTool: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn run(&self, args: &[OsString], working_dir: Option<&Path>) -> Result<ToolOutput>;
}

/// An executable on disk.
#[derive(Debug, Clone)]
pub struct ProcessTool {
    name: String,
    path: PathBuf,
}

impl ProcessTool {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExternalTool for ProcessTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, args: &[OsString], working_dir: Option<&Path>) -> Result<ToolOutput> {
        let mut command = Command::new(&self.path);
        command.args(args);
        if let Some(dir) = working_dir {
            command.current_dir(dir);
        }

        debug!(tool = %self.path.display(), ?args, "running external tool");
        let output = command.output()?;

        Ok(ToolOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
