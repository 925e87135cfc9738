use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::strategy_for;
use crate::error::{FetchError, Result};
use crate::models::RinexVersion;
use crate::tools::ExternalTool;

/// Turns a compact (Hatanaka) file into a RINEX observation file.
#[derive(Debug, Clone)]
pub struct FormatConverter {
    tool: Arc<dyn ExternalTool>,
}

impl FormatConverter {
    pub fn new(tool: Arc<dyn ExternalTool>) -> Self {
        Self { tool }
    }

    /// Path the converter is expected to produce for `compact`.
    pub fn expected_output(compact: &Path, version: RinexVersion) -> Result<PathBuf> {
        let name = compact
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                FetchError::InvalidFormat(format!("No file name in {}", compact.display()))
            })?;
        let converted = strategy_for(version).converted_name(name)?;
        Ok(compact.with_file_name(converted))
    }

    /// Run the converter from the fragment's own directory; it writes its
    /// output relative to the working directory. Success needs exit code 0
    /// and the derived output on disk.
    pub fn convert(&self, compact: &Path, version: RinexVersion) -> Result<PathBuf> {
        let output = Self::expected_output(compact, version)?;
        if output.exists() {
            fs::remove_file(&output)?;
        }

        let working_dir = compact.parent().filter(|p| !p.as_os_str().is_empty());
        let args: Vec<OsString> = vec!["-f".into(), compact.as_os_str().to_owned()];
        let result = self.tool.run(&args, working_dir)?;

        if !result.success() {
            warn!(
                file = %compact.display(),
                detail = %result.diagnostic(),
                "{} failed",
                self.tool.name()
            );
            return Err(FetchError::InvalidFormat(format!(
                "{} failed on {}: {}",
                self.tool.name(),
                display_name(compact),
                result.diagnostic()
            )));
        }

        if !output.exists() {
            return Err(FetchError::InvalidFormat(format!(
                "{} reported success but {} was not written",
                self.tool.name(),
                display_name(&output)
            )));
        }

        debug!(output = %output.display(), "converted");
        Ok(output)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolOutput;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes the expected RINEX file unless told to misbehave.
    #[derive(Debug, Default)]
    struct FakeConverter {
        exit_code: i32,
        write_output: bool,
        calls: Mutex<Vec<(Vec<OsString>, Option<PathBuf>)>>,
    }

    impl ExternalTool for FakeConverter {
        fn name(&self) -> &str {
            "CRX2RNX"
        }

        fn run(&self, args: &[OsString], working_dir: Option<&Path>) -> Result<ToolOutput> {
            self.calls
                .lock()
                .unwrap()
                .push((args.to_vec(), working_dir.map(Path::to_path_buf)));

            if self.write_output {
                let input = PathBuf::from(&args[1]);
                let name = input.file_name().unwrap().to_str().unwrap().to_string();
                let out = if let Some(stem) = name.strip_suffix(".crx") {
                    format!("{}.rnx", stem)
                } else {
                    let (stem, ext) = name.rsplit_once('.').unwrap();
                    format!("{}.{}o", stem, &ext[..2])
                };
                fs::write(input.with_file_name(out), b"RINEX").unwrap();
            }

            Ok(ToolOutput {
                exit_code: Some(self.exit_code),
                stdout: String::new(),
                stderr: if self.exit_code == 0 {
                    String::new()
                } else {
                    "CRX2RNX: invalid header".to_string()
                },
            })
        }
    }

    #[test]
    fn test_expected_output_names() {
        assert_eq!(
            FormatConverter::expected_output(
                Path::new("/w/ABMF00GLP_R_20251000715_15M_01S_MO.crx"),
                RinexVersion::V3
            )
            .unwrap(),
            PathBuf::from("/w/ABMF00GLP_R_20251000715_15M_01S_MO.rnx")
        );
        assert_eq!(
            FormatConverter::expected_output(Path::new("/w/mad2156a30.25d"), RinexVersion::V2)
                .unwrap(),
            PathBuf::from("/w/mad2156a30.25o")
        );
    }

    #[test]
    fn test_convert_runs_in_fragment_directory() -> Result<()> {
        let dir = TempDir::new()?;
        let compact = dir.path().join("mad2156a30.25d");
        fs::write(&compact, b"compact")?;

        let tool = Arc::new(FakeConverter {
            write_output: true,
            ..FakeConverter::default()
        });
        let converter = FormatConverter::new(tool.clone());
        let output = converter.convert(&compact, RinexVersion::V2)?;

        assert_eq!(output, dir.path().join("mad2156a30.25o"));
        let calls = tool.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0[0], OsString::from("-f"));
        assert_eq!(calls[0].1.as_deref(), Some(dir.path()));
        Ok(())
    }

    #[test]
    fn test_nonzero_exit_is_failure() -> Result<()> {
        let dir = TempDir::new()?;
        let compact = dir.path().join("ABMF00GLP_R_20251000715_15M_01S_MO.crx");
        fs::write(&compact, b"compact")?;

        let converter = FormatConverter::new(Arc::new(FakeConverter {
            exit_code: 1,
            write_output: true,
            ..FakeConverter::default()
        }));
        let err = converter.convert(&compact, RinexVersion::V3).unwrap_err();
        assert!(err.to_string().contains("invalid header"));
        Ok(())
    }

    #[test]
    fn test_missing_output_is_failure() -> Result<()> {
        let dir = TempDir::new()?;
        let compact = dir.path().join("ABMF00GLP_R_20251000715_15M_01S_MO.crx");
        fs::write(&compact, b"compact")?;

        let converter = FormatConverter::new(Arc::new(FakeConverter::default()));
        let err = converter.convert(&compact, RinexVersion::V3).unwrap_err();
        assert!(err.to_string().contains("was not written"));
        Ok(())
    }
}
