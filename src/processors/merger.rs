use regex::Regex;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::config::Settings;
use crate::models::{ConvertedFragment, RinexVersion};
use crate::tools::{ExternalTool, ProcessTool, ToolLocator};
use crate::utils::constants::{MERGER_ENV, MERGER_TOOL};

/// A single observation file spanning the whole requested window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub path: PathBuf,
    pub hours: u32,
}

/// Merging never fails the request; a failure means fragments ship instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(MergeResult),
    Failed(String),
}

/// `{STATION}_{T}_{YYYYDOYHHMM}_{15M}_{01S}_{MO}.{ext}`
fn fragment_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<head>[A-Za-z0-9]{4,9}_[A-Z]_\d{7}_?\d{4})_(?P<period>\d{2}[MHDU])_(?P<tail>\d{2}[SMHDZ]_[A-Z]{2}(?:\..+)?)$",
        )
        .unwrap_or_else(|e| panic!("invalid fragment name pattern: {}", e))
    })
}

/// Name of the merged file, derived from the first fragment: the period
/// token is replaced with the total duration, everything else is kept.
/// Names that do not follow the current convention get a `_MERGED_` suffix.
pub fn merged_file_name(first_fragment: &str, total_hours: u32) -> String {
    if let Some(caps) = fragment_name_pattern().captures(first_fragment) {
        return format!("{}_{:02}H_{}", &caps["head"], total_hours, &caps["tail"]);
    }

    let path = Path::new(first_fragment);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| first_fragment.to_string());
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{}_MERGED_{}H{}", stem, total_hours, ext)
}

/// Output-format flag value passed to the merge tool.
pub fn version_flag(version: RinexVersion) -> &'static str {
    match version {
        RinexVersion::V2 => "2",
        RinexVersion::V3 => "3",
    }
}

/// Splices ordered fragments with an external merge tool.
#[derive(Debug, Clone, Default)]
pub struct Merger {
    tool: Option<Arc<dyn ExternalTool>>,
}

impl Merger {
    pub fn new(tool: Option<Arc<dyn ExternalTool>>) -> Self {
        Self { tool }
    }

    /// Locate the merge tool from settings and environment. Absence is not
    /// an error: the merger is simply unavailable.
    pub fn from_settings(settings: &Settings) -> Self {
        let locator = ToolLocator::new(MERGER_TOOL, MERGER_ENV, &settings.tools_dir)
            .with_explicit_path(settings.merger_path.clone());

        match locator.locate() {
            Ok(path) => Self::new(Some(Arc::new(ProcessTool::new(MERGER_TOOL, path)))),
            Err(e) => {
                warn!("{}; fragments will be shipped unmerged", e);
                Self::new(None)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.tool.is_some()
    }

    pub fn merge(
        &self,
        fragments: &[ConvertedFragment],
        version: RinexVersion,
        total_hours: u32,
    ) -> MergeOutcome {
        let Some(tool) = &self.tool else {
            return MergeOutcome::Failed(format!("{} not available", MERGER_TOOL));
        };

        if total_hours == 0 {
            return MergeOutcome::Failed("requested duration is zero hours".to_string());
        }

        let mut paths: Vec<&Path> = fragments.iter().map(|f| f.path.as_path()).collect();
        paths.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));

        let Some(first) = paths.first() else {
            return MergeOutcome::Failed("no fragments to merge".to_string());
        };
        let first_name = first
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let work_dir = first.parent().map(Path::to_path_buf).unwrap_or_default();
        let output = work_dir.join(merged_file_name(&first_name, total_hours));

        if output.exists() {
            if let Err(e) = fs::remove_file(&output) {
                return MergeOutcome::Failed(format!("cannot replace {}: {}", output.display(), e));
            }
        }

        let mut args: Vec<OsString> = vec!["-finp".into()];
        args.extend(paths.iter().map(|p| p.as_os_str().to_owned()));
        args.push("-fout".into());
        args.push(output.as_os_str().to_owned());
        args.push("-vo".into());
        args.push(version_flag(version).into());
        args.push("-f".into());

        info!(
            fragments = paths.len(),
            output = %output.display(),
            "merging fragments"
        );

        let dir = (!work_dir.as_os_str().is_empty()).then_some(work_dir.as_path());
        let result = match tool.run(&args, dir) {
            Ok(result) => result,
            Err(e) => return MergeOutcome::Failed(format!("{} could not run: {}", tool.name(), e)),
        };

        if !result.success() {
            return MergeOutcome::Failed(format!("{} {}", tool.name(), result.diagnostic()));
        }

        if !output.exists() {
            return MergeOutcome::Failed(format!(
                "{} exited cleanly but produced no {}",
                tool.name(),
                output.display()
            ));
        }

        MergeOutcome::Merged(MergeResult {
            path: output,
            hours: total_hours,
        })
    }
}
