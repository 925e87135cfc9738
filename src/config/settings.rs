use crate::error::Result;
use crate::utils::constants::{
    DEFAULT_ARCHIVE_BASE_URL, DEFAULT_AUTH_HOST, DEFAULT_CORS_BASE_URL, DEFAULT_RETENTION_DAYS,
    DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, ENV_PREFIX,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use validator::Validate;

/// Process-wide settings. Loaded once at start-up and passed by reference
/// into the pipeline; nothing mutates them afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Settings {
    #[validate(length(min = 1))]
    pub archive_base_url: String,

    #[validate(length(min = 1))]
    pub auth_host: String,

    /// Public NOAA CORS bucket; needs no credentials.
    #[validate(length(min = 1))]
    pub cors_base_url: String,

    pub user_agent: String,

    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,

    #[validate(range(min = 1, max = 256))]
    pub max_workers: usize,

    #[validate(range(min = 0))]
    pub retention_days: i64,

    pub validate_magic: bool,

    pub merge_enabled: bool,

    pub tools_dir: PathBuf,

    #[serde(default)]
    pub converter_path: Option<PathBuf>,

    #[serde(default)]
    pub merger_path: Option<PathBuf>,

    #[serde(default)]
    pub station_table: Option<PathBuf>,

    /// One station per line; these publish type `S` current-era files.
    #[serde(default)]
    pub type_s_list: Option<PathBuf>,

    /// Parent of the per-run workspaces; the system temp dir when unset.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            archive_base_url: DEFAULT_ARCHIVE_BASE_URL.to_string(),
            auth_host: DEFAULT_AUTH_HOST.to_string(),
            cors_base_url: DEFAULT_CORS_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_workers: num_cpus::get().clamp(1, 8),
            retention_days: DEFAULT_RETENTION_DAYS,
            validate_magic: true,
            merge_enabled: true,
            tools_dir: PathBuf::from("."),
            converter_path: None,
            merger_path: None,
            station_table: None,
            type_s_list: None,
            scratch_dir: None,
        }
    }
}

impl Settings {
    /// Layer defaults, an optional TOML/YAML/JSON file and `HRFETCH_*`
    /// environment variables, in that order.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let defaults = Settings::default();

        let mut builder = Config::builder()
            .set_default("archive_base_url", defaults.archive_base_url.as_str())?
            .set_default("auth_host", defaults.auth_host.as_str())?
            .set_default("cors_base_url", defaults.cors_base_url.as_str())?
            .set_default("user_agent", defaults.user_agent.as_str())?
            .set_default("timeout_secs", defaults.timeout_secs as i64)?
            .set_default("max_workers", defaults.max_workers as i64)?
            .set_default("retention_days", defaults.retention_days)?
            .set_default("validate_magic", defaults.validate_magic)?
            .set_default("merge_enabled", defaults.merge_enabled)?
            .set_default("tools_dir", defaults.tools_dir.to_string_lossy().as_ref())?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn archive_base(&self) -> &str {
        self.archive_base_url.trim_end_matches('/')
    }

    pub fn cors_base(&self) -> &str {
        self.cors_base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.auth_host, "urs.earthdata.nasa.gov");
        assert_eq!(settings.retention_days, 182);
        assert_eq!(settings.cors_base(), "https://noaa-cors-pds.s3.amazonaws.com");
        assert!(settings.scratch_dir.is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "max_workers = 3")?;
        writeln!(file, "merge_enabled = false")?;
        writeln!(file, "archive_base_url = \"http://127.0.0.1:8080/\"")?;

        let settings = Settings::load(Some(file.path()))?;
        assert_eq!(settings.max_workers, 3);
        assert!(!settings.merge_enabled);
        assert_eq!(settings.archive_base(), "http://127.0.0.1:8080");
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        Ok(())
    }

    #[test]
    fn test_invalid_worker_count_rejected() {
        let settings = Settings {
            max_workers: 0,
            ..Settings::default()
        };
        assert!(settings.validate().is_err());
    }
}
