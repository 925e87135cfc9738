use chrono::{Datelike, NaiveDate};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::archive::Workspace;
use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::processors::decompress;
use crate::utils::constants::CORS_RINEX_PATH;

/// Daily file flavour on the NOAA CORS bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorsFileType {
    /// Plain observation file, `.{yy}o.gz`.
    Obs,
    /// Compact (Hatanaka) observation file, `.{yy}d.gz`.
    Crx,
}

impl CorsFileType {
    pub fn code(&self) -> &'static str {
        match self {
            CorsFileType::Obs => "obs",
            CorsFileType::Crx => "crx",
        }
    }

    fn extension_letter(&self) -> char {
        match self {
            CorsFileType::Obs => 'o',
            CorsFileType::Crx => 'd',
        }
    }
}

impl FromStr for CorsFileType {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "obs" => Ok(CorsFileType::Obs),
            "crx" => Ok(CorsFileType::Crx),
            other => Err(FetchError::FatalInput(format!(
                "Unknown CORS file type '{}'. Expected obs or crx",
                other
            ))),
        }
    }
}

impl fmt::Display for CorsFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// `{site}{doy}0.{yy}{o|d}.gz`, site lower-cased.
///
/// ```
/// use highrate_fetch::products::{cors_file_name, CorsFileType};
///
/// assert_eq!(cors_file_name("NEBP", 2025, 100, CorsFileType::Obs), "nebp1000.25o.gz");
/// assert_eq!(cors_file_name("nebp", 2005, 7, CorsFileType::Crx), "nebp0070.05d.gz");
/// ```
pub fn cors_file_name(site: &str, year: i32, doy: u32, file_type: CorsFileType) -> String {
    format!(
        "{}{:03}0.{:02}{}.gz",
        site.trim().to_lowercase(),
        doy,
        year.rem_euclid(100),
        file_type.extension_letter()
    )
}

/// `{base}/rinex/{year}/{doy}/{year}.{doy}.files.list`
pub fn cors_listing_url(base: &str, year: i32, doy: u32) -> String {
    format!(
        "{}/{}/{}/{:03}/{}.{:03}.files.list",
        base.trim_end_matches('/'),
        CORS_RINEX_PATH,
        year,
        doy,
        year,
        doy
    )
}

/// `{base}/rinex/{year}/{doy}/{site}/{file}`
pub fn cors_file_url(base: &str, year: i32, doy: u32, site: &str, file_name: &str) -> String {
    format!(
        "{}/{}/{}/{:03}/{}/{}",
        base.trim_end_matches('/'),
        CORS_RINEX_PATH,
        year,
        doy,
        site.trim().to_lowercase(),
        file_name
    )
}

/// One site-day on the NOAA CORS bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorsRequest {
    pub site: String,
    pub date: NaiveDate,
    pub file_type: CorsFileType,
}

impl CorsRequest {
    /// CORS site identifiers are four alphanumeric characters.
    pub fn new(site: &str, date: NaiveDate, file_type: CorsFileType) -> Result<Self> {
        let site = site.trim().to_lowercase();
        if site.len() != 4 || !site.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(FetchError::FatalInput(format!(
                "Invalid CORS site id '{}': expected four letters or digits",
                site
            )));
        }
        Ok(Self {
            site,
            date,
            file_type,
        })
    }

    pub fn file_name(&self) -> String {
        cors_file_name(&self.site, self.date.year(), self.date.ordinal(), self.file_type)
    }

    pub fn url(&self, base: &str) -> String {
        cors_file_url(
            base,
            self.date.year(),
            self.date.ordinal(),
            &self.site,
            &self.file_name(),
        )
    }
}

/// Availability of one site-day, with its download URL when listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorsAvailability {
    pub site: String,
    pub file_name: String,
    pub available: bool,
    pub url: Option<String>,
}

/// Reads daily listings and downloads files from the public NOAA CORS
/// bucket. No credentials are sent. Listings are cached per day.
pub struct CorsFetcher {
    client: Client,
    base_url: String,
    listings: Mutex<HashMap<(i32, u32), String>>,
}

impl CorsFetcher {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(settings.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.cors_base().to_string(),
            listings: Mutex::new(HashMap::new()),
        })
    }

    /// The day's `files.list` text.
    pub async fn listing(&self, date: NaiveDate) -> Result<String> {
        let key = (date.year(), date.ordinal());
        if let Some(cached) = self.cached(key) {
            return Ok(cached);
        }

        let url = cors_listing_url(&self.base_url, key.0, key.1);
        debug!(url = %url, "fetching CORS listing");
        let response = self.client.get(&url).send().await?;
        if is_missing(response.status()) {
            return Err(FetchError::EmptyResult(format!(
                "No CORS listing for {} (day {:03})",
                date, key.1
            )));
        }
        let text = response.error_for_status()?.text().await?;

        if let Ok(mut listings) = self.listings.lock() {
            listings.insert(key, text.clone());
        }
        Ok(text)
    }

    pub async fn is_available(&self, request: &CorsRequest) -> Result<bool> {
        Ok(self.listing(request.date).await?.contains(&request.file_name()))
    }

    pub async fn availability(&self, request: &CorsRequest) -> Result<CorsAvailability> {
        let available = self.is_available(request).await?;
        Ok(CorsAvailability {
            site: request.site.clone(),
            file_name: request.file_name(),
            available,
            url: available.then(|| request.url(&self.base_url)),
        })
    }

    /// Download `request` and leave the decompressed file in `dest_dir`.
    pub async fn download(&self, request: &CorsRequest, dest_dir: &Path) -> Result<PathBuf> {
        let url = request.url(&self.base_url);
        let file_name = request.file_name();
        info!(url = %url, "downloading CORS file");

        let response = self.client.get(&url).send().await?;
        if is_missing(response.status()) {
            return Err(FetchError::EmptyResult(format!(
                "{} is not on the CORS bucket",
                file_name
            )));
        }
        let mut response = response.error_for_status()?;

        let workspace = Workspace::new(&format!("cors_{}", request.site))?;
        let gz_path = workspace.work_dir().join(&file_name);
        let mut file = tokio::fs::File::create(&gz_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let dest_dir = dest_dir.to_path_buf();
        let target = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let rinex = decompress(&gz_path)?;
            fs::create_dir_all(&dest_dir)?;
            let target = dest_dir.join(rinex.file_name().unwrap_or_default());
            fs::copy(&rinex, &target)?;
            workspace.close()?;
            Ok(target)
        })
        .await??;

        info!(path = %target.display(), "CORS file saved");
        Ok(target)
    }

    fn cached(&self, key: (i32, u32)) -> Option<String> {
        self.listings.lock().ok()?.get(&key).cloned()
    }
}

/// S3 answers 403 rather than 404 for keys that do not exist.
fn is_missing(status: StatusCode) -> bool {
    matches!(status, StatusCode::NOT_FOUND | StatusCode::FORBIDDEN)
}
