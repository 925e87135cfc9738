use chrono::{Datelike, NaiveDate};
use reqwest::StatusCode;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::archive::Workspace;
use crate::codec::{gps_week, md5sums_url, product_url};
use crate::error::{FetchError, Result};
use crate::processors::decompress;
use crate::products::{find_center, Campaign, Solution};
use crate::transport::{is_html, AuthSession};

const DURATION: &str = "01D";

/// One daily precise-orbit product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRequest {
    pub center: String,
    pub campaign: Campaign,
    pub solution: Solution,
    pub sampling: String,
    pub date: NaiveDate,
}

impl ProductRequest {
    pub fn new(
        center: &str,
        campaign: Campaign,
        solution: Solution,
        sampling: &str,
        date: NaiveDate,
    ) -> Self {
        Self {
            center: center.trim().to_uppercase(),
            campaign,
            solution,
            sampling: sampling.trim().to_uppercase(),
            date,
        }
    }

    /// Request using the centre's catalogued sampling interval.
    pub fn from_catalogue(
        center: &str,
        campaign: Campaign,
        solution: Solution,
        date: NaiveDate,
    ) -> Result<Self> {
        let entry = find_center(center)
            .ok_or_else(|| FetchError::FatalInput(format!("Unknown analysis centre '{}'", center)))?;
        let spec = entry.offers(campaign, solution).ok_or_else(|| {
            FetchError::FatalInput(format!(
                "{} publishes no {} {} orbits",
                entry.code, campaign, solution
            ))
        })?;
        Ok(Self::new(entry.code, campaign, solution, spec.sampling, date))
    }

    pub fn gps_week(&self) -> i64 {
        gps_week(self.date)
    }

    /// `{CTR}0{CMP}{SOL}_{YYYYDDD}0000_01D_{SMP}_ORB.SP3.gz`
    pub fn file_name(&self) -> String {
        format!(
            "{}0{}{}_{}{:03}0000_{}_{}_ORB.SP3.gz",
            self.center,
            self.campaign,
            self.solution,
            self.date.year(),
            self.date.ordinal(),
            DURATION,
            self.sampling
        )
    }

    pub fn url(&self, archive_base: &str) -> String {
        product_url(archive_base, self.gps_week(), &self.file_name())
    }
}

/// File names listed in a week's `MD5SUMS`: the last token of each line.
pub fn parse_md5sums(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

/// Checks availability against the weekly checksum listing and downloads
/// orbit products. Listings are cached per GPS week.
pub struct ProductFetcher {
    session: AuthSession,
    archive_base: String,
    listings: Mutex<HashMap<i64, Vec<String>>>,
}

impl ProductFetcher {
    pub fn new(session: AuthSession, archive_base: &str) -> Self {
        Self {
            session,
            archive_base: archive_base.trim_end_matches('/').to_string(),
            listings: Mutex::new(HashMap::new()),
        }
    }

    pub async fn listing(&self, week: i64) -> Result<Vec<String>> {
        if let Some(cached) = self.cached(week) {
            return Ok(cached);
        }

        let url = md5sums_url(&self.archive_base, week);
        debug!(url = %url, "fetching checksum listing");
        let files = parse_md5sums(&self.session.get_text(&url).await?);

        if let Ok(mut listings) = self.listings.lock() {
            listings.insert(week, files.clone());
        }
        Ok(files)
    }

    pub async fn is_available(&self, request: &ProductRequest) -> Result<bool> {
        let name = request.file_name();
        Ok(self
            .listing(request.gps_week())
            .await?
            .iter()
            .any(|f| f == &name))
    }

    /// Download `request` and leave the decompressed SP3 file in `dest_dir`.
    pub async fn download(&self, request: &ProductRequest, dest_dir: &Path) -> Result<PathBuf> {
        let url = request.url(&self.archive_base);
        let file_name = request.file_name();
        info!(url = %url, "downloading orbit product");

        let mut response = self.session.get(&url).await?;
        if response.status() == StatusCode::UNAUTHORIZED || is_html(&response) {
            return Err(FetchError::Auth(format!(
                "Not authorised to download {}; check the Earthdata credentials",
                file_name
            )));
        }
        if response.status() == StatusCode::NOT_FOUND {
            return Err(FetchError::EmptyResult(format!("{} is not on the archive", file_name)));
        }
        response = response.error_for_status()?;

        let workspace = Workspace::new(&format!("orbits_{}", request.center))?;
        let gz_path = workspace.work_dir().join(&file_name);
        let mut file = tokio::fs::File::create(&gz_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let dest_dir = dest_dir.to_path_buf();
        let target = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let sp3 = decompress(&gz_path)?;
            fs::create_dir_all(&dest_dir)?;
            let target = dest_dir.join(sp3.file_name().unwrap_or_default());
            fs::copy(&sp3, &target)?;
            workspace.close()?;
            Ok(target)
        })
        .await??;

        info!(path = %target.display(), "orbit product saved");
        Ok(target)
    }

    fn cached(&self, week: i64) -> Option<Vec<String>> {
        self.listings.lock().ok()?.get(&week).cloned()
    }
}
