use chrono::{Datelike, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn, Level};

use crate::cli::args::{Cli, Commands, WindowArgs};
use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::models::{DataType, FetchReport, StationRequest, TimeWindow};
use crate::processors::{FetchPlanner, StationPipeline};
use crate::products::{
    CorsAvailability, CorsFetcher, CorsRequest, ProductFetcher, ProductRequest, ANALYSIS_CENTERS,
};
use crate::readers::{check_availability, download_summary, StationReader, StationTable};
use crate::transport::{AuthSession, CredentialProvider, EnvCredentials};
use crate::utils::{
    combined_archive_name, default_cors_dir, default_output_path, default_products_dir,
    station_archive_name, ProgressReporter,
};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let mut settings = Settings::load(cli.config.as_deref())?;
    let json = cli.json;

    match cli.command {
        Commands::Fetch {
            stations,
            window,
            output,
            no_merge,
            max_workers,
            no_progress,
        } => {
            if no_merge {
                settings.merge_enabled = false;
            }
            if let Some(workers) = max_workers {
                settings.max_workers = workers;
            }
            validator::Validate::validate(&settings)?;

            let time_window =
                TimeWindow::for_date(window.date, window.start_hour, window.end_hour)?;
            let table = optional_table(&settings);
            let requests = stations
                .iter()
                .map(|s| build_request(s, &window, table.as_ref()))
                .collect::<Result<Vec<_>>>()?;

            let pipeline = StationPipeline::from_settings(&settings, &EnvCredentials)?
                .with_progress(!no_progress && !json);

            if let [request] = requests.as_slice() {
                let result = pipeline
                    .run_with_cancel(request, &time_window, ctrl_c())
                    .await?;
                let destination = output.unwrap_or_else(|| {
                    default_output_path(&station_archive_name(request, &time_window))
                });
                let written = result.archive.persist(&destination)?;

                emit(json, &FetchSummary::new(&written, vec![result.report]), |s| {
                    s.to_text()
                })?;
            } else {
                let result = tokio::select! {
                    result = pipeline.run_many(&requests, &time_window) => result?,
                    _ = ctrl_c() => return Err(FetchError::Cancelled),
                };
                let destination = output
                    .unwrap_or_else(|| default_output_path(&combined_archive_name(&time_window)));
                let written = result.archive.persist(&destination)?;

                let reports = result.stations.iter().map(|s| s.report.clone()).collect();
                let mut summary = FetchSummary::new(&written, reports);
                summary.failed_stations = result
                    .failed
                    .iter()
                    .map(|f| format!("{}: {}", f.station, f.reason))
                    .collect();
                emit(json, &summary, |s| s.to_text())?;
            }
        }

        Commands::Plan { station, window } => {
            let time_window =
                TimeWindow::for_date(window.date, window.start_hour, window.end_hour)?;
            let table = optional_table(&settings);
            let request = build_request(&station, &window, table.as_ref())?;
            let items = FetchPlanner::new(settings.archive_base()).plan(&request, &time_window);

            emit(json, &items, |items| {
                let mut text = format!(
                    "{} slots for {} on {}\n",
                    items.len(),
                    request.long_code(),
                    time_window
                );
                for item in items {
                    text.push_str(&format!("{}  {}\n", item.slot, item.url));
                }
                text
            })?;
        }

        Commands::Check {
            station,
            date,
            station_table,
        } => {
            let table = load_table(&settings, station_table)?;
            let session = AuthSession::new(EnvCredentials.credentials()?, &settings)?;

            let progress = ProgressReporter::new_spinner("Downloading availability summary...", json);
            let summary = download_summary(
                &session,
                settings.archive_base(),
                date.year(),
                Utc::now().year(),
            )
            .await?;
            progress.finish_with_message(&format!("{} sites in summary", summary.len()));

            let availability = check_availability(&station, date, &summary, &table);
            let version = summary.rinex_version_for(&station);
            let report = AvailabilityReport {
                station: station.to_uppercase(),
                date: date.to_string(),
                available: availability.is_available(),
                detail: availability.to_string(),
                rinex_version: version.map(|v| v.to_string()),
            };

            emit(json, &report, |r| {
                format!(
                    "{} on {}: {}\n",
                    r.station,
                    r.date,
                    if r.available { "available" } else { "not available" }
                ) + &format!("  {}\n", r.detail)
            })?;
        }

        Commands::Orbits {
            date,
            center,
            campaign,
            solution,
            output_dir,
            check_only,
            list_centers,
        } => {
            if list_centers {
                return emit(json, &ANALYSIS_CENTERS, |centers| {
                    let mut text = String::new();
                    for c in centers.iter() {
                        let products: Vec<String> = c
                            .products
                            .iter()
                            .map(|p| format!("{}/{}/{}", p.campaign, p.solution, p.sampling))
                            .collect();
                        text.push_str(&format!("{}  {:<50} {}\n", c.code, c.name, products.join(", ")));
                    }
                    text
                });
            }

            let request = ProductRequest::from_catalogue(&center, campaign, solution, date)?;
            let session = AuthSession::new(EnvCredentials.credentials()?, &settings)?;
            let fetcher = ProductFetcher::new(session, settings.archive_base());

            let available = fetcher.is_available(&request).await?;
            if !available {
                warn!(file = %request.file_name(), week = request.gps_week(), "product not listed");
            }

            let saved = if check_only || !available {
                None
            } else {
                let dir = output_dir.unwrap_or_else(default_products_dir);
                Some(fetcher.download(&request, &dir).await?)
            };

            let report = OrbitReport {
                file_name: request.file_name(),
                gps_week: request.gps_week(),
                available,
                saved_to: saved.map(|p| p.display().to_string()),
            };
            emit(json, &report, |r| {
                let mut text = format!(
                    "{} (GPS week {}): {}\n",
                    r.file_name,
                    r.gps_week,
                    if r.available { "listed" } else { "not listed" }
                );
                if let Some(path) = &r.saved_to {
                    text.push_str(&format!("  saved to {}\n", path));
                }
                text
            })?;

            if !available {
                return Err(FetchError::EmptyResult(format!(
                    "{} is not listed for GPS week {}",
                    request.file_name(),
                    request.gps_week()
                )));
            }
        }

        Commands::Cors {
            stations,
            lat,
            lon,
            count,
            station_table,
            date,
            file_type,
            output_dir,
            check_only,
        } => {
            let mut sites: Vec<(String, Option<f64>)> =
                stations.into_iter().map(|s| (s, None)).collect();
            if let (Some(lat), Some(lon)) = (lat, lon) {
                let table = load_table(&settings, station_table)?;
                for n in table.nearest(lat, lon, count)? {
                    sites.push((n.station.short_code(), Some(n.distance_km)));
                }
            }
            if sites.is_empty() {
                return Err(FetchError::FatalInput(
                    "Pass --station or --lat/--lon to choose CORS sites".to_string(),
                ));
            }

            let fetcher = CorsFetcher::new(&settings)?;
            let dir = output_dir.unwrap_or_else(default_cors_dir);
            let mut report = CorsReport {
                date: date.to_string(),
                file_type: file_type.to_string(),
                sites: Vec::new(),
            };

            for (site, distance_km) in sites {
                let request = CorsRequest::new(&site, date, file_type)?;
                let availability = fetcher.availability(&request).await?;
                let saved = if availability.available && !check_only {
                    Some(fetcher.download(&request, &dir).await?)
                } else {
                    None
                };
                if !availability.available {
                    warn!(
                        site = %request.site,
                        file = %availability.file_name,
                        "not in the CORS listing"
                    );
                }
                report.sites.push(CorsSiteReport {
                    distance_km,
                    availability,
                    saved_to: saved.map(|p| p.display().to_string()),
                });
            }

            emit(json, &report, |r| r.to_text())?;

            if !report.sites.iter().any(|s| s.availability.available) {
                return Err(FetchError::EmptyResult(format!(
                    "No requested CORS site is listed for {}",
                    date
                )));
            }
        }

        Commands::Nearest {
            lat,
            lon,
            count,
            station_table,
        } => {
            let table = load_table(&settings, station_table)?;
            let nearest = table.nearest(lat, lon, count)?;

            emit(json, &nearest, |nearest| {
                let mut text = String::new();
                for n in nearest {
                    text.push_str(&format!(
                        "{:<10} {:>9.1} km  ({:.4}, {:.4}){}\n",
                        n.station.site,
                        n.distance_km,
                        n.station.latitude,
                        n.station.longitude,
                        if n.station.one_second { "  1s" } else { "" }
                    ));
                }
                text
            })?;
        }
    }

    Ok(())
}

/// Route `tracing` output to stderr or a log file. Verbose raises the
/// level to DEBUG.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let installed = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };

    installed.map_err(|e| FetchError::Config(format!("Cannot initialise logging: {}", e)))
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn load_table(settings: &Settings, override_path: Option<PathBuf>) -> Result<StationTable> {
    let path = override_path
        .or_else(|| settings.station_table.clone())
        .ok_or_else(|| {
            FetchError::Config(
                "No station table configured; pass --station-table or set station_table"
                    .to_string(),
            )
        })?;

    let type_s = match &settings.type_s_list {
        Some(list) => StationReader::read_type_s_list(list)?,
        None => Default::default(),
    };
    let table = StationReader::with_type_s(type_s).read_stations(&path)?;
    info!(path = %path.display(), stations = table.len(), "station table loaded");
    Ok(table)
}

/// The configured station table, if it can be read. Only used to pick the
/// data type, so a broken table falls back to R.
fn optional_table(settings: &Settings) -> Option<StationTable> {
    if settings.station_table.is_none() {
        debug!("no station table configured; data type defaults to R");
        return None;
    }
    match load_table(settings, None) {
        Ok(table) => Some(table),
        Err(e) => {
            warn!(error = %e, "station table unavailable; data type defaults to R");
            None
        }
    }
}

fn build_request(
    station: &str,
    window: &WindowArgs,
    table: Option<&StationTable>,
) -> Result<StationRequest> {
    let data_type = window.data_type.unwrap_or_else(|| {
        table
            .map(|t| t.data_type_for(station, window.rinex_version))
            .unwrap_or(DataType::R)
    });
    StationRequest::new(station, window.rinex_version, data_type)
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct FetchSummary {
    archive: String,
    reports: Vec<FetchReport>,
    failed_stations: Vec<String>,
}

impl FetchSummary {
    fn new(archive: &Path, reports: Vec<FetchReport>) -> Self {
        Self {
            archive: archive.display().to_string(),
            reports,
            failed_stations: Vec::new(),
        }
    }

    fn to_text(&self) -> String {
        let mut text = String::new();
        for report in &self.reports {
            text.push_str(&report.summary());
            for failure in &report.failures {
                text.push_str(&format!("    {}\n", failure));
            }
        }
        for failed in &self.failed_stations {
            text.push_str(&format!("Station skipped: {}\n", failed));
        }
        text.push_str(&format!("Archive: {}\n", self.archive));
        text
    }
}

#[derive(Debug, Serialize)]
struct AvailabilityReport {
    station: String,
    date: String,
    available: bool,
    detail: String,
    rinex_version: Option<String>,
}

#[derive(Debug, Serialize)]
struct OrbitReport {
    file_name: String,
    gps_week: i64,
    available: bool,
    saved_to: Option<String>,
}

#[derive(Debug, Serialize)]
struct CorsReport {
    date: String,
    file_type: String,
    sites: Vec<CorsSiteReport>,
}

#[derive(Debug, Serialize)]
struct CorsSiteReport {
    #[serde(flatten)]
    availability: CorsAvailability,
    distance_km: Option<f64>,
    saved_to: Option<String>,
}

impl CorsReport {
    fn to_text(&self) -> String {
        let mut text = format!("NOAA CORS {} files for {}\n", self.file_type, self.date);
        for site in &self.sites {
            let a = &site.availability;
            text.push_str(&format!(
                "{:<6} {:<18} {}",
                a.site,
                a.file_name,
                if a.available { "listed" } else { "not listed" }
            ));
            if let Some(km) = site.distance_km {
                text.push_str(&format!("  ({:.1} km)", km));
            }
            text.push('\n');
            if let Some(path) = &site.saved_to {
                text.push_str(&format!("  saved to {}\n", path));
            } else if let Some(url) = &a.url {
                text.push_str(&format!("  {}\n", url));
            }
        }
        text
    }
}
