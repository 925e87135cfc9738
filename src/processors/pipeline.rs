use chrono::{Local, NaiveDate};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::archive::{ArchiveAssembler, ArchiveContents, OutputArchive, Workspace};
use crate::codec::check_retention;
use crate::config::Settings;
use crate::error::{FetchError, Result};
use crate::models::{
    ContentKind, ConvertedFragment, FailureStage, FetchItem, FetchReport, MergeStatus,
    RinexVersion, SlotFailure, StationRequest, TimeWindow,
};
use crate::processors::decompressor::decompress;
use crate::processors::{
    FetchFailure, FetchPlanner, FormatConverter, MergeOutcome, Merger, RetrievalWorker,
};
use crate::tools::{ExternalTool, ProcessTool, ToolLocator};
use crate::transport::{AuthSession, CredentialProvider};
use crate::utils::constants::{CONVERTER_ENV, CONVERTER_TOOL};
use crate::utils::{combined_archive_name, station_archive_name, ProgressReporter};

/// Archive plus the report describing how it was produced.
#[derive(Debug)]
pub struct PipelineOutput {
    pub archive: OutputArchive,
    pub report: FetchReport,
}

/// A station that produced nothing during a multi-station run.
#[derive(Debug, Clone)]
pub struct StationFailure {
    pub station: String,
    pub reason: String,
}

/// Combined archive of a multi-station run. The per-station outputs are
/// kept alive because the combined archive's sources live in their workspaces.
#[derive(Debug)]
pub struct MultiStationOutput {
    pub archive: OutputArchive,
    pub stations: Vec<PipelineOutput>,
    pub failed: Vec<StationFailure>,
}

enum SlotOutcome {
    Converted(ConvertedFragment),
    Failed(SlotFailure),
    Unauthenticated(FetchItem),
}

/// Runs plan -> fetch -> decompress -> convert -> merge -> assemble for one
/// station and time window.
pub struct StationPipeline {
    settings: Settings,
    worker: RetrievalWorker,
    converter: FormatConverter,
    merger: Merger,
    assembler: ArchiveAssembler,
    today: NaiveDate,
    show_progress: bool,
}

impl StationPipeline {
    pub fn new(settings: &Settings, session: AuthSession, converter: Arc<dyn ExternalTool>) -> Self {
        let merger = if settings.merge_enabled {
            Merger::from_settings(settings)
        } else {
            Merger::default()
        };

        Self {
            settings: settings.clone(),
            worker: RetrievalWorker::new(session).with_magic_validation(settings.validate_magic),
            converter: FormatConverter::new(converter),
            merger,
            assembler: ArchiveAssembler::new(),
            today: Local::now().date_naive(),
            show_progress: false,
        }
    }

    /// Resolve credentials and the converter, then build the session.
    /// A missing converter is fatal; a missing merger is not.
    pub fn from_settings(settings: &Settings, credentials: &dyn CredentialProvider) -> Result<Self> {
        let converter_path = ToolLocator::new(CONVERTER_TOOL, CONVERTER_ENV, &settings.tools_dir)
            .with_explicit_path(settings.converter_path.clone())
            .locate()?;
        let converter: Arc<dyn ExternalTool> =
            Arc::new(ProcessTool::new(CONVERTER_TOOL, converter_path));

        let session = AuthSession::new(credentials.credentials()?, settings)?;
        Ok(Self::new(settings, session, converter))
    }

    pub fn with_merger(mut self, merger: Merger) -> Self {
        self.merger = merger;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Window and retention checks. Runs before any network traffic.
    pub fn validate(&self, window: &TimeWindow) -> Result<()> {
        let window = TimeWindow::new(
            window.year,
            window.day_of_year,
            window.start_hour,
            window.end_hour,
        )?;
        check_retention(window.date(), self.today, self.settings.retention_days)
    }

    pub async fn run(&self, request: &StationRequest, window: &TimeWindow) -> Result<PipelineOutput> {
        self.validate(window)?;

        let station = request.long_code();
        let workspace = self.open_workspace(&format!("{}_{}", station, window.date().format("%Y%m%d")))?;
        let items = FetchPlanner::new(self.settings.archive_base()).plan(request, window);
        let mut report = FetchReport::new(&station, items.len());

        info!(
            station = %station,
            window = %window,
            slots = items.len(),
            workers = self.settings.max_workers,
            "starting acquisition"
        );

        let progress = ProgressReporter::new(
            items.len() as u64,
            &format!("Fetching {} {}", station, window),
            !self.show_progress,
        );

        let mut fragments = self
            .retrieve_all(items, request.version, workspace.work_dir(), &mut report, &progress)
            .await?;
        fragments.sort_by_key(|f| f.slot);
        report.converted = fragments.len();

        if fragments.is_empty() {
            progress.finish_with_message(&format!("{}: no data", station));
            return Err(FetchError::EmptyResult(format!(
                "No slot for {} in {} could be retrieved and converted",
                station, window
            )));
        }

        let (fragments, merged) = self
            .merge(fragments, request.version, window.duration_hours(), &mut report)
            .await?;

        let zip_path = workspace.root().join(station_archive_name(request, window));
        let assembler = self.assembler;
        let kind = report.merge.content_kind();
        let (zip_path, manifest, sources) = tokio::task::spawn_blocking(move || {
            let contents = match &merged {
                Some(merged) => ArchiveContents::Merged(merged),
                None => ArchiveContents::Fragments(&fragments),
            };
            let manifest = assembler.assemble(&zip_path, contents)?;
            Ok::<_, FetchError>((zip_path, manifest, contents.sources()))
        })
        .await??;

        progress.finish_with_message(&format!(
            "{}: {}/{} slots, {}",
            station,
            report.converted,
            report.attempted,
            match kind {
                ContentKind::Merged => "merged",
                ContentKind::Fragments => "fragments",
            }
        ));
        info!(
            station = %station,
            retrieved = report.retrieved,
            converted = report.converted,
            failed = report.failures.len(),
            archive = %zip_path.display(),
            "acquisition finished"
        );

        Ok(PipelineOutput {
            archive: OutputArchive::new(zip_path, manifest, kind, sources, workspace),
            report,
        })
    }

    /// Like [`run`](Self::run), but gives up with `Cancelled` as soon as
    /// `cancel` resolves. Outstanding downloads are aborted and the
    /// workspace is removed.
    pub async fn run_with_cancel<F>(
        &self,
        request: &StationRequest,
        window: &TimeWindow,
        cancel: F,
    ) -> Result<PipelineOutput>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            output = self.run(request, window) => output,
            _ = cancel => {
                warn!(station = %request.long_code(), "acquisition cancelled");
                Err(FetchError::Cancelled)
            }
        }
    }

    /// One combined archive for several stations, each under `{STATION}/`.
    /// Station-level failures are recorded; authentication, input and
    /// cancellation errors still abort the whole run.
    pub async fn run_many(
        &self,
        requests: &[StationRequest],
        window: &TimeWindow,
    ) -> Result<MultiStationOutput> {
        self.validate(window)?;

        let mut stations = Vec::new();
        let mut failed = Vec::new();

        for request in requests {
            match self.run(request, window).await {
                Ok(output) => stations.push(output),
                Err(e @ (FetchError::Auth(_) | FetchError::FatalInput(_) | FetchError::Cancelled)) => {
                    return Err(e)
                }
                Err(e) => {
                    warn!(station = %request.long_code(), error = %e, "station skipped");
                    failed.push(StationFailure {
                        station: request.long_code(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if stations.is_empty() {
            return Err(FetchError::EmptyResult(format!(
                "None of the {} requested stations produced data",
                requests.len()
            )));
        }

        let workspace = self.open_workspace(&format!("combined_{}", window.date().format("%Y%m%d")))?;
        let zip_path = workspace.root().join(combined_archive_name(window));
        let members: Vec<(String, Vec<PathBuf>)> = stations
            .iter()
            .map(|s| (s.report.station.clone(), s.archive.sources.clone()))
            .collect();
        let sources: Vec<PathBuf> = members.iter().flat_map(|(_, p)| p.clone()).collect();
        let content = if stations
            .iter()
            .all(|s| s.archive.content == ContentKind::Merged)
        {
            ContentKind::Merged
        } else {
            ContentKind::Fragments
        };

        let assembler = self.assembler;
        let (zip_path, manifest) = tokio::task::spawn_blocking(move || {
            let manifest = assembler.assemble_combined(&zip_path, &members)?;
            Ok::<_, FetchError>((zip_path, manifest))
        })
        .await??;

        Ok(MultiStationOutput {
            archive: OutputArchive::new(zip_path, manifest, content, sources, workspace),
            stations,
            failed,
        })
    }

    fn open_workspace(&self, label: &str) -> Result<Workspace> {
        match &self.settings.scratch_dir {
            Some(dir) => Workspace::new_in(dir, label),
            None => Workspace::new(label),
        }
    }

    async fn retrieve_all(
        &self,
        items: Vec<FetchItem>,
        version: RinexVersion,
        work_dir: &Path,
        report: &mut FetchReport,
        progress: &ProgressReporter,
    ) -> Result<Vec<ConvertedFragment>> {
        let permits = Arc::new(Semaphore::new(self.settings.max_workers));
        let mut tasks = JoinSet::new();

        for item in items {
            let permits = Arc::clone(&permits);
            let worker = self.worker.clone();
            let converter = self.converter.clone();
            let work_dir = work_dir.to_path_buf();

            tasks.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return SlotOutcome::Failed(SlotFailure::new(
                            &item,
                            FailureStage::Fetch,
                            e.to_string(),
                        ))
                    }
                };
                process_slot(worker, converter, item, version, work_dir).await
            });
        }

        let mut fragments = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            progress.increment(1);
            match joined? {
                SlotOutcome::Converted(fragment) => {
                    report.retrieved += 1;
                    fragments.push(fragment);
                }
                SlotOutcome::Failed(failure) => {
                    if failure.stage != FailureStage::Fetch {
                        report.retrieved += 1;
                    }
                    warn!(
                        slot = %failure.slot,
                        file = %failure.file_name,
                        stage = %failure.stage,
                        reason = %failure.reason,
                        "slot failed"
                    );
                    report.failures.push(failure);
                }
                SlotOutcome::Unauthenticated(item) => {
                    tasks.abort_all();
                    return Err(FetchError::Auth(format!(
                        "Archive returned a login page for {}; check the Earthdata credentials",
                        item.file_name
                    )));
                }
            }
        }

        report.failures.sort_by_key(|f| f.slot);
        Ok(fragments)
    }

    /// Returns the fragments back, plus the merged file when merging worked.
    async fn merge(
        &self,
        fragments: Vec<ConvertedFragment>,
        version: RinexVersion,
        hours: u32,
        report: &mut FetchReport,
    ) -> Result<(Vec<ConvertedFragment>, Option<crate::processors::MergeResult>)> {
        if !self.settings.merge_enabled {
            report.merge = MergeStatus::Disabled;
            return Ok((fragments, None));
        }

        let merger = self.merger.clone();
        let (fragments, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = merger.merge(&fragments, version, hours);
            (fragments, outcome)
        })
        .await?;

        match outcome {
            MergeOutcome::Merged(merged) => {
                report.merge = MergeStatus::Merged {
                    file_name: merged
                        .path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    hours: merged.hours,
                };
                Ok((fragments, Some(merged)))
            }
            MergeOutcome::Failed(reason) => {
                warn!(reason = %reason, fragments = fragments.len(), "merge failed, shipping fragments");
                report.merge = MergeStatus::Failed { reason };
                Ok((fragments, None))
            }
        }
    }
}

async fn process_slot(
    worker: RetrievalWorker,
    converter: FormatConverter,
    item: FetchItem,
    version: RinexVersion,
    work_dir: PathBuf,
) -> SlotOutcome {
    let payload = match worker.fetch(&item, &work_dir).await {
        Ok(payload) => payload,
        Err(FetchFailure::Unauthenticated) => return SlotOutcome::Unauthenticated(item),
        Err(failure) => {
            return SlotOutcome::Failed(SlotFailure::new(&item, FailureStage::Fetch, failure.to_string()))
        }
    };

    let slot = item.slot;
    let converted =
        tokio::task::spawn_blocking(move || convert_payload(&converter, &payload.path, version)).await;

    match converted {
        Ok(Ok(path)) => SlotOutcome::Converted(ConvertedFragment { path, slot }),
        Ok(Err((stage, e))) => SlotOutcome::Failed(SlotFailure::new(&item, stage, e.to_string())),
        Err(e) => SlotOutcome::Failed(SlotFailure::new(&item, FailureStage::Convert, e.to_string())),
    }
}

/// Decompress then convert, deleting each intermediate once consumed.
fn convert_payload(
    converter: &FormatConverter,
    compressed: &Path,
    version: RinexVersion,
) -> std::result::Result<PathBuf, (FailureStage, FetchError)> {
    let compact = decompress(compressed).map_err(|e| (FailureStage::Decompress, e))?;
    remove_intermediate(compressed);

    let converted = converter
        .convert(&compact, version)
        .map_err(|e| (FailureStage::Convert, e));
    remove_intermediate(&compact);
    converted
}

fn remove_intermediate(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "cannot remove intermediate file");
    }
}
