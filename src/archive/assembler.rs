use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::Workspace;
use crate::error::{FetchError, Result};
use crate::models::{ContentKind, ConvertedFragment};
use crate::processors::MergeResult;
use crate::utils::constants::DEFAULT_BUFFER_SIZE;

/// Files that go into one station's archive: the merged file or the
/// fragments, never both.
#[derive(Debug, Clone, Copy)]
pub enum ArchiveContents<'a> {
    Merged(&'a MergeResult),
    Fragments(&'a [ConvertedFragment]),
}

impl ArchiveContents<'_> {
    pub fn kind(&self) -> ContentKind {
        match self {
            ArchiveContents::Merged(_) => ContentKind::Merged,
            ArchiveContents::Fragments(_) => ContentKind::Fragments,
        }
    }

    pub fn sources(&self) -> Vec<PathBuf> {
        match self {
            ArchiveContents::Merged(merged) => vec![merged.path.clone()],
            ArchiveContents::Fragments(fragments) => {
                fragments.iter().map(|f| f.path.clone()).collect()
            }
        }
    }
}

/// A finished zip inside its workspace. The archive is only valid while
/// this value lives; call [`OutputArchive::persist`] to keep it.
#[derive(Debug)]
pub struct OutputArchive {
    pub path: PathBuf,
    pub manifest: Vec<String>,
    pub content: ContentKind,
    /// Files the archive was built from, still on disk in the workspace.
    pub sources: Vec<PathBuf>,
    workspace: Workspace,
}

impl OutputArchive {
    pub fn new(
        path: PathBuf,
        manifest: Vec<String>,
        content: ContentKind,
        sources: Vec<PathBuf>,
        workspace: Workspace,
    ) -> Self {
        Self {
            path,
            manifest,
            content,
            sources,
            workspace,
        }
    }

    /// Copy the archive to `destination` (a file path, or a directory to
    /// copy into under the archive's own name).
    pub fn persist(&self, destination: &Path) -> Result<PathBuf> {
        let target = if destination.is_dir() {
            match self.path.file_name() {
                Some(name) => destination.join(name),
                None => destination.to_path_buf(),
            }
        } else {
            destination.to_path_buf()
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&self.path, &target)?;
        info!(archive = %target.display(), "archive written");
        Ok(target)
    }

    pub fn close(self) -> Result<()> {
        self.workspace.close()
    }
}

/// Writes deflated zip archives with unique member names.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveAssembler;

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Write one station's files at the root of `zip_path`. Returns the manifest.
    pub fn assemble(&self, zip_path: &Path, contents: ArchiveContents<'_>) -> Result<Vec<String>> {
        let members = contents
            .sources()
            .into_iter()
            .map(|path| Ok((member_name(&path)?, path)))
            .collect::<Result<Vec<_>>>()?;

        self.write_zip(zip_path, &members)
    }

    /// Write several stations into one zip, each under `{STATION}/`.
    pub fn assemble_combined(
        &self,
        zip_path: &Path,
        stations: &[(String, Vec<PathBuf>)],
    ) -> Result<Vec<String>> {
        let mut members = Vec::new();
        for (station, sources) in stations {
            for path in sources {
                members.push((format!("{}/{}", station, member_name(path)?), path.clone()));
            }
        }

        self.write_zip(zip_path, &members)
    }

    fn write_zip(&self, zip_path: &Path, members: &[(String, PathBuf)]) -> Result<Vec<String>> {
        if members.is_empty() {
            return Err(FetchError::EmptyResult(
                "Nothing to put in the archive".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (name, _) in members {
            if !seen.insert(name.as_str()) {
                return Err(FetchError::InvalidFormat(format!(
                    "Duplicate archive member: {}",
                    name
                )));
            }
        }

        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let file = File::create(zip_path)?;
        let mut zip = ZipWriter::new(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));
        let mut manifest = Vec::with_capacity(members.len());

        for (name, path) in members {
            zip.start_file(name.as_str(), options)?;
            let mut source = BufReader::with_capacity(DEFAULT_BUFFER_SIZE, File::open(path)?);
            io::copy(&mut source, &mut zip)?;
            manifest.push(name.clone());
        }
        zip.finish()?;

        info!(
            archive = %zip_path.display(),
            members = manifest.len(),
            "archive assembled"
        );
        Ok(manifest)
    }
}

fn member_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| FetchError::InvalidFormat(format!("No file name in {}", path.display())))
}
