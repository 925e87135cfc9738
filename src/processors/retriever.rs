use reqwest::{Response, StatusCode};
use std::path::Path;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::models::{FetchItem, RetrievedPayload};
use crate::transport::{is_html, AuthSession};
use crate::utils::constants::GZIP_MAGIC;

/// Why one download did not produce a payload. Always slot-local, except
/// `Unauthenticated`, which the pipeline escalates.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("HTTP status {0}")]
    Status(u16),

    /// A login page or an authorisation refusal: the handshake failed.
    #[error("received a login page instead of data (authentication failed)")]
    Unauthenticated,

    #[error("payload is not gzip-compressed")]
    BadMagic,

    #[error("network error: {0}")]
    Network(String),

    #[error("write error: {0}")]
    Io(String),
}

/// Downloads and validates one planned item.
#[derive(Clone)]
pub struct RetrievalWorker {
    session: AuthSession,
    validate_magic: bool,
}

impl RetrievalWorker {
    pub fn new(session: AuthSession) -> Self {
        Self {
            session,
            validate_magic: true,
        }
    }

    pub fn with_magic_validation(mut self, validate_magic: bool) -> Self {
        self.validate_magic = validate_magic;
        self
    }

    /// Fetch `item` into `dest_dir`. Any pre-existing file with the same name
    /// is replaced. Nothing is left on disk when the fetch fails.
    pub async fn fetch(
        &self,
        item: &FetchItem,
        dest_dir: &Path,
    ) -> std::result::Result<RetrievedPayload, FetchFailure> {
        debug!(url = %item.url, "fetching");

        let response = self
            .session
            .get(&item.url)
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        if is_login_response(&response) {
            return Err(FetchFailure::Unauthenticated);
        }

        if response.status() != StatusCode::OK {
            return Err(FetchFailure::Status(response.status().as_u16()));
        }

        let path = dest_dir.join(&item.file_name);
        match self.write_body(response, &path).await {
            Ok(bytes) => Ok(RetrievedPayload {
                item: item.clone(),
                path,
                bytes,
            }),
            Err(failure) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %path.display(), error = %e, "cannot remove rejected download");
                    }
                }
                Err(failure)
            }
        }
    }

    async fn write_body(
        &self,
        mut response: Response,
        path: &Path,
    ) -> std::result::Result<u64, FetchFailure> {
        let io_failure = |e: std::io::Error| FetchFailure::Io(e.to_string());

        let mut file = tokio::fs::File::create(path).await.map_err(io_failure)?;
        let mut head: Vec<u8> = Vec::with_capacity(GZIP_MAGIC.len());
        let mut bytes = 0u64;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?
        {
            if head.len() < GZIP_MAGIC.len() {
                let needed = GZIP_MAGIC.len() - head.len();
                head.extend(chunk.iter().take(needed));
            }
            file.write_all(&chunk).await.map_err(io_failure)?;
            bytes += chunk.len() as u64;
        }
        file.flush().await.map_err(io_failure)?;

        if self.validate_magic && !has_gzip_magic(&head) {
            return Err(FetchFailure::BadMagic);
        }

        Ok(bytes)
    }
}

/// Earthdata refuses bad credentials with a 401 HTML login page; any HTML
/// where data is expected counts the same, whatever the status.
fn is_login_response(response: &Response) -> bool {
    matches!(
        response.status(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) || is_html(response)
}

pub fn has_gzip_magic(head: &[u8]) -> bool {
    head.starts_with(&GZIP_MAGIC)
}
