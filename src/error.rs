use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid request: {0}")]
    FatalInput(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("External tool '{tool}' not found (searched: {searched})")]
    ToolMissing { tool: String, searched: String },

    #[error("Nothing retrievable: {0}")]
    EmptyResult(String),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Processing cancelled by user")]
    Cancelled,

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

impl From<config::ConfigError> for FetchError {
    fn from(err: config::ConfigError) -> Self {
        FetchError::Config(err.to_string())
    }
}
