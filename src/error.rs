//! Error taxonomy.
//!
//! Only [`StartupError`] and [`ExportError`] reach the binary. A
//! [`ServiceError`] is always handled inside the sweep loop, either by a
//! retry or by failing the current cell.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("boundary file not found: {0}")]
    BoundaryMissing(PathBuf),

    #[error("failed to read boundary file {path}: {source}")]
    BoundaryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid boundary GeoJSON: {0}")]
    BoundaryInvalid(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failure of a single remote request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// Quota or rate limit hit on the remote side; the same request may be retried
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// Anything else; retrying the same request will not help
    #[error("request failed: {0}")]
    Permanent(String),
}

impl ServiceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_))
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}
