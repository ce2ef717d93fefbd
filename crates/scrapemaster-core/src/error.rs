use thiserror::Error;
use uuid::Uuid;

/// Application-wide error types for ScrapeMaster.
#[derive(Error, Debug)]
pub enum AppError {
    /// No job is registered under the given id.
    #[error("Job not found: {0}")]
    NotFound(Uuid),

    /// The requested command is not allowed in the job's current state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A job configuration was rejected before the job was created.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// HTTP request failed or returned a non-success status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Selector parsing or field extraction failed.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A worker hit a failure it could not absorb; the job is now in `error`.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error only costs the current page.
    ///
    /// Page-level failures are logged and broadcast, then the worker moves on
    /// to the next page. Anything else ends the job in `error`.
    pub fn is_page_level(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }
}
