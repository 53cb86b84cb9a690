use serde::Serialize;
use thiserror::Error;

use crate::modules::uploads::domain::MediaUploadError;

#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Media fetch error: {0}")]
    MediaFetchError(String),

    #[error("Media upload error: {0}")]
    MediaUploadError(String),

    #[error("Product update error: {0}")]
    ProductUpdateError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(err.to_string()),
            _ => AppError::Io(err.to_string()),
        }
    }
}

impl From<MediaUploadError> for AppError {
    fn from(err: MediaUploadError) -> Self {
        AppError::MediaUploadError(err.to_string())
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
