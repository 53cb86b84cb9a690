/// Value objects for the uploads domain
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::entities::RemoteMedia;

/// Classification of a failed media fetch or upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorType {
    /// The local file could not be read from the device
    FetchFailed,
    GenericError,
    AuthorizationRequired,
    RequestTooLarge,
    ServerError,
    Timeout,
    ConnectionError,
}

impl MediaErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaErrorType::FetchFailed => "fetch_failed",
            MediaErrorType::GenericError => "generic_error",
            MediaErrorType::AuthorizationRequired => "authorization_required",
            MediaErrorType::RequestTooLarge => "request_too_large",
            MediaErrorType::ServerError => "server_error",
            MediaErrorType::Timeout => "timeout",
            MediaErrorType::ConnectionError => "connection_error",
        }
    }
}

impl std::fmt::Display for MediaErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error attached to a failed upload record
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{error_type}: {message}")]
pub struct MediaUploadError {
    pub error_type: MediaErrorType,
    pub message: String,
}

impl MediaUploadError {
    pub fn new(error_type: MediaErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
        }
    }

    /// The media could not be fetched from the device, so there is nothing to upload
    pub fn fetch_failed(reason: impl Into<String>) -> Self {
        Self::new(MediaErrorType::FetchFailed, reason)
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(MediaErrorType::GenericError, message)
    }
}

/// Lifecycle state of one tracked image upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadStatus {
    InProgress,
    Failed { error: MediaUploadError },
    UploadSuccess { media: RemoteMedia },
}

impl UploadStatus {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, UploadStatus::InProgress)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, UploadStatus::Failed { .. })
    }

    pub fn uploaded_media(&self) -> Option<&RemoteMedia> {
        match self {
            UploadStatus::UploadSuccess { media } => Some(media),
            _ => None,
        }
    }
}

impl std::fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::InProgress => write!(f, "in_progress"),
            UploadStatus::Failed { .. } => write!(f, "failed"),
            UploadStatus::UploadSuccess { .. } => write!(f, "upload_success"),
        }
    }
}
