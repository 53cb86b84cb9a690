use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::modules::uploads::application::ports::{
    MediaFilesRepository, MediaUploader, UploadResult,
};
use crate::modules::uploads::domain::{FetchedMedia, ProductId};
use crate::shared::errors::{AppError, AppResult};

const FILE_SCHEME: &str = "file://";

/// Media repository reading images from the local filesystem.
/// Uploads are delegated to the injected `MediaUploader`.
pub struct LocalMediaFilesFetcher {
    uploader: Arc<dyn MediaUploader>,
}

impl LocalMediaFilesFetcher {
    pub fn new(uploader: Arc<dyn MediaUploader>) -> Self {
        Self { uploader }
    }

    fn resolve_path(local_uri: &str) -> AppResult<PathBuf> {
        let path = local_uri.strip_prefix(FILE_SCHEME).unwrap_or(local_uri);
        if path.trim().is_empty() {
            return Err(AppError::InvalidInput("Empty media uri".to_string()));
        }
        Ok(PathBuf::from(path))
    }
}

/// MIME type guessed from the file extension
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl MediaFilesRepository for LocalMediaFilesFetcher {
    async fn fetch_media(&self, local_uri: &str) -> AppResult<FetchedMedia> {
        let path = Self::resolve_path(local_uri)?;
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            warn!("Cannot read media {}: {}", local_uri, e);
            AppError::MediaFetchError(format!("Cannot read {}: {}", local_uri, e))
        })?;

        if !metadata.is_file() {
            return Err(AppError::MediaFetchError(format!(
                "{} is not a file",
                local_uri
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| AppError::MediaFetchError(format!("{} has no file name", local_uri)))?;

        debug!("Fetched {} ({} bytes)", file_name, metadata.len());

        Ok(FetchedMedia {
            local_uri: local_uri.to_string(),
            mime_type: mime_type_for(&path).to_string(),
            size_bytes: metadata.len(),
            file_name,
            path,
        })
    }

    fn upload_media(
        &self,
        product_id: ProductId,
        media: FetchedMedia,
    ) -> BoxStream<'static, UploadResult> {
        debug!("Uploading {} for product {}", media.file_name, product_id);
        self.uploader.upload(product_id, media)
    }
}
