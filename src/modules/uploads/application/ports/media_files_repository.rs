use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::modules::uploads::domain::{FetchedMedia, MediaUploadError, ProductId, RemoteMedia};
use crate::shared::errors::AppResult;

/// One item of an upload's result stream
#[derive(Debug, Clone, PartialEq)]
pub enum UploadResult {
    /// Fraction of bytes sent, between 0.0 and 1.0
    Progress(f32),
    Success(RemoteMedia),
    Failure(MediaUploadError),
}

/// Port for reading images from the device and sending them to the media library
#[async_trait]
pub trait MediaFilesRepository: Send + Sync {
    /// Read the local image behind `local_uri`
    async fn fetch_media(&self, local_uri: &str) -> AppResult<FetchedMedia>;

    /// Upload a fetched image; the stream ends after the first terminal item
    fn upload_media(
        &self,
        product_id: ProductId,
        media: FetchedMedia,
    ) -> BoxStream<'static, UploadResult>;
}

/// Remote half of the media repository (the backend's media endpoint)
pub trait MediaUploader: Send + Sync {
    fn upload(&self, product_id: ProductId, media: FetchedMedia) -> BoxStream<'static, UploadResult>;
}
