/// Domain entities for product image uploads
///
/// An upload record tracks one local image on its way to becoming an image
/// of a remote product: fetched from the device, uploaded to the media
/// library, then attached to the product.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::value_objects::UploadStatus;

/// Remote id of a product or product variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl ProductId {
    /// Id used while a product is being created and has no remote id yet
    pub const DEFAULT_ADD_NEW: ProductId = ProductId(0);

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ProductId {
    fn from(id: i64) -> Self {
        ProductId(id)
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local image read from the device and ready to be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedMedia {
    pub local_uri: String,
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// A media item stored in the remote media library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMedia {
    pub media_id: i64,
    pub url: String,
    pub file_name: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Image attached to a product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: i64,
    pub name: String,
    pub source: String,
    pub date_created: DateTime<Utc>,
}

impl From<&RemoteMedia> for ProductImage {
    fn from(media: &RemoteMedia) -> Self {
        Self {
            id: media.media_id,
            name: media.file_name.clone(),
            source: media.url.clone(),
            date_created: media.uploaded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub images: Vec<ProductImage>,
}

impl Product {
    /// Copy of the product with the uploaded media appended to its images
    pub fn with_added_images(&self, media: &[RemoteMedia]) -> Product {
        let mut updated = self.clone();
        updated
            .images
            .extend(media.iter().map(ProductImage::from));
        updated
    }
}

/// Tracking entry for one image upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImageUploadData {
    pub product_id: ProductId,
    pub local_uri: String,
    pub upload_status: UploadStatus,
}

impl ProductImageUploadData {
    pub fn in_progress(product_id: ProductId, local_uri: impl Into<String>) -> Self {
        Self {
            product_id,
            local_uri: local_uri.into(),
            upload_status: UploadStatus::InProgress,
        }
    }

    pub fn matches(&self, product_id: ProductId, local_uri: &str) -> bool {
        self.product_id == product_id && self.local_uri == local_uri
    }
}
