/// Work items accepted by the upload worker
use serde::{Deserialize, Serialize};

use super::entities::{FetchedMedia, ProductId, RemoteMedia};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Work {
    /// Read a local image from the device
    FetchMedia {
        product_id: ProductId,
        local_uri: String,
    },
    /// Upload a fetched image to the remote media library
    UploadMedia {
        product_id: ProductId,
        local_uri: String,
        fetched_media: FetchedMedia,
    },
    /// Attach uploaded images to the product
    UpdateProduct {
        product_id: ProductId,
        uploaded_media: Vec<RemoteMedia>,
    },
}

impl Work {
    pub fn product_id(&self) -> ProductId {
        match self {
            Work::FetchMedia { product_id, .. }
            | Work::UploadMedia { product_id, .. }
            | Work::UpdateProduct { product_id, .. } => *product_id,
        }
    }

    /// Fetches and uploads count towards a product's pending media work
    pub fn is_media_work(&self) -> bool {
        matches!(self, Work::FetchMedia { .. } | Work::UploadMedia { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Work::FetchMedia { .. } => "fetch_media",
            Work::UploadMedia { .. } => "upload_media",
            Work::UpdateProduct { .. } => "update_product",
        }
    }
}

impl std::fmt::Display for Work {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (product {})", self.kind(), self.product_id())
    }
}
