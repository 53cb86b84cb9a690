/// Events emitted by the upload worker
///
/// Every event names the product it belongs to; media events also name the
/// local image they are about.
use serde::{Deserialize, Serialize};

use super::entities::{FetchedMedia, Product, ProductId, RemoteMedia};
use super::value_objects::MediaUploadError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    MediaUpload(MediaUploadEvent),
    ProductUpdate(ProductUpdateEvent),
    /// Every fetch and upload queued for the product has finished
    ProductUploadsCompleted { product_id: ProductId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MediaUploadEvent {
    FetchSucceeded {
        product_id: ProductId,
        local_uri: String,
        fetched_media: FetchedMedia,
    },
    FetchFailed {
        product_id: ProductId,
        local_uri: String,
        reason: String,
    },
    UploadSucceeded {
        product_id: ProductId,
        local_uri: String,
        media: RemoteMedia,
    },
    UploadFailed {
        product_id: ProductId,
        local_uri: String,
        error: MediaUploadError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProductUpdateEvent {
    ProductUpdateSucceeded {
        product_id: ProductId,
        product: Product,
        image_count: usize,
    },
    /// `product` is `None` when the product could not even be loaded
    ProductUpdateFailed {
        product_id: ProductId,
        product: Option<Product>,
    },
}

impl Event {
    pub fn product_id(&self) -> ProductId {
        match self {
            Event::MediaUpload(event) => event.product_id(),
            Event::ProductUpdate(event) => event.product_id(),
            Event::ProductUploadsCompleted { product_id } => *product_id,
        }
    }

    /// Type of event (for logging)
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::MediaUpload(MediaUploadEvent::FetchSucceeded { .. }) => "FetchSucceeded",
            Event::MediaUpload(MediaUploadEvent::FetchFailed { .. }) => "FetchFailed",
            Event::MediaUpload(MediaUploadEvent::UploadSucceeded { .. }) => "UploadSucceeded",
            Event::MediaUpload(MediaUploadEvent::UploadFailed { .. }) => "UploadFailed",
            Event::ProductUpdate(ProductUpdateEvent::ProductUpdateSucceeded { .. }) => {
                "ProductUpdateSucceeded"
            }
            Event::ProductUpdate(ProductUpdateEvent::ProductUpdateFailed { .. }) => {
                "ProductUpdateFailed"
            }
            Event::ProductUploadsCompleted { .. } => "ProductUploadsCompleted",
        }
    }

    /// Same event, attributed to another product
    pub fn reassigned(self, new_id: ProductId) -> Event {
        match self {
            Event::MediaUpload(event) => Event::MediaUpload(event.reassigned(new_id)),
            Event::ProductUpdate(event) => Event::ProductUpdate(event.reassigned(new_id)),
            Event::ProductUploadsCompleted { .. } => Event::ProductUploadsCompleted {
                product_id: new_id,
            },
        }
    }
}

impl MediaUploadEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            MediaUploadEvent::FetchSucceeded { product_id, .. }
            | MediaUploadEvent::FetchFailed { product_id, .. }
            | MediaUploadEvent::UploadSucceeded { product_id, .. }
            | MediaUploadEvent::UploadFailed { product_id, .. } => *product_id,
        }
    }

    pub fn local_uri(&self) -> &str {
        match self {
            MediaUploadEvent::FetchSucceeded { local_uri, .. }
            | MediaUploadEvent::FetchFailed { local_uri, .. }
            | MediaUploadEvent::UploadSucceeded { local_uri, .. }
            | MediaUploadEvent::UploadFailed { local_uri, .. } => local_uri,
        }
    }

    fn reassigned(mut self, new_id: ProductId) -> Self {
        match &mut self {
            MediaUploadEvent::FetchSucceeded { product_id, .. }
            | MediaUploadEvent::FetchFailed { product_id, .. }
            | MediaUploadEvent::UploadSucceeded { product_id, .. }
            | MediaUploadEvent::UploadFailed { product_id, .. } => *product_id = new_id,
        }
        self
    }
}

impl ProductUpdateEvent {
    pub fn product_id(&self) -> ProductId {
        match self {
            ProductUpdateEvent::ProductUpdateSucceeded { product_id, .. }
            | ProductUpdateEvent::ProductUpdateFailed { product_id, .. } => *product_id,
        }
    }

    fn reassigned(mut self, new_id: ProductId) -> Self {
        match &mut self {
            ProductUpdateEvent::ProductUpdateSucceeded { product_id, .. }
            | ProductUpdateEvent::ProductUpdateFailed { product_id, .. } => *product_id = new_id,
        }
        self
    }
}
