use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

use crate::modules::uploads::application::ports::ProductImagesNotificationHandler;
use crate::modules::uploads::domain::{Product, ProductId};

/// Outcome notice about a product's images
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProductNotice {
    UpdateFailed { product_name: Option<String> },
    UpdateSucceeded { product_name: String, image_count: usize },
}

/// Progress of the current upload batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UploadProgress {
    pub current: usize,
    pub total: usize,
    pub progress: f32,
}

/// Notification handler keeping posted notifications in memory.
/// Hosts poll it to render their own notification UI.
#[derive(Debug, Default)]
pub struct InMemoryNotificationCenter {
    upload_failures: DashMap<ProductId, usize>,
    notices: DashMap<ProductId, ProductNotice>,
    current: AtomicUsize,
    total: AtomicUsize,
    /// f32 bits
    progress: AtomicU32,
}

impl InMemoryNotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failed image count of the posted failure notification
    pub fn upload_failure(&self, product_id: ProductId) -> Option<usize> {
        self.upload_failures.get(&product_id).map(|count| *count)
    }

    pub fn notice(&self, product_id: ProductId) -> Option<ProductNotice> {
        self.notices.get(&product_id).map(|notice| notice.clone())
    }

    pub fn dismiss_notice(&self, product_id: ProductId) -> Option<ProductNotice> {
        self.notices.remove(&product_id).map(|(_, notice)| notice)
    }

    pub fn upload_progress(&self) -> UploadProgress {
        UploadProgress {
            current: self.current.load(Ordering::SeqCst),
            total: self.total.load(Ordering::SeqCst),
            progress: f32::from_bits(self.progress.load(Ordering::SeqCst)),
        }
    }
}

impl ProductImagesNotificationHandler for InMemoryNotificationCenter {
    fn post_upload_failure_notification(&self, product_id: ProductId, error_count: usize) {
        warn!(
            "{} image(s) of product {} failed to upload",
            error_count, product_id
        );
        self.upload_failures.insert(product_id, error_count);
    }

    fn remove_upload_failure_notification(&self, product_id: ProductId) {
        if self.upload_failures.remove(&product_id).is_some() {
            debug!("Removed upload failure notification of product {}", product_id);
        }
    }

    fn post_update_failure_notification(&self, product_id: ProductId, product: Option<Product>) {
        warn!("Adding images to product {} failed", product_id);
        self.notices.insert(
            product_id,
            ProductNotice::UpdateFailed {
                product_name: product.map(|p| p.name),
            },
        );
    }

    fn post_update_success_notification(
        &self,
        product_id: ProductId,
        product: Product,
        image_count: usize,
    ) {
        info!(
            "Added {} image(s) to product {} ({})",
            image_count, product_id, product.name
        );
        self.notices.insert(
            product_id,
            ProductNotice::UpdateSucceeded {
                product_name: product.name,
                image_count,
            },
        );
    }

    fn update_upload_notification(&self, current: usize, total: usize) {
        debug!("Uploading image {} of {}", current, total);
        self.current.store(current, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
        self.progress.store(0f32.to_bits(), Ordering::SeqCst);
    }

    fn set_progress(&self, progress: f32) {
        self.progress
            .store(progress.clamp(0.0, 1.0).to_bits(), Ordering::SeqCst);
    }
}
