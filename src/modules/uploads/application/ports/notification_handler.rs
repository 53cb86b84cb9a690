use crate::modules::uploads::domain::{Product, ProductId};

/// Port for user-visible notifications about product image uploads
#[cfg_attr(test, mockall::automock)]
pub trait ProductImagesNotificationHandler: Send + Sync {
    /// Post or refresh the failure notification of a product
    fn post_upload_failure_notification(&self, product_id: ProductId, error_count: usize);

    fn remove_upload_failure_notification(&self, product_id: ProductId);

    fn post_update_failure_notification(&self, product_id: ProductId, product: Option<Product>);

    fn post_update_success_notification(
        &self,
        product_id: ProductId,
        product: Product,
        image_count: usize,
    );

    /// Ongoing notification for a batch: "uploading `current` of `total`"
    fn update_upload_notification(&self, current: usize, total: usize);

    fn set_progress(&self, progress: f32);
}
