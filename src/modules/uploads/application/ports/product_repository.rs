use async_trait::async_trait;

use crate::modules::uploads::domain::{Product, ProductId};
use crate::shared::errors::AppResult;

/// Port for the store backend's product endpoints
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fetch the product remotely, falling back to the local cache.
    /// `Ok(None)` when neither has it.
    async fn fetch_product_or_load_from_cache(
        &self,
        product_id: ProductId,
    ) -> AppResult<Option<Product>>;

    /// Save the product; an error means the backend rejected or never saw the update
    async fn update_product(&self, product: &Product) -> AppResult<()>;
}
