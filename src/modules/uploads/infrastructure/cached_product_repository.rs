use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::modules::uploads::application::ports::ProductRepository;
use crate::modules::uploads::domain::{Product, ProductId};
use crate::shared::errors::AppResult;

/// Decorator keeping the last known copy of each product.
///
/// Reads go to the wrapped repository first and fall back to the cached copy
/// when it fails or no longer knows the product.
pub struct CachedProductRepository {
    inner: Arc<dyn ProductRepository>,
    cache: DashMap<ProductId, Product>,
}

impl CachedProductRepository {
    pub fn new(inner: Arc<dyn ProductRepository>) -> Self {
        Self {
            inner,
            cache: DashMap::new(),
        }
    }

    /// Seed the cache, e.g. with products loaded at startup
    pub fn remember(&self, product: Product) {
        self.cache.insert(product.id, product);
    }

    pub fn cached(&self, product_id: ProductId) -> Option<Product> {
        self.cache.get(&product_id).map(|p| p.clone())
    }
}

#[async_trait]
impl ProductRepository for CachedProductRepository {
    async fn fetch_product_or_load_from_cache(
        &self,
        product_id: ProductId,
    ) -> AppResult<Option<Product>> {
        match self.inner.fetch_product_or_load_from_cache(product_id).await {
            Ok(Some(product)) => {
                self.cache.insert(product_id, product.clone());
                Ok(Some(product))
            }
            Ok(None) => {
                debug!("Product {} not found remotely, using cache", product_id);
                Ok(self.cached(product_id))
            }
            Err(e) => match self.cached(product_id) {
                Some(product) => {
                    warn!("Loading product {} failed ({}), using cache", product_id, e);
                    Ok(Some(product))
                }
                None => Err(e),
            },
        }
    }

    async fn update_product(&self, product: &Product) -> AppResult<()> {
        self.inner.update_product(product).await?;
        self.cache.insert(product.id, product.clone());
        Ok(())
    }
}
