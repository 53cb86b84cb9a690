pub mod cached_product_repository;
pub mod local_media_fetcher;
pub mod notification_center;

pub use cached_product_repository::CachedProductRepository;
pub use local_media_fetcher::LocalMediaFilesFetcher;
pub use notification_center::{InMemoryNotificationCenter, ProductNotice, UploadProgress};
