/// Product image uploads module
///
/// Tracks local images on their way to becoming product images:
/// - Domain: upload records, worker work items and events
/// - Application: ports for the backend and notifications, the upload
///   coordinator and the background worker
/// - Infrastructure: local file fetcher, product cache, in-memory notifications
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-exports for easy access
pub use application::ports::{
    MediaFilesRepository, MediaUploader, NoopServiceController, ProductImagesNotificationHandler,
    ProductRepository, UploadResult, UploadServiceController, UploadWorker,
};
pub use application::{MediaUploadCoordinator, ProductImagesUploadWorker};
pub use domain::{
    Event, FetchedMedia, MediaErrorType, MediaUploadError, MediaUploadEvent, Product, ProductId,
    ProductImage, ProductImageUploadData, ProductUpdateEvent, RemoteMedia, UploadStatus, Work,
};
pub use infrastructure::{
    CachedProductRepository, InMemoryNotificationCenter, LocalMediaFilesFetcher,
};
