pub mod upload_coordinator;
pub mod upload_worker;

pub use upload_coordinator::MediaUploadCoordinator;
pub use upload_worker::ProductImagesUploadWorker;
