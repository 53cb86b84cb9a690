pub mod media_files_repository;
pub mod notification_handler;
pub mod product_repository;
pub mod service_controller;
pub mod upload_worker;

pub use media_files_repository::{MediaFilesRepository, MediaUploader, UploadResult};
pub use notification_handler::ProductImagesNotificationHandler;
pub use product_repository::ProductRepository;
pub use service_controller::{NoopServiceController, UploadServiceController};
pub use upload_worker::UploadWorker;

#[cfg(test)]
pub use notification_handler::MockProductImagesNotificationHandler;
