pub mod modules;
pub mod shared;

use modules::uploads::{
    MediaFilesRepository, MediaUploadCoordinator, ProductImagesNotificationHandler,
    ProductImagesUploadWorker, ProductRepository, UploadServiceController, UploadWorker,
};
use shared::{AppResult, UploadConfig};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Running upload pipeline: the worker, the coordinator and its event loop
pub struct UploadServices {
    pub worker: Arc<ProductImagesUploadWorker>,
    pub coordinator: Arc<MediaUploadCoordinator>,
    pub event_loop: JoinHandle<()>,
}

impl UploadServices {
    /// Wire the worker and coordinator together and start the event loop.
    /// Must be called from within a tokio runtime.
    pub fn start(
        media_repository: Arc<dyn MediaFilesRepository>,
        product_repository: Arc<dyn ProductRepository>,
        notifications: Arc<dyn ProductImagesNotificationHandler>,
        service: Arc<dyn UploadServiceController>,
        config: UploadConfig,
    ) -> AppResult<Self> {
        let worker = Arc::new(ProductImagesUploadWorker::new(
            media_repository,
            product_repository,
            Arc::clone(&notifications),
            service,
            config.clone(),
        )?);

        let worker_port: Arc<dyn UploadWorker> = worker.clone();
        let coordinator = Arc::new(MediaUploadCoordinator::new(
            worker_port,
            notifications,
            &config,
        )?);
        let event_loop = coordinator.start();

        log_info!(
            "Upload services started (max {} concurrent uploads)",
            config.max_concurrent_uploads
        );

        Ok(Self {
            worker,
            coordinator,
            event_loop,
        })
    }

    /// Stop reacting to worker events; queued work still runs to completion
    pub fn shutdown(self) {
        self.event_loop.abort();
        log_info!("Upload services shut down");
    }
}

/// Load configuration from the environment and start the upload pipeline
pub fn run(
    media_repository: Arc<dyn MediaFilesRepository>,
    product_repository: Arc<dyn ProductRepository>,
    notifications: Arc<dyn ProductImagesNotificationHandler>,
    service: Arc<dyn UploadServiceController>,
) -> AppResult<UploadServices> {
    shared::utils::init_logger();
    shared::utils::init_tracing();
    let config = UploadConfig::from_env()?;
    UploadServices::start(
        media_repository,
        product_repository,
        notifications,
        service,
        config,
    )
}
