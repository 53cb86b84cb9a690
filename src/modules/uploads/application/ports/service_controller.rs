/// Port for the host's keep-alive service that runs while uploads are pending
pub trait UploadServiceController: Send + Sync {
    fn start_service(&self);

    fn stop_service(&self);
}

/// Controller for hosts without a keep-alive service
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopServiceController;

impl UploadServiceController for NoopServiceController {
    fn start_service(&self) {}

    fn stop_service(&self) {}
}
