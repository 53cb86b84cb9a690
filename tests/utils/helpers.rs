/// Test helper functions and service builders
use super::fakes::{
    CountingServiceController, FakeMediaRepository, FakeProductRepository, RecordingNotifications,
};
use chrono::Utc;
use product_image_uploads::modules::uploads::{
    Event, Product, ProductId, ProductImage, ProductImagesUploadWorker,
};
use product_image_uploads::shared::UploadConfig;
use product_image_uploads::UploadServices;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

pub const WAIT: Duration = Duration::from_secs(5);

pub struct TestServices {
    pub services: UploadServices,
    pub media: Arc<FakeMediaRepository>,
    pub products: Arc<FakeProductRepository>,
    pub notifications: Arc<RecordingNotifications>,
    pub service: Arc<CountingServiceController>,
}

pub struct TestWorker {
    pub worker: ProductImagesUploadWorker,
    pub media: Arc<FakeMediaRepository>,
    pub products: Arc<FakeProductRepository>,
    pub notifications: Arc<RecordingNotifications>,
    pub service: Arc<CountingServiceController>,
}

/// Fast retries and a short service stop delay
pub fn test_config() -> UploadConfig {
    UploadConfig {
        event_channel_capacity: 64,
        max_concurrent_uploads: 3,
        product_update_retries: 3,
        retry_base_delay: Duration::from_millis(1),
        service_stop_delay: Duration::from_millis(200),
    }
}

/// Build the whole pipeline on fakes
pub fn build_test_services(config: UploadConfig) -> TestServices {
    let media = Arc::new(FakeMediaRepository::new());
    let products = Arc::new(FakeProductRepository::new());
    let notifications = Arc::new(RecordingNotifications::new());
    let service = Arc::new(CountingServiceController::default());

    let services = UploadServices::start(
        media.clone(),
        products.clone(),
        notifications.clone(),
        service.clone(),
        config,
    )
    .expect("upload services should start");

    TestServices {
        services,
        media,
        products,
        notifications,
        service,
    }
}

/// Build a worker without a coordinator
pub fn build_test_worker(config: UploadConfig) -> TestWorker {
    let media = Arc::new(FakeMediaRepository::new());
    let products = Arc::new(FakeProductRepository::new());
    let notifications = Arc::new(RecordingNotifications::new());
    let service = Arc::new(CountingServiceController::default());

    let worker = ProductImagesUploadWorker::new(
        media.clone(),
        products.clone(),
        notifications.clone(),
        service.clone(),
        config,
    )
    .expect("worker should build");

    TestWorker {
        worker,
        media,
        products,
        notifications,
        service,
    }
}

pub fn product(id: i64, name: &str) -> Product {
    Product {
        id: ProductId(id),
        name: name.to_string(),
        images: vec![ProductImage {
            id: 1,
            name: "existing.jpg".to_string(),
            source: "https://shop.example/wp-content/uploads/existing.jpg".to_string(),
            date_created: Utc::now(),
        }],
    }
}

/// Next worker event, failing the test after `WAIT`
pub async fn next_event(events: &mut broadcast::Receiver<Event>) -> Event {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a worker event")
        .expect("worker event channel closed")
}

/// Events received within `window`
pub async fn drain_events(events: &mut broadcast::Receiver<Event>, window: Duration) -> Vec<Event> {
    let mut received = Vec::new();
    while let Ok(Ok(event)) = tokio::time::timeout(window, events.recv()).await {
        received.push(event);
    }
    received
}

/// Poll `condition` until it holds, failing the test after `WAIT`
pub async fn wait_until<F>(description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + WAIT;
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting until {}", description);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Await `future`, failing the test after `WAIT`
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(WAIT, future)
        .await
        .expect("timed out")
}
