/// In-memory stand-ins for the backend, the notification UI and the host service
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use product_image_uploads::modules::uploads::{
    FetchedMedia, MediaFilesRepository, MediaUploadError, Product, ProductId,
    ProductImagesNotificationHandler, ProductRepository, RemoteMedia, UploadResult,
    UploadServiceController,
};
use product_image_uploads::shared::{AppError, AppResult};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

// ================================================================================================
// MEDIA
// ================================================================================================

#[derive(Default)]
pub struct FakeMediaRepository {
    failing_fetches: Mutex<HashSet<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    unfinished_uploads: Mutex<HashSet<String>>,
    /// When set, each upload waits for a permit before finishing
    gate: Mutex<Option<Arc<Semaphore>>>,
    next_media_id: AtomicI64,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    uploads_started: AtomicUsize,
}

impl FakeMediaRepository {
    pub fn new() -> Self {
        Self {
            next_media_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    pub fn fail_fetch(&self, local_uri: &str) {
        self.failing_fetches
            .lock()
            .unwrap()
            .insert(local_uri.to_string());
    }

    pub fn fail_upload(&self, local_uri: &str) {
        self.failing_uploads
            .lock()
            .unwrap()
            .insert(local_uri.to_string());
    }

    /// The upload stream of `local_uri` ends without a terminal result
    pub fn leave_upload_unfinished(&self, local_uri: &str) {
        self.unfinished_uploads
            .lock()
            .unwrap()
            .insert(local_uri.to_string());
    }

    /// Hold every upload until permits are added to the returned semaphore
    pub fn gate_uploads(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn uploads_started(&self) -> usize {
        self.uploads_started.load(Ordering::SeqCst)
    }
}

pub fn fetched(local_uri: &str) -> FetchedMedia {
    let file_name = local_uri
        .rsplit('/')
        .next()
        .unwrap_or(local_uri)
        .to_string();
    FetchedMedia {
        local_uri: local_uri.to_string(),
        path: PathBuf::from(local_uri.trim_start_matches("file://")),
        mime_type: "image/jpeg".to_string(),
        size_bytes: 2048,
        file_name,
    }
}

#[async_trait]
impl MediaFilesRepository for FakeMediaRepository {
    async fn fetch_media(&self, local_uri: &str) -> AppResult<FetchedMedia> {
        if self.failing_fetches.lock().unwrap().contains(local_uri) {
            return Err(AppError::MediaFetchError(format!("{} is gone", local_uri)));
        }
        Ok(fetched(local_uri))
    }

    fn upload_media(
        &self,
        _product_id: ProductId,
        media: FetchedMedia,
    ) -> BoxStream<'static, UploadResult> {
        self.uploads_started.fetch_add(1, Ordering::SeqCst);
        let fails = self.failing_uploads.lock().unwrap().contains(&media.local_uri);
        let unfinished = self
            .unfinished_uploads
            .lock()
            .unwrap()
            .contains(&media.local_uri);
        let gate = self.gate.lock().unwrap().clone();
        let media_id = self.next_media_id.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.clone();
        let max_in_flight = self.max_in_flight.clone();

        let finish = stream::once(async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(gate) = gate {
                gate.acquire().await.unwrap().forget();
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);

            if fails {
                Some(UploadResult::Failure(MediaUploadError::generic(
                    "server rejected the file",
                )))
            } else if unfinished {
                None
            } else {
                Some(UploadResult::Success(RemoteMedia {
                    media_id,
                    url: format!("https://shop.example/wp-content/uploads/{}", media.file_name),
                    file_name: media.file_name,
                    mime_type: media.mime_type,
                    uploaded_at: Utc::now(),
                }))
            }
        })
        .filter_map(futures::future::ready);

        stream::iter(vec![UploadResult::Progress(0.5)])
            .chain(finish)
            .boxed()
    }
}

// ================================================================================================
// PRODUCTS
// ================================================================================================

#[derive(Default)]
pub struct FakeProductRepository {
    products: Mutex<HashMap<ProductId, Product>>,
    failing_loads: AtomicUsize,
    reject_updates: AtomicBool,
    load_calls: AtomicUsize,
    updates: Mutex<Vec<Product>>,
}

impl FakeProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }

    pub fn get(&self, product_id: ProductId) -> Option<Product> {
        self.products.lock().unwrap().get(&product_id).cloned()
    }

    /// The next `times` loads fail with a transient error
    pub fn fail_loads(&self, times: usize) {
        self.failing_loads.store(times, Ordering::SeqCst);
    }

    pub fn reject_updates(&self) {
        self.reject_updates.store(true, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<Product> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProductRepository for FakeProductRepository {
    async fn fetch_product_or_load_from_cache(
        &self,
        product_id: ProductId,
    ) -> AppResult<Option<Product>> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::ExternalServiceError("store unreachable".to_string()));
        }
        Ok(self.get(product_id))
    }

    async fn update_product(&self, product: &Product) -> AppResult<()> {
        if self.reject_updates.load(Ordering::SeqCst) {
            return Err(AppError::ProductUpdateError("update rejected".to_string()));
        }
        self.updates.lock().unwrap().push(product.clone());
        self.insert(product.clone());
        Ok(())
    }
}

// ================================================================================================
// NOTIFICATIONS
// ================================================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    UploadFailure { product_id: ProductId, error_count: usize },
    UploadFailureRemoved { product_id: ProductId },
    UpdateFailure { product_id: ProductId, has_product: bool },
    UpdateSuccess { product_id: ProductId, image_count: usize },
    UploadProgress { current: usize, total: usize },
}

#[derive(Default)]
pub struct RecordingNotifications {
    calls: Mutex<Vec<Notification>>,
    progress_updates: AtomicUsize,
}

impl RecordingNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Notification> {
        self.calls.lock().unwrap().clone()
    }

    pub fn progress_updates(&self) -> usize {
        self.progress_updates.load(Ordering::SeqCst)
    }

    fn record(&self, notification: Notification) {
        self.calls.lock().unwrap().push(notification);
    }
}

impl ProductImagesNotificationHandler for RecordingNotifications {
    fn post_upload_failure_notification(&self, product_id: ProductId, error_count: usize) {
        self.record(Notification::UploadFailure {
            product_id,
            error_count,
        });
    }

    fn remove_upload_failure_notification(&self, product_id: ProductId) {
        self.record(Notification::UploadFailureRemoved { product_id });
    }

    fn post_update_failure_notification(&self, product_id: ProductId, product: Option<Product>) {
        self.record(Notification::UpdateFailure {
            product_id,
            has_product: product.is_some(),
        });
    }

    fn post_update_success_notification(
        &self,
        product_id: ProductId,
        _product: Product,
        image_count: usize,
    ) {
        self.record(Notification::UpdateSuccess {
            product_id,
            image_count,
        });
    }

    fn update_upload_notification(&self, current: usize, total: usize) {
        self.record(Notification::UploadProgress { current, total });
    }

    fn set_progress(&self, _progress: f32) {
        self.progress_updates.fetch_add(1, Ordering::SeqCst);
    }
}

// ================================================================================================
// HOST SERVICE
// ================================================================================================

#[derive(Default)]
pub struct CountingServiceController {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl CountingServiceController {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl UploadServiceController for CountingServiceController {
    fn start_service(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn stop_service(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}
