/// Background worker executing product image work items
///
/// Each queued item runs on its own tokio task; a semaphore bounds how many
/// run at once. Results are broadcast as `Event`s, which the coordinator
/// consumes. The host keep-alive service runs while any work is pending and
/// is stopped once the worker has been idle for the configured delay.
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::modules::uploads::application::ports::{
    MediaFilesRepository, ProductImagesNotificationHandler, ProductRepository, UploadResult,
    UploadServiceController, UploadWorker,
};
use crate::modules::uploads::domain::{
    Event, FetchedMedia, MediaUploadError, MediaUploadEvent, ProductId, ProductUpdateEvent,
    RemoteMedia, Work,
};
use crate::shared::config::UploadConfig;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::{LogContext, RetryConfig, RetryUtil, TimedOperation};
use crate::{log_debug, log_info, log_warn};

pub struct ProductImagesUploadWorker {
    inner: Arc<WorkerInner>,
    runtime: Handle,
}

/// Cancellation handle shared by a product's queued and running work
struct ProductWork {
    id: u64,
    token: CancellationToken,
    live: usize,
}

struct WorkerInner {
    events: broadcast::Sender<Event>,
    media_repository: Arc<dyn MediaFilesRepository>,
    product_repository: Arc<dyn ProductRepository>,
    notifications: Arc<dyn ProductImagesNotificationHandler>,
    service: Arc<dyn UploadServiceController>,
    permits: Semaphore,
    cancellations: DashMap<ProductId, ProductWork>,
    next_work_id: AtomicU64,
    /// Fetches and uploads queued or running per product
    pending_media: DashMap<ProductId, usize>,
    active_work: AtomicUsize,
    idle_generation: AtomicU64,
    service_running: AtomicBool,
    /// Held while the busy/idle state and the host service are changed together
    lifecycle: Mutex<()>,
    uploads_total: AtomicUsize,
    uploads_started: AtomicUsize,
    config: UploadConfig,
}

impl ProductImagesUploadWorker {
    /// Create a worker bound to the current tokio runtime
    pub fn new(
        media_repository: Arc<dyn MediaFilesRepository>,
        product_repository: Arc<dyn ProductRepository>,
        notifications: Arc<dyn ProductImagesNotificationHandler>,
        service: Arc<dyn UploadServiceController>,
        config: UploadConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            AppError::InternalError(format!("Upload worker needs a tokio runtime: {}", e))
        })?;
        let (events, _) = broadcast::channel(config.event_channel_capacity);

        Ok(Self {
            inner: Arc::new(WorkerInner {
                events,
                media_repository,
                product_repository,
                notifications,
                service,
                permits: Semaphore::new(config.max_concurrent_uploads),
                cancellations: DashMap::new(),
                next_work_id: AtomicU64::new(0),
                pending_media: DashMap::new(),
                active_work: AtomicUsize::new(0),
                idle_generation: AtomicU64::new(0),
                service_running: AtomicBool::new(false),
                lifecycle: Mutex::new(()),
                uploads_total: AtomicUsize::new(0),
                uploads_started: AtomicUsize::new(0),
                config,
            }),
            runtime,
        })
    }

    /// Number of work items queued or running
    pub fn pending_work(&self) -> usize {
        self.inner.active_work.load(Ordering::SeqCst)
    }

    /// Products with queued or running work
    pub fn tracked_products(&self) -> usize {
        self.inner.cancellations.len()
    }

    pub fn is_service_running(&self) -> bool {
        self.inner.service_running.load(Ordering::SeqCst)
    }
}

impl UploadWorker for ProductImagesUploadWorker {
    fn enqueue_work(&self, work: Work) {
        let inner = self.inner.clone();
        inner.work_enqueued(&work);

        let (work_id, token) = inner.track(work.product_id());
        self.runtime.spawn(inner.execute(work, work_id, token));
    }

    fn cancel_work(&self, product_id: ProductId) {
        if let Some((_, tracked)) = self.inner.cancellations.remove(&product_id) {
            tracked.token.cancel();
        }
        self.inner.pending_media.remove(&product_id);
        log_info!("Cancelled pending work for product {}", product_id);
    }

    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }
}

impl WorkerInner {
    fn work_enqueued(&self, work: &Work) {
        if work.is_media_work() {
            *self.pending_media.entry(work.product_id()).or_insert(0) += 1;
        }
        if matches!(work, Work::UploadMedia { .. }) {
            self.uploads_total.fetch_add(1, Ordering::SeqCst);
        }

        {
            let _lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
            if self.active_work.fetch_add(1, Ordering::SeqCst) == 0 {
                // Invalidate any scheduled stop
                self.idle_generation.fetch_add(1, Ordering::SeqCst);
                if !self.service_running.swap(true, Ordering::SeqCst) {
                    log_debug!("Starting upload service");
                    self.service.start_service();
                }
            }
        }
        log_debug!("Queued {}", work);
    }

    /// Join the product's cancellation scope, creating it if needed
    fn track(&self, product_id: ProductId) -> (u64, CancellationToken) {
        let mut tracked = self
            .cancellations
            .entry(product_id)
            .or_insert_with(|| ProductWork {
                id: self.next_work_id.fetch_add(1, Ordering::SeqCst),
                token: CancellationToken::new(),
                live: 0,
            });
        tracked.live += 1;
        (tracked.id, tracked.token.clone())
    }

    /// Leave the cancellation scope `work_id`; the last one out removes it.
    /// A scope replaced by `cancel_work` or a later enqueue is left alone.
    fn untrack(&self, product_id: ProductId, work_id: u64) {
        if let Some(mut tracked) = self.cancellations.get_mut(&product_id) {
            if tracked.id == work_id {
                tracked.live = tracked.live.saturating_sub(1);
            }
        }
        self.cancellations
            .remove_if(&product_id, |_, tracked| tracked.id == work_id && tracked.live == 0);
    }

    async fn execute(self: Arc<Self>, work: Work, work_id: u64, token: CancellationToken) {
        let product_id = work.product_id();
        let kind = work.kind();
        let is_media_work = work.is_media_work();

        let event = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            event = self.process(work) => Some(event),
        };

        match event {
            Some(event) if !token.is_cancelled() => {
                LogContext::work_item(kind, product_id.value(), "finished");
                let fetch_succeeded = matches!(
                    event,
                    Event::MediaUpload(MediaUploadEvent::FetchSucceeded { .. })
                );
                self.emit(event);

                if is_media_work && self.media_work_finished(product_id) && !fetch_succeeded {
                    self.emit(Event::ProductUploadsCompleted { product_id });
                }
            }
            _ => LogContext::work_item(kind, product_id.value(), "cancelled"),
        }

        self.untrack(product_id, work_id);
        self.work_finished();
    }

    async fn process(&self, work: Work) -> Event {
        // The semaphore is never closed
        let _permit = self.permits.acquire().await.ok();

        match work {
            Work::FetchMedia {
                product_id,
                local_uri,
            } => self.fetch_media(product_id, local_uri).await,
            Work::UploadMedia {
                product_id,
                local_uri,
                fetched_media,
            } => self.upload_media(product_id, local_uri, fetched_media).await,
            Work::UpdateProduct {
                product_id,
                uploaded_media,
            } => self.update_product(product_id, uploaded_media).await,
        }
    }

    async fn fetch_media(&self, product_id: ProductId, local_uri: String) -> Event {
        match self.media_repository.fetch_media(&local_uri).await {
            Ok(fetched_media) => Event::MediaUpload(MediaUploadEvent::FetchSucceeded {
                product_id,
                local_uri,
                fetched_media,
            }),
            Err(e) => {
                log_warn!("Fetching {} for product {} failed: {}", local_uri, product_id, e);
                Event::MediaUpload(MediaUploadEvent::FetchFailed {
                    product_id,
                    local_uri,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn upload_media(
        &self,
        product_id: ProductId,
        local_uri: String,
        fetched_media: FetchedMedia,
    ) -> Event {
        let current = self.uploads_started.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.uploads_total.load(Ordering::SeqCst).max(current);
        LogContext::upload_progress(current, total);
        self.notifications.update_upload_notification(current, total);

        let timer = TimedOperation::new(&format!("upload {}", fetched_media.file_name));
        let mut results = self.media_repository.upload_media(product_id, fetched_media);

        while let Some(result) = results.next().await {
            match result {
                UploadResult::Progress(progress) => self.notifications.set_progress(progress),
                UploadResult::Success(media) => {
                    timer.finish_with_info(&format!("media {}", media.media_id));
                    return Event::MediaUpload(MediaUploadEvent::UploadSucceeded {
                        product_id,
                        local_uri,
                        media,
                    });
                }
                UploadResult::Failure(error) => {
                    timer.finish_with_info("failed");
                    return Event::MediaUpload(MediaUploadEvent::UploadFailed {
                        product_id,
                        local_uri,
                        error,
                    });
                }
            }
        }

        timer.finish_with_info("no result");
        Event::MediaUpload(MediaUploadEvent::UploadFailed {
            product_id,
            local_uri,
            error: MediaUploadError::generic("Upload ended without a result"),
        })
    }

    async fn update_product(&self, product_id: ProductId, uploaded_media: Vec<RemoteMedia>) -> Event {
        let timer = TimedOperation::new(&format!("update product {}", product_id));
        let retry = RetryConfig::product_update(
            self.config.product_update_retries,
            self.config.retry_base_delay,
        );
        let repository = &self.product_repository;

        let loaded = RetryUtil::with_retry(
            || async move {
                match repository.fetch_product_or_load_from_cache(product_id).await? {
                    Some(product) => Ok(product),
                    None => Err(AppError::ProductUpdateError(format!(
                        "Product {} could not be loaded",
                        product_id
                    ))),
                }
            },
            &retry,
            "load product",
        )
        .await;

        let product = match loaded {
            Ok(product) => product,
            Err(e) => {
                LogContext::error_with_context(&e, &format!("Loading product {}", product_id));
                timer.finish_with_info("product unavailable");
                return Event::ProductUpdate(ProductUpdateEvent::ProductUpdateFailed {
                    product_id,
                    product: None,
                });
            }
        };

        let updated = product.with_added_images(&uploaded_media);
        let saved = RetryUtil::with_retry(
            || repository.update_product(&updated),
            &retry,
            "update product",
        )
        .await;

        match saved {
            Ok(()) => {
                timer.finish_with_info(&format!("{} images added", uploaded_media.len()));
                Event::ProductUpdate(ProductUpdateEvent::ProductUpdateSucceeded {
                    product_id,
                    product,
                    image_count: uploaded_media.len(),
                })
            }
            Err(e) => {
                LogContext::error_with_context(&e, &format!("Saving images of product {}", product_id));
                timer.finish_with_info("update rejected");
                Event::ProductUpdate(ProductUpdateEvent::ProductUpdateFailed {
                    product_id,
                    product: Some(product),
                })
            }
        }
    }

    fn emit(&self, event: Event) {
        match &event {
            Event::MediaUpload(media_event) => log_debug!(
                "Emitting {} for {} of product {}",
                event.event_type(),
                media_event.local_uri(),
                event.product_id()
            ),
            _ => log_debug!("Emitting {} for product {}", event.event_type(), event.product_id()),
        }
        if self.events.send(event).is_err() {
            log_debug!("No event subscribers, event dropped");
        }
    }

    /// Returns true when the product has no fetch or upload left
    fn media_work_finished(&self, product_id: ProductId) -> bool {
        let remaining = match self.pending_media.get_mut(&product_id) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.pending_media
                .remove_if(&product_id, |_, count| *count == 0);
        }
        remaining == 0
    }

    fn work_finished(self: &Arc<Self>) {
        let Some(generation) = self.mark_idle() else {
            return;
        };
        let worker = self.clone();

        tokio::spawn(async move {
            tokio::time::sleep(worker.config.service_stop_delay).await;
            worker.stop_if_idle(generation);
        });
    }

    /// Count one finished item; returns the idle generation when it was the last
    fn mark_idle(&self) -> Option<u64> {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if self.active_work.fetch_sub(1, Ordering::SeqCst) != 1 {
            return None;
        }

        self.uploads_total.store(0, Ordering::SeqCst);
        self.uploads_started.store(0, Ordering::SeqCst);
        Some(self.idle_generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Stop the host service unless work arrived since `generation` went idle
    fn stop_if_idle(&self, generation: u64) -> bool {
        let _lifecycle = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        let still_idle = self.idle_generation.load(Ordering::SeqCst) == generation
            && self.active_work.load(Ordering::SeqCst) == 0;
        if !still_idle || !self.service_running.swap(false, Ordering::SeqCst) {
            return false;
        }

        log_debug!("Upload worker idle, stopping upload service");
        self.service.stop_service();
        true
    }
}

impl Drop for ProductImagesUploadWorker {
    fn drop(&mut self) {
        let pending = self.inner.active_work.load(Ordering::SeqCst);
        if pending > 0 {
            log_warn!("Upload worker dropped with {} work items pending", pending);
        }
    }
}
