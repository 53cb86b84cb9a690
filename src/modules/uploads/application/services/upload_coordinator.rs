/// Coordinator tracking every product image upload in flight
///
/// The coordinator owns the list of upload records, turns the worker's
/// events into record updates and follow-up work, and exposes streams the UI
/// observes. All record mutations go through the `watch` channel holding the
/// list, so observers always see a whole, consistent list.
use dashmap::DashMap;
use futures::stream::{self, Stream, StreamExt};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::modules::uploads::application::ports::{
    ProductImagesNotificationHandler, UploadWorker,
};
use crate::modules::uploads::domain::{
    Event, FetchedMedia, MediaUploadError, MediaUploadEvent, ProductId, ProductImageUploadData,
    ProductUpdateEvent, RemoteMedia, UploadStatus, Work,
};
use crate::shared::config::UploadConfig;
use crate::shared::errors::AppResult;
use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone)]
struct SuccessfulUpload {
    product_id: ProductId,
    media: RemoteMedia,
}

pub struct MediaUploadCoordinator {
    uploads: watch::Sender<Vec<ProductImageUploadData>>,
    /// Live successful-upload streams per product
    observers: Arc<DashMap<ProductId, usize>>,
    /// Events for the key product are applied to the value product
    reassignments: DashMap<ProductId, ProductId>,
    successful_uploads: broadcast::Sender<SuccessfulUpload>,
    image_changes: broadcast::Sender<ProductId>,
    worker: Arc<dyn UploadWorker>,
    /// Worker subscription taken at construction, consumed by `start`
    worker_events: Mutex<Option<broadcast::Receiver<Event>>>,
    notifications: Arc<dyn ProductImagesNotificationHandler>,
}

impl MediaUploadCoordinator {
    pub fn new(
        worker: Arc<dyn UploadWorker>,
        notifications: Arc<dyn ProductImagesNotificationHandler>,
        config: &UploadConfig,
    ) -> AppResult<Self> {
        config.validate()?;
        let worker_events = worker.subscribe();
        let (uploads, _) = watch::channel(Vec::new());
        let (successful_uploads, _) = broadcast::channel(config.event_channel_capacity);
        let (image_changes, _) = broadcast::channel(config.event_channel_capacity);

        Ok(Self {
            uploads,
            observers: Arc::new(DashMap::new()),
            reassignments: DashMap::new(),
            successful_uploads,
            image_changes,
            worker,
            worker_events: Mutex::new(Some(worker_events)),
            notifications,
        })
    }

    /// Spawn the task reacting to worker events.
    ///
    /// The first call handles every event emitted since construction, up to
    /// the channel capacity. Later calls subscribe afresh. The task ends when
    /// the worker's event channel closes or the coordinator is dropped.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self
            .worker_events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_else(|| self.worker.subscribe());
        let coordinator = Arc::downgrade(self);

        tokio::spawn(async move {
            log_info!("Upload coordinator started");
            loop {
                match events.recv().await {
                    Ok(event) => match coordinator.upgrade() {
                        Some(coordinator) => coordinator.handle_event(event),
                        None => break,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        log_warn!("Upload coordinator lagged, {} worker events lost", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            log_info!("Upload coordinator stopped");
        })
    }

    /// Start tracking `local_uris` for the product and ask the worker to fetch them.
    ///
    /// Uris already in progress are left alone; failed or succeeded ones are
    /// uploaded again.
    pub fn enqueue_upload<I, S>(&self, product_id: ProductId, local_uris: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested: Vec<String> = local_uris.into_iter().map(Into::into).collect();
        self.reassignments.remove(&product_id);

        let mut to_fetch: Vec<String> = Vec::new();
        self.uploads.send_if_modified(|uploads| {
            for local_uri in requested {
                if to_fetch.contains(&local_uri) {
                    continue;
                }
                match uploads
                    .iter_mut()
                    .find(|record| record.matches(product_id, &local_uri))
                {
                    Some(record) if record.upload_status.is_in_progress() => continue,
                    Some(record) => record.upload_status = UploadStatus::InProgress,
                    None => uploads.push(ProductImageUploadData::in_progress(
                        product_id,
                        local_uri.clone(),
                    )),
                }
                to_fetch.push(local_uri);
            }
            !to_fetch.is_empty()
        });

        log_info!(
            "Enqueued {} image uploads for product {}",
            to_fetch.len(),
            product_id
        );

        for local_uri in to_fetch {
            self.worker.enqueue_work(Work::FetchMedia {
                product_id,
                local_uri,
            });
        }
    }

    /// Stop tracking every upload of the product and cancel its work
    pub fn cancel_upload(&self, product_id: ProductId) {
        self.uploads.send_if_modified(|uploads| {
            let before = uploads.len();
            uploads.retain(|record| record.product_id != product_id);
            uploads.len() != before
        });
        self.worker.cancel_work(product_id);
        log_info!("Cancelled image uploads for product {}", product_id);
    }

    /// Forget the failed uploads of the product
    pub fn clear_image_errors(&self, product_id: ProductId) {
        self.uploads.send_if_modified(|uploads| {
            let before = uploads.len();
            uploads.retain(|record| {
                !(record.product_id == product_id && record.upload_status.is_failed())
            });
            uploads.len() != before
        });
        self.notifications
            .remove_upload_failure_notification(product_id);
    }

    /// Move uploads started for a product under creation to its new remote id
    pub fn assign_uploads_to_created_product(&self, product_id: ProductId) {
        let source = ProductId::DEFAULT_ADD_NEW;
        if product_id == source {
            return;
        }

        self.uploads.send_if_modified(|uploads| {
            let existing: Vec<String> = uploads
                .iter()
                .filter(|record| record.product_id == product_id)
                .map(|record| record.local_uri.clone())
                .collect();
            let before = uploads.len();
            let mut moved = false;

            uploads.retain_mut(|record| {
                if record.product_id != source {
                    return true;
                }
                if existing.contains(&record.local_uri) {
                    return false;
                }
                record.product_id = product_id;
                moved = true;
                true
            });

            moved || uploads.len() != before
        });

        self.reassignments.insert(source, product_id);
        log_info!("Assigned pending image uploads to created product {}", product_id);
    }

    /// Local uris of the product's uploads in progress, re-emitted on every change
    pub fn observe_current_uploads(
        &self,
        product_id: ProductId,
    ) -> impl Stream<Item = Vec<String>> + Send + 'static {
        self.observe_uploads(move |uploads| {
            uploads
                .iter()
                .filter(|record| {
                    record.product_id == product_id && record.upload_status.is_in_progress()
                })
                .map(|record| record.local_uri.clone())
                .collect()
        })
    }

    /// Failed uploads of the product, whenever there is at least one
    pub fn observe_current_upload_errors(
        &self,
        product_id: ProductId,
    ) -> impl Stream<Item = Vec<ProductImageUploadData>> + Send + 'static {
        self.observe_uploads(move |uploads| {
            uploads
                .iter()
                .filter(|record| record.product_id == product_id && record.upload_status.is_failed())
                .cloned()
                .collect::<Vec<_>>()
        })
        .filter(|errors| futures::future::ready(!errors.is_empty()))
    }

    /// Media uploaded for the product.
    ///
    /// The product counts as externally observed from this call until the
    /// returned stream is dropped: successful uploads are handed to the
    /// stream instead of being kept for a product update, and failures post
    /// no notification. Uploads that succeeded before the call are replayed
    /// first.
    pub fn observe_successful_uploads(
        &self,
        product_id: ProductId,
    ) -> impl Stream<Item = RemoteMedia> + Send + 'static {
        let live = self.successful_uploads.subscribe();
        let mut replay = Vec::new();

        // Registering under the list lock orders this against UploadSucceeded handling
        self.uploads.send_if_modified(|uploads| {
            *self.observers.entry(product_id).or_insert(0) += 1;

            let before = uploads.len();
            uploads.retain(|record| {
                if record.product_id == product_id {
                    if let Some(media) = record.upload_status.uploaded_media() {
                        replay.push(media.clone());
                        return false;
                    }
                }
                true
            });
            uploads.len() != before
        });
        let guard = ObserverGuard {
            observers: self.observers.clone(),
            product_id,
        };

        log_debug!(
            "Observing successful uploads of product {} ({} replayed)",
            product_id,
            replay.len()
        );

        let live = stream::unfold((live, guard), move |(mut live, guard)| async move {
            loop {
                match live.recv().await {
                    Ok(upload) if upload.product_id == product_id => {
                        return Some((upload.media, (live, guard)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        log_warn!(
                            "Successful upload observer of product {} lagged by {}",
                            product_id,
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        });

        stream::iter(replay).chain(live)
    }

    /// Ids of products whose images were updated after an upload batch
    pub fn observe_product_image_changes(&self) -> impl Stream<Item = ProductId> + Send + 'static {
        stream::unfold(self.image_changes.subscribe(), |mut changes| async move {
            loop {
                match changes.recv().await {
                    Ok(product_id) => return Some((product_id, changes)),
                    Err(RecvError::Lagged(skipped)) => {
                        log_warn!("Product image change observer lagged by {}", skipped);
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        })
    }

    pub fn current_uploads(&self) -> Vec<ProductImageUploadData> {
        self.uploads.borrow().clone()
    }

    pub fn uploads_for(&self, product_id: ProductId) -> Vec<ProductImageUploadData> {
        self.uploads
            .borrow()
            .iter()
            .filter(|record| record.product_id == product_id)
            .cloned()
            .collect()
    }

    pub fn is_observed(&self, product_id: ProductId) -> bool {
        self.observers.contains_key(&product_id)
    }

    /// React to one worker event
    pub fn handle_event(&self, event: Event) {
        let event = match self.reassignments.get(&event.product_id()) {
            Some(target) => event.reassigned(*target.value()),
            None => event,
        };
        log_debug!(
            "Handling {} for product {}",
            event.event_type(),
            event.product_id()
        );

        match event {
            Event::MediaUpload(MediaUploadEvent::FetchSucceeded {
                product_id,
                local_uri,
                fetched_media,
            }) => self.on_fetch_succeeded(product_id, local_uri, fetched_media),
            Event::MediaUpload(MediaUploadEvent::FetchFailed {
                product_id,
                local_uri,
                reason,
            }) => {
                let error = MediaUploadError::fetch_failed(reason);
                if !self.set_status(product_id, &local_uri, UploadStatus::Failed { error }) {
                    log_debug!("Fetch failure for untracked {} ignored", local_uri);
                }
            }
            Event::MediaUpload(MediaUploadEvent::UploadSucceeded {
                product_id,
                local_uri,
                media,
            }) => self.on_upload_succeeded(product_id, &local_uri, media),
            Event::MediaUpload(MediaUploadEvent::UploadFailed {
                product_id,
                local_uri,
                error,
            }) => self.on_upload_failed(product_id, &local_uri, error),
            Event::ProductUpdate(ProductUpdateEvent::ProductUpdateSucceeded {
                product_id,
                product,
                image_count,
            }) => {
                self.notifications
                    .post_update_success_notification(product_id, product, image_count);
                // No receivers just means no product list is open
                let _ = self.image_changes.send(product_id);
            }
            Event::ProductUpdate(ProductUpdateEvent::ProductUpdateFailed {
                product_id,
                product,
            }) => {
                self.notifications
                    .post_update_failure_notification(product_id, product);
            }
            Event::ProductUploadsCompleted { product_id } => {
                self.on_product_uploads_completed(product_id)
            }
        }
    }

    fn on_fetch_succeeded(
        &self,
        product_id: ProductId,
        local_uri: String,
        fetched_media: FetchedMedia,
    ) {
        let tracked = self.uploads.borrow().iter().any(|record| {
            record.matches(product_id, &local_uri) && record.upload_status.is_in_progress()
        });
        if !tracked {
            log_debug!("Fetched media {} is no longer tracked, skipping upload", local_uri);
            return;
        }

        self.worker.enqueue_work(Work::UploadMedia {
            product_id,
            local_uri,
            fetched_media,
        });
    }

    fn on_upload_succeeded(&self, product_id: ProductId, local_uri: &str, media: RemoteMedia) {
        let mut hand_over = false;
        let tracked = self.uploads.send_if_modified(|uploads| {
            let Some(index) = uploads
                .iter()
                .position(|record| record.matches(product_id, local_uri))
            else {
                return false;
            };

            if self.is_observed(product_id) {
                uploads.remove(index);
                hand_over = true;
            } else {
                uploads[index].upload_status = UploadStatus::UploadSuccess {
                    media: media.clone(),
                };
            }
            true
        });

        if !tracked {
            log_debug!("Upload of untracked {} ignored", local_uri);
        } else if hand_over {
            let _ = self.successful_uploads.send(SuccessfulUpload { product_id, media });
        }
    }

    fn on_upload_failed(&self, product_id: ProductId, local_uri: &str, error: MediaUploadError) {
        log_warn!(
            "Image upload {} for product {} failed: {}",
            local_uri,
            product_id,
            error
        );
        if !self.set_status(product_id, local_uri, UploadStatus::Failed { error }) {
            return;
        }

        if !self.is_observed(product_id) {
            let error_count = self
                .uploads
                .borrow()
                .iter()
                .filter(|record| record.product_id == product_id && record.upload_status.is_failed())
                .count();
            self.notifications
                .post_upload_failure_notification(product_id, error_count);
        }
    }

    fn on_product_uploads_completed(&self, product_id: ProductId) {
        let mut uploaded_media = Vec::new();
        self.uploads.send_if_modified(|uploads| {
            let still_uploading = uploads.iter().any(|record| {
                record.product_id == product_id && record.upload_status.is_in_progress()
            });
            if still_uploading {
                return false;
            }

            uploaded_media = uploads
                .iter()
                .filter(|record| record.product_id == product_id)
                .filter_map(|record| record.upload_status.uploaded_media().cloned())
                .collect();
            if uploaded_media.is_empty() {
                return false;
            }

            uploads.retain(|record| {
                !(record.product_id == product_id && record.upload_status.uploaded_media().is_some())
            });
            true
        });

        if uploaded_media.is_empty() {
            log_debug!("No uploaded media to attach to product {}", product_id);
            return;
        }

        log_info!(
            "Attaching {} uploaded images to product {}",
            uploaded_media.len(),
            product_id
        );
        self.worker.enqueue_work(Work::UpdateProduct {
            product_id,
            uploaded_media,
        });
    }

    fn set_status(&self, product_id: ProductId, local_uri: &str, status: UploadStatus) -> bool {
        self.uploads.send_if_modified(|uploads| {
            match uploads
                .iter_mut()
                .find(|record| record.matches(product_id, local_uri))
            {
                Some(record) => {
                    record.upload_status = status;
                    true
                }
                None => false,
            }
        })
    }

    fn observe_uploads<T, F>(&self, project: F) -> impl Stream<Item = T> + Send + 'static
    where
        T: Send + 'static,
        F: Fn(&[ProductImageUploadData]) -> T + Send + 'static,
    {
        let receiver = self.uploads.subscribe();
        stream::unfold(
            (receiver, true, project),
            |(mut receiver, first, project)| async move {
                if !first && receiver.changed().await.is_err() {
                    return None;
                }
                let value = {
                    let uploads = receiver.borrow_and_update();
                    project(&uploads)
                };
                Some((value, (receiver, false, project)))
            },
        )
    }
}

/// Keeps a product marked as externally observed while alive
struct ObserverGuard {
    observers: Arc<DashMap<ProductId, usize>>,
    product_id: ProductId,
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        let remaining = match self.observers.get_mut(&self.product_id) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            self.observers
                .remove_if(&self.product_id, |_, count| *count == 0);
        }
    }
}
