use tokio::sync::broadcast;

use crate::modules::uploads::domain::{Event, ProductId, Work};

/// What the coordinator needs from the worker: a sink for work and a source of events
pub trait UploadWorker: Send + Sync {
    /// Queue work; returns immediately, results arrive as events
    fn enqueue_work(&self, work: Work);

    /// Drop queued and running work of a product; cancelled work emits no events
    fn cancel_work(&self, product_id: ProductId);

    fn subscribe(&self) -> broadcast::Receiver<Event>;
}
