use log::{debug, error, info};
use std::sync::Once;

static INIT: Once = Once::new();
static INIT_TRACING: Once = Once::new();

/// Initialize the logging system
/// This should be called once at application startup
pub fn init_logger() {
    INIT.call_once(|| {
        let initialized = env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info) // Default level
            .filter_module("product_image_uploads", log::LevelFilter::Debug)
            .filter_module("tokio", log::LevelFilter::Warn) // Reduce tokio noise
            .format_timestamp_secs()
            .format_target(false)
            .format_module_path(false)
            .try_init()
            .is_ok();

        if initialized {
            info!("Logging system initialized");
        }
    });
}

/// Install a fmt subscriber for the `tracing` events emitted by infrastructure adapters
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_target(false)
            .try_init();
    });
}

/// Macro for structured logging with context
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

/// Structured logging helpers for common patterns
pub struct LogContext;

impl LogContext {
    /// Log a work item entering or leaving the worker
    pub fn work_item(kind: &str, product_id: i64, status: &str) {
        debug!("Work: {} for product {} {}", kind, product_id, status);
    }

    /// Log batch progress of media uploads
    pub fn upload_progress(current: usize, total: usize) {
        info!("Uploads: [{}/{}] in progress", current, total);
    }

    /// Log errors with context
    pub fn error_with_context(error: &dyn std::error::Error, context: &str) {
        error!("{}: {}", context, error);
    }

    /// Log how long an upload or product update took
    pub fn performance_metric(operation: &str, duration_ms: u64, outcome: &str) {
        info!("Performance: {} took {}ms ({})", operation, duration_ms, outcome);
    }
}

/// Helper for timing operations
pub struct TimedOperation {
    start: std::time::Instant,
    operation: String,
}

impl TimedOperation {
    pub fn new(operation: &str) -> Self {
        debug!("Starting: {}", operation);
        Self {
            start: std::time::Instant::now(),
            operation: operation.to_string(),
        }
    }

    /// Log the elapsed time with the operation's outcome
    pub fn finish_with_info(self, outcome: &str) -> u64 {
        let duration = self.start.elapsed().as_millis() as u64;
        LogContext::performance_metric(&self.operation, duration, outcome);
        duration
    }
}
