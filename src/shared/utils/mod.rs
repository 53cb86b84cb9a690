pub mod logger;
pub mod retry;

pub use logger::{init_logger, init_tracing, LogContext, TimedOperation};
pub use retry::{RetryConfig, RetryUtil};
