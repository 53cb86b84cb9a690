// Shared kernel used by every module

pub mod config; // Environment-driven settings
pub mod errors; // Shared error types
pub mod utils; // Logging and retry helpers

pub use config::UploadConfig;
pub use errors::{AppError, AppResult};
