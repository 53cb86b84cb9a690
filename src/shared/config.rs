use crate::log_info;
use crate::shared::errors::{AppError, AppResult};
use std::env;
use std::time::Duration;

const EVENT_CHANNEL_CAPACITY: &str = "UPLOADS_EVENT_CHANNEL_CAPACITY";
const MAX_CONCURRENT: &str = "UPLOADS_MAX_CONCURRENT";
const PRODUCT_UPDATE_RETRIES: &str = "UPLOADS_PRODUCT_UPDATE_RETRIES";
const RETRY_BASE_DELAY_MS: &str = "UPLOADS_RETRY_BASE_DELAY_MS";
const SERVICE_STOP_DELAY_MS: &str = "UPLOADS_SERVICE_STOP_DELAY_MS";

/// Runtime settings of the upload worker and coordinator
#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    /// Capacity of the worker's event broadcast channel
    pub event_channel_capacity: usize,
    /// Media items fetched or uploaded in parallel
    pub max_concurrent_uploads: usize,
    /// Attempts for loading and saving a product after its images uploaded
    pub product_update_retries: u32,
    pub retry_base_delay: Duration,
    /// Idle time before the host keep-alive service is stopped
    pub service_stop_delay: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 256,
            max_concurrent_uploads: 3,
            product_update_retries: 3,
            retry_base_delay: Duration::from_millis(500),
            service_stop_delay: Duration::from_millis(1000),
        }
    }
}

impl UploadConfig {
    /// Load settings from the environment (and a `.env` file if present),
    /// falling back to defaults for unset variables
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;

        log_info!(
            "Upload config: {} concurrent uploads, {} product update attempts, event buffer {}",
            config.max_concurrent_uploads,
            config.product_update_retries,
            config.event_channel_capacity
        );

        Ok(config)
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            event_channel_capacity: parse_or(
                &lookup,
                EVENT_CHANNEL_CAPACITY,
                defaults.event_channel_capacity,
            )?,
            max_concurrent_uploads: parse_or(
                &lookup,
                MAX_CONCURRENT,
                defaults.max_concurrent_uploads,
            )?,
            product_update_retries: parse_or(
                &lookup,
                PRODUCT_UPDATE_RETRIES,
                defaults.product_update_retries,
            )?,
            retry_base_delay: Duration::from_millis(parse_or(
                &lookup,
                RETRY_BASE_DELAY_MS,
                defaults.retry_base_delay.as_millis() as u64,
            )?),
            service_stop_delay: Duration::from_millis(parse_or(
                &lookup,
                SERVICE_STOP_DELAY_MS,
                defaults.service_stop_delay.as_millis() as u64,
            )?),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.event_channel_capacity == 0 {
            return Err(AppError::ConfigError(format!(
                "{} must be greater than zero",
                EVENT_CHANNEL_CAPACITY
            )));
        }
        if self.max_concurrent_uploads == 0 {
            return Err(AppError::ConfigError(format!(
                "{} must be greater than zero",
                MAX_CONCURRENT
            )));
        }
        if self.product_update_retries == 0 {
            return Err(AppError::ConfigError(format!(
                "{} must be greater than zero",
                PRODUCT_UPDATE_RETRIES
            )));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::ConfigError(format!("Invalid value for {}: {}", key, e))),
        None => Ok(default),
    }
}
