//! Tunables for the session client and the two pipeline stages.

use std::time::Duration;

/// Default cap on simultaneous in-flight requests across the whole session.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 10;

/// Default size of the page-fetch pool.
pub const DEFAULT_PAGE_WORKERS: usize = 2;

/// Default size of the detail-fetch pool.
pub const DEFAULT_RESOLVE_WORKERS: usize = 10;

/// Default capacity of both pipeline queues.
pub const DEFAULT_QUEUE_CAPACITY: usize = 500;

/// Default retry budget for listing and detail page fetches.
pub const DEFAULT_PAGE_RETRIES: u32 = 5;

/// Default retry budget for the logged-in probe.
pub const DEFAULT_LOGIN_CHECK_RETRIES: u32 = 2;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
const MAX_TIMEOUT_SECS: u64 = 3600;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A pool size or queue capacity was zero.
    #[error("invalid value for `{field}`: must be at least 1")]
    Zero {
        /// Offending field.
        field: &'static str,
    },

    /// A timeout was outside 1..=3600 seconds.
    #[error("invalid value for `{field}`: {value}. Expected range: 1..={MAX_TIMEOUT_SECS}")]
    Timeout {
        /// Offending field.
        field: &'static str,
        /// Rejected value.
        value: u64,
    },
}

/// Complete harvest configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestConfig {
    /// Transport-wide permit pool size.
    pub max_in_flight: usize,
    /// Page-fetch pool size used by the ID harvester.
    pub page_workers: usize,
    /// Detail-fetch pool size used by the metadata resolver.
    pub resolve_workers: usize,
    /// Capacity of the identifier and item queues.
    pub queue_capacity: usize,
    /// Retry budget for listing page fetches.
    pub listing_retries: u32,
    /// Retry budget for detail page fetches.
    pub detail_retries: u32,
    /// Retry budget for the logged-in probe.
    pub login_check_retries: u32,
    /// Retry budget for fetching the login token page.
    pub login_token_retries: u32,
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            page_workers: DEFAULT_PAGE_WORKERS,
            resolve_workers: DEFAULT_RESOLVE_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            listing_retries: DEFAULT_PAGE_RETRIES,
            detail_retries: DEFAULT_PAGE_RETRIES,
            login_check_retries: DEFAULT_LOGIN_CHECK_RETRIES,
            login_token_retries: DEFAULT_PAGE_RETRIES,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
        }
    }
}

impl HarvestConfig {
    /// Validates pool sizes, capacity and timeouts.
    ///
    /// # Errors
    ///
    /// Returns the first offending field as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("max_in_flight", self.max_in_flight),
            ("page_workers", self.page_workers),
            ("resolve_workers", self.resolve_workers),
            ("queue_capacity", self.queue_capacity),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        for (field, value) in [
            ("connect_timeout_secs", self.connect_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
        ] {
            if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
                return Err(ConfigError::Timeout { field, value });
            }
        }
        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Read timeout as a [`Duration`].
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}
