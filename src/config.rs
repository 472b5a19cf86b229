//! Guard configuration

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay between attachment attempts (milliseconds)
const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Configuration for the wallet guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GuardConfig {
    /// Origin of the page being guarded, forwarded to the confirmation authority
    pub origin: String,

    /// Delay between attempts to attach to the provider
    pub poll_interval_ms: u64,

    /// Optional limit on how long a call waits for a verdict (milliseconds).
    /// `None` waits indefinitely.
    pub confirmation_timeout_ms: Option<u64>,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            origin: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            confirmation_timeout_ms: None,
        }
    }
}

impl GuardConfig {
    /// Create a config for the given page origin
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Default::default()
        }
    }

    /// Load overrides from `A3S_GUARD_*` environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(origin) = std::env::var("A3S_GUARD_ORIGIN") {
            config.origin = origin;
        }
        if let Ok(raw) = std::env::var("A3S_GUARD_POLL_INTERVAL_MS") {
            config.poll_interval_ms = raw.parse().map_err(|e| {
                GuardError::Config(format!("A3S_GUARD_POLL_INTERVAL_MS='{}': {}", raw, e))
            })?;
        }
        if let Ok(raw) = std::env::var("A3S_GUARD_CONFIRMATION_TIMEOUT_MS") {
            let ms = raw.parse().map_err(|e| {
                GuardError::Config(format!("A3S_GUARD_CONFIRMATION_TIMEOUT_MS='{}': {}", raw, e))
            })?;
            config.confirmation_timeout_ms = Some(ms);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the poll interval
    ///
    /// Non-zero intervals shorter than a millisecond round up to one.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = whole_millis(interval);
        self
    }

    /// Set a confirmation timeout
    ///
    /// Non-zero timeouts shorter than a millisecond round up to one.
    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout_ms = Some(whole_millis(timeout));
        self
    }

    /// Check the config for values the guard cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(GuardError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.confirmation_timeout_ms == Some(0) {
            return Err(GuardError::Config(
                "confirmation_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll interval as a `Duration`
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Confirmation timeout as a `Duration`
    pub fn confirmation_timeout(&self) -> Option<Duration> {
        self.confirmation_timeout_ms.map(Duration::from_millis)
    }
}

fn whole_millis(duration: Duration) -> u64 {
    if duration.is_zero() {
        return 0;
    }
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX).max(1)
}
