//! # SDK configuration
//!
//! Tunables of the scheduling and setting layers. Every field has a default so a partial JSON document, or
//! none at all, is a valid configuration:
//!
//! ```
//! # use groundsdk_core::SdkConfig;
//! let config = SdkConfig::from_json(r#"{ "setting_timeout_ms": 2000 }"#).unwrap();
//! assert_eq!(config.setting_timeout().as_millis(), 2000);
//! assert_eq!(config.worker_keep_alive().as_secs(), 60);
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default delay before an unconfirmed setting change is rolled back.
pub const DEFAULT_SETTING_TIMEOUT_MS: u64 = 5000;

/// Default lifetime of an idle background worker thread.
pub const DEFAULT_WORKER_KEEP_ALIVE_MS: u64 = 60_000;

/// Default background worker thread name prefix.
pub const DEFAULT_WORKER_NAME_PREFIX: &str = "groundsdk-bg";

/// # SDK configuration
///
/// See the [config module documentation](crate::config) for more context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    /// Delay, in milliseconds, before an unconfirmed setting change is rolled back. `0` disables rollback timeouts.
    pub setting_timeout_ms: u64,
    /// Delay, in milliseconds, after which an idle background worker thread exits.
    pub worker_keep_alive_ms: u64,
    /// Name prefix of background worker threads.
    pub worker_name_prefix: String,
    /// Maximum number of background worker threads, `0` for unbounded growth.
    pub max_workers: usize,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            setting_timeout_ms: DEFAULT_SETTING_TIMEOUT_MS,
            worker_keep_alive_ms: DEFAULT_WORKER_KEEP_ALIVE_MS,
            worker_name_prefix: DEFAULT_WORKER_NAME_PREFIX.to_owned(),
            max_workers: 0,
        }
    }
}

impl SdkConfig {
    /// Parse and validate a configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SdkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that cannot be honoured.
    pub fn validate(&self) -> Result<()> {
        if self.worker_name_prefix.trim().is_empty() {
            return Err(Error::Config("worker_name_prefix must not be empty".to_owned()));
        }
        Ok(())
    }

    /// Setting rollback timeout. [Duration::ZERO] means rollbacks never fire on their own.
    pub fn setting_timeout(&self) -> Duration {
        Duration::from_millis(self.setting_timeout_ms)
    }

    /// Idle background worker lifetime.
    pub fn worker_keep_alive(&self) -> Duration {
        Duration::from_millis(self.worker_keep_alive_ms)
    }
}
