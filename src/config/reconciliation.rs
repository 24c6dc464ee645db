//! Reconciliation tuning

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Settings for the allocation retry loop.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Attempts before a contested allocation is given up
    #[serde(default = "default_max_attempts")]
    pub max_allocation_attempts: u32,

    /// Base backoff between attempts; attempt n waits n times this
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ms: u64,
}

impl ReconciliationConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_allocation_attempts == 0 || self.max_allocation_attempts > 20 {
            return Err(ValidationError::InvalidAllocationAttempts);
        }
        if self.retry_backoff_ms > 5_000 {
            return Err(ValidationError::InvalidRetryBackoff);
        }
        Ok(())
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            max_allocation_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_backoff() -> u64 {
    25
}
