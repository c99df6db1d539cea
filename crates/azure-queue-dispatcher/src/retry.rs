//! Retry options for the storage request pipeline.
//!
//! The pipeline uses a fixed-interval ("linear") policy: every retry waits
//! the same delay, and each individual try is bounded by its own timeout.

use std::time::Duration;

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;

/// Default maximum number of tries, including the first one
pub const DEFAULT_MAX_TRIES: u32 = 4;

/// Default delay between tries
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(4000);

/// Per-try timeout is the retry delay minus this margin
const TRY_TIMEOUT_MARGIN: Duration = Duration::from_millis(1000);

/// Lower bound for a derived per-try timeout
const MIN_TRY_TIMEOUT: Duration = Duration::from_millis(1000);

/// Fixed-interval retry options applied to every queue request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOptions {
    /// Maximum number of tries, including the first one
    pub max_tries: u32,

    /// Delay between consecutive tries
    pub retry_delay: Duration,

    /// Timeout for a single try
    pub try_timeout: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self::fixed(DEFAULT_MAX_TRIES, DEFAULT_RETRY_DELAY)
    }
}

impl RetryOptions {
    /// Fixed-interval options with the try timeout derived from the delay
    pub fn fixed(max_tries: u32, retry_delay: Duration) -> Self {
        Self {
            max_tries: max_tries.max(1),
            retry_delay,
            try_timeout: derive_try_timeout(retry_delay),
        }
    }

    /// Override the per-try timeout
    pub fn with_try_timeout(mut self, try_timeout: Duration) -> Self {
        self.try_timeout = try_timeout;
        self
    }

    /// Check if another try should be made after `attempt` tries (1-indexed)
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_tries
    }
}

fn derive_try_timeout(retry_delay: Duration) -> Duration {
    retry_delay
        .checked_sub(TRY_TIMEOUT_MARGIN)
        .unwrap_or_default()
        .max(MIN_TRY_TIMEOUT)
}
