//! Rate limiter for preventing brute force sign-in attempts

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of failed attempts allowed within the window
    pub max_failures: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Number of failed attempts in the current window
    failures: u32,
    /// Last failed attempt time
    last_failure: Instant,
    /// Ban expiration time
    ban_expires: Option<Instant>,
}

/// Per-identifier sign-in rate limiter
///
/// Keys are the submitted user code or email, so a brute force against one
/// account is throttled without locking out the rest of the institution.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Rate limiter configuration
    config: RateLimiterConfig,
    /// Rate limiter entries
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Check whether an identifier is currently allowed to attempt a sign-in
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let Some(entry) = entries.get_mut(key) else {
            return true;
        };

        // Check if ban has expired
        if let Some(ban_expires) = entry.ban_expires {
            if now >= ban_expires {
                // Ban expired, reset failures
                entry.failures = 0;
                entry.ban_expires = None;
            } else {
                // Still banned
                return false;
            }
        }

        // Check if window has expired
        if now.duration_since(entry.last_failure) >= Duration::from_secs(self.config.window_seconds)
        {
            // Window expired, reset failures
            entry.failures = 0;
        }

        true
    }

    /// Record a failed sign-in attempt, banning the identifier once it
    /// exceeds the configured failure budget
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            failures: 0,
            last_failure: now,
            ban_expires: None,
        });

        // Check if window has expired
        if now.duration_since(entry.last_failure) >= Duration::from_secs(self.config.window_seconds)
        {
            entry.failures = 0;
        }

        entry.failures += 1;
        entry.last_failure = now;

        if entry.failures >= self.config.max_failures {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Clear an identifier's failure history after a successful sign-in
    pub async fn reset(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_limiter() -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_failures: 3,
            window_seconds: 300,
            ban_duration_seconds: 3600,
        })
    }

    #[tokio::test]
    async fn test_allowed_until_failure_budget_spent() {
        let limiter = test_limiter();

        assert!(limiter.is_allowed("ADM-001").await);
        limiter.record_failure("ADM-001").await;
        limiter.record_failure("ADM-001").await;
        assert!(limiter.is_allowed("ADM-001").await);

        limiter.record_failure("ADM-001").await;
        assert!(!limiter.is_allowed("ADM-001").await);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = test_limiter();

        for _ in 0..3 {
            limiter.record_failure("ADM-001").await;
        }

        assert!(!limiter.is_allowed("ADM-001").await);
        assert!(limiter.is_allowed("ADM-002").await);
    }

    #[tokio::test]
    async fn test_reset_clears_failures() {
        let limiter = test_limiter();

        limiter.record_failure("ADM-001").await;
        limiter.record_failure("ADM-001").await;
        limiter.reset("ADM-001").await;
        limiter.record_failure("ADM-001").await;

        assert!(limiter.is_allowed("ADM-001").await);
    }
}
