//! Rate limiter implementation
//!
//! Fixed wall-clock windows per key. Windows are aligned to multiples of the
//! window length since the Unix epoch, so every key's window resets at the
//! same instants.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::debug;

/// Prune stale windows once the map grows past this many keys
const CLEANUP_THRESHOLD: usize = 1024;

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    /// Remaining requests in the current window
    pub remaining: u32,
    pub limit: u32,
    /// Time until the current window ends
    pub reset_in: Duration,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    index: u64,
    count: u32,
}

/// Per-key request counter over fixed windows
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window: window.max(Duration::from_secs(1)),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count this request against `key_id` and decide whether to admit it
    pub fn check_and_record(&self, key_id: &str, limit: u32) -> RateLimitResult {
        self.check_and_record_at(key_id, limit, SystemTime::now())
    }

    /// Check-and-increment happens under one lock so concurrent requests
    /// for the same key can never both take the last slot.
    pub fn check_and_record_at(&self, key_id: &str, limit: u32, now: SystemTime) -> RateLimitResult {
        let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
        let window_ms = self.window.as_millis().max(1);
        let index = (since_epoch.as_millis() / window_ms) as u64;
        let window_end_ms = (index as u128 + 1) * window_ms;
        let reset_in =
            Duration::from_millis((window_end_ms - since_epoch.as_millis()) as u64);

        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        if windows.len() > CLEANUP_THRESHOLD {
            let before = windows.len();
            windows.retain(|_, state| state.index >= index);
            debug!(removed = before - windows.len(), "Pruned stale rate limit windows");
        }

        let state = windows
            .entry(key_id.to_string())
            .or_insert(WindowState { index, count: 0 });

        if state.index != index {
            *state = WindowState { index, count: 0 };
        }

        if state.count >= limit {
            return RateLimitResult {
                allowed: false,
                remaining: 0,
                limit,
                reset_in,
            };
        }

        state.count += 1;

        RateLimitResult {
            allowed: true,
            remaining: limit - state.count,
            limit,
            reset_in,
        }
    }

    /// Reset rate limits for a key
    pub fn reset(&self, key_id: &str) {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.remove(key_id);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at_secs(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_limit_boundary() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let now = at_secs(1_200);

        for i in 1..=5 {
            let result = limiter.check_and_record_at("key-1", 5, now);
            assert!(result.allowed, "request {} should be admitted", i);
            assert_eq!(result.remaining, 5 - i);
        }

        let rejected = limiter.check_and_record_at("key-1", 5, now);
        assert!(!rejected.allowed);
        assert_eq!(rejected.remaining, 0);
    }

    #[test]
    fn test_reset_in_counts_down_to_window_end() {
        let limiter = RateLimiter::new(Duration::from_secs(60));

        let result = limiter.check_and_record_at("key-1", 1, at_secs(1_215));
        assert_eq!(result.reset_in, Duration::from_secs(45));

        let rejected = limiter.check_and_record_at("key-1", 1, at_secs(1_250));
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset_in, Duration::from_secs(10));
    }

    #[test]
    fn test_new_window_resets_count() {
        let limiter = RateLimiter::new(Duration::from_secs(60));

        assert!(limiter.check_and_record_at("key-1", 1, at_secs(1_259)).allowed);
        assert!(!limiter.check_and_record_at("key-1", 1, at_secs(1_259)).allowed);
        assert!(limiter.check_and_record_at("key-1", 1, at_secs(1_260)).allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        let now = at_secs(600);

        assert!(limiter.check_and_record_at("key-1", 1, now).allowed);
        assert!(!limiter.check_and_record_at("key-1", 1, now).allowed);
        assert!(limiter.check_and_record_at("key-2", 1, now).allowed);
    }

    #[test]
    fn test_reset_key() {
        let limiter = RateLimiter::default();
        let now = at_secs(600);

        assert!(limiter.check_and_record_at("key-1", 1, now).allowed);
        limiter.reset("key-1");
        assert!(limiter.check_and_record_at("key-1", 1, now).allowed);
    }

    #[test]
    fn test_stale_windows_are_pruned() {
        let limiter = RateLimiter::new(Duration::from_secs(60));
        for i in 0..=CLEANUP_THRESHOLD {
            limiter.check_and_record_at(&format!("key-{}", i), 10, at_secs(0));
        }
        limiter.check_and_record_at("late", 10, at_secs(120));
        limiter.check_and_record_at("later", 10, at_secs(120));

        let windows = limiter.windows.lock().unwrap();
        assert_eq!(windows.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_admissions_stop_exactly_at_limit() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(60)));
        let mut handles = Vec::new();

        for _ in 0..100 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.check_and_record_at("shared", 10, at_secs(600)).allowed
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 10);
    }
}
