//! # Logging Utilities
//!
//! Thin wrappers around the `log` facade plus a rate-limited throttle for
//! noisy, recoverable conditions (serial reconnect loops, repeated
//! geocoder failures) so a flaky link doesn't flood the log sink.

use log::{debug, error, info, log_enabled, warn, Level};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Initializes the logger with the `env_logger` crate, honoring `RUST_LOG`.
pub fn init_logger() {
    env_logger::init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}

/// Rate-limits repeated log messages within a time window.
#[derive(Debug)]
pub struct LogThrottle {
    window: Duration,
    cap: u32,
    count: u32,
    window_start: Instant,
}

impl LogThrottle {
    pub fn new(window: Duration, cap: u32) -> Self {
        Self {
            window,
            cap,
            count: 0,
            window_start: Instant::now(),
        }
    }

    /// Returns `true` if a message should be logged now.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start) > self.window {
            self.window_start = now;
            self.count = 0;
        }
        self.count += 1;
        self.count <= self.cap
    }
}

/// Per-category throttles so unrelated noisy conditions don't share a budget.
#[derive(Debug, Default)]
pub struct ThrottleManager {
    throttles: HashMap<String, LogThrottle>,
}

impl ThrottleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&mut self, category: &str, window: Duration, cap: u32) -> bool {
        self.throttles
            .entry(category.to_string())
            .or_insert_with(|| LogThrottle::new(window, cap))
            .allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttle_admits_up_to_cap() {
        let mut t = LogThrottle::new(Duration::from_secs(1), 3);
        assert!(t.allow());
        assert!(t.allow());
        assert!(t.allow());
        assert!(!t.allow());
    }

    #[test]
    fn throttle_manager_isolates_categories() {
        let mut m = ThrottleManager::new();
        assert!(m.allow("serial", Duration::from_secs(1), 1));
        assert!(!m.allow("serial", Duration::from_secs(1), 1));
        assert!(m.allow("geocoder", Duration::from_secs(1), 1));
    }
}
