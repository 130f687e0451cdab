//! # Ingress Rate Limiter
//!
//! Caps how many `#osmnote` commands a single node can submit per window,
//! independent of the outbound anti-spam limiter in [`crate::notifier`].
//! A sliding window of timestamps per node, the same shape the teacher
//! crate's `util/logging.rs` throttle uses, but keyed by node instead of
//! by log category.

use crate::constants::{RATE_LIMIT_MAX_COMMANDS, RATE_LIMIT_WINDOW};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    window: Duration,
    max_commands: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RATE_LIMIT_WINDOW, RATE_LIMIT_MAX_COMMANDS)
    }
}

impl RateLimiter {
    pub fn new(window: Duration, max_commands: usize) -> Self {
        RateLimiter {
            window,
            max_commands,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if `node_id` may submit another `#osmnote` right now,
    /// and records the attempt regardless of the outcome.
    pub fn allow(&self, node_id: &str) -> bool {
        let now = Instant::now();
        let mut guard = self.hits.lock().unwrap();
        let entry = guard.entry(node_id.to_string()).or_default();
        while let Some(&front) = entry.front() {
            if now.duration_since(front) > self.window {
                entry.pop_front();
            } else {
                break;
            }
        }
        let admitted = entry.len() < self.max_commands;
        entry.push_back(now);
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_cap_then_rejects() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        assert!(limiter.allow("!a"));
        assert!(limiter.allow("!a"));
        assert!(limiter.allow("!a"));
        assert!(!limiter.allow("!a"));
    }

    #[test]
    fn nodes_have_independent_budgets() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 1);
        assert!(limiter.allow("!a"));
        assert!(limiter.allow("!b"));
        assert!(!limiter.allow("!a"));
    }
}
