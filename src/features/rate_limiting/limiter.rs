//! Per-user sliding window limiter for generation requests
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0

use dashmap::DashMap;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct RateLimiter {
    requests: DashMap<u64, Vec<Instant>>,
    max_requests: usize,
    time_window: Duration,
}

impl RateLimiter {
    /// `max_requests == 0` disables limiting
    pub fn new(max_requests: usize, time_window: Duration) -> Self {
        RateLimiter {
            requests: DashMap::new(),
            max_requests,
            time_window,
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Record a request for `user_id`.
    ///
    /// Returns how long the user has to wait when over the limit.
    pub fn check(&self, user_id: u64) -> Result<(), Duration> {
        if self.max_requests == 0 {
            return Ok(());
        }

        let now = Instant::now();
        self.evict_idle(now);

        let mut entry = self.requests.entry(user_id).or_default();
        entry.retain(|&time| now.duration_since(time) < self.time_window);

        if entry.len() >= self.max_requests {
            let oldest = entry[0];
            Err(self.time_window.saturating_sub(now.duration_since(oldest)))
        } else {
            entry.push(now);
            Ok(())
        }
    }

    /// Users with a request still inside the window
    pub fn tracked_users(&self) -> usize {
        self.requests.len()
    }

    /// Drop users whose every request has aged out of the window
    fn evict_idle(&self, now: Instant) {
        self.requests.retain(|_, times| {
            times.retain(|&time| now.duration_since(time) < self.time_window);
            !times.is_empty()
        });
    }
}
