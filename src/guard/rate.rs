//! Fixed-window write counters keyed by actor.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{actor} exceeded {limit} writes per {}s; retry in {}s", .window.as_secs(), .retry_after.as_secs().max(1))]
pub struct RateLimited {
    pub actor: String,
    pub limit: u32,
    pub window: Duration,
    pub retry_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            limit,
            window,
        }
    }

    /// Count one write attempt by `actor`.
    pub fn check(&self, actor: &str) -> Result<(), RateLimited> {
        self.check_at(actor, Instant::now())
    }

    /// Count one write attempt at `now`. Increment and check are atomic per actor.
    pub fn check_at(&self, actor: &str, now: Instant) -> Result<(), RateLimited> {
        let mut entry = self.windows.entry(actor.to_string()).or_insert(Window {
            start: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.start);
        if elapsed >= self.window {
            *entry = Window {
                start: now,
                count: 0,
            };
        }

        if entry.count >= self.limit {
            return Err(RateLimited {
                actor: actor.to_string(),
                limit: self.limit,
                window: self.window,
                retry_after: self.window.saturating_sub(elapsed),
            });
        }
        entry.count += 1;
        Ok(())
    }

    /// Attempts left for `actor` in the current window.
    pub fn remaining(&self, actor: &str) -> u32 {
        self.windows.get(actor).map_or(self.limit, |w| {
            if w.start.elapsed() >= self.window {
                self.limit
            } else {
                self.limit.saturating_sub(w.count)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceiling_and_reset() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let t0 = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at("alice", t0).is_ok());
        }
        let err = limiter
            .check_at("alice", t0 + Duration::from_secs(15))
            .unwrap_err();
        assert_eq!(err.limit, 3);
        assert_eq!(err.retry_after, Duration::from_secs(45));

        // Other actors have their own window
        assert!(limiter.check_at("bob", t0).is_ok());

        // Next window
        assert!(limiter.check_at("alice", t0 + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn test_rejections_do_not_count() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let t0 = Instant::now();
        assert!(limiter.check_at("alice", t0).is_ok());
        assert!(limiter.check_at("alice", t0).is_err());
        assert!(limiter.check_at("alice", t0).is_err());
        assert!(limiter.check_at("alice", t0 + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn test_remaining() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert_eq!(limiter.remaining("alice"), 2);
        limiter.check("alice").unwrap();
        assert_eq!(limiter.remaining("alice"), 1);
    }
}
