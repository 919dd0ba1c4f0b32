//! Concurrency guards for writes: per-id locks and per-actor rate limits.

mod lock;
mod rate;

pub use lock::{LockConflict, LockTable};
pub use rate::{RateLimited, RateLimiter};
