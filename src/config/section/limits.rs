//! `[limits]` section configuration.
//!
//! Write-rate ceilings and lock timing.
//!
//! # Example
//!
//! ```toml
//! [limits]
//! writes_per_window = 60   # Per actor
//! window_secs = 60         # Fixed window length
//! lock_timeout_ms = 2000   # Wait for a busy content id, 0 = fail fast
//! lock_ttl_secs = 30       # Stale lock takeover
//! max_bulk_items = 200
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};

/// Concurrency and rate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub writes_per_window: u32,
    pub window_secs: u64,
    pub lock_timeout_ms: u64,
    pub lock_ttl_secs: u64,
    pub max_bulk_items: usize,
}

impl LimitsConfig {
    pub const WRITES_PER_WINDOW: FieldPath = FieldPath::new("limits.writes_per_window");
    pub const WINDOW_SECS: FieldPath = FieldPath::new("limits.window_secs");
    pub const LOCK_TTL_SECS: FieldPath = FieldPath::new("limits.lock_ttl_secs");
    pub const MAX_BULK_ITEMS: FieldPath = FieldPath::new("limits.max_bulk_items");

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.writes_per_window == 0 {
            diag.error(Self::WRITES_PER_WINDOW, "must be greater than 0");
        }
        if self.window_secs == 0 {
            diag.error(Self::WINDOW_SECS, "must be greater than 0");
        }
        if self.lock_ttl_secs == 0 {
            diag.error(Self::LOCK_TTL_SECS, "must be greater than 0");
        }
        if self.max_bulk_items == 0 {
            diag.error(Self::MAX_BULK_ITEMS, "must be greater than 0");
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            writes_per_window: 60,
            window_secs: 60,
            lock_timeout_ms: 2000,
            lock_ttl_secs: 30,
            max_bulk_items: 200,
        }
    }
}
