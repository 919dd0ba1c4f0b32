//! `[history]` section configuration.
//!
//! ```toml
//! [history]
//! path = ".inplace/history.jsonl"   # Append-only, one record per line
//! record_failures = false           # Also record failed writes
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::util::expand_path;

/// History store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub path: PathBuf,
    pub record_failures: bool,
}

impl HistoryConfig {
    pub fn normalize(&mut self, root: &Path) {
        self.path = expand_path(&self.path, root);
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".inplace/history.jsonl"),
            record_failures: false,
        }
    }
}
