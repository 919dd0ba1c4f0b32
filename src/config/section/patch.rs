//! `[patch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [patch]
//! backup_dir = ".inplace/backups"   # Pre-patch copies, mirrored by source path
//! max_backups = 20                  # Per source file; oldest pruned first
//! escaped_fallback = true           # Retry with HTML-escaped text
//! retries = 3                       # Re-reads when the file changes mid-patch
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};
use crate::config::util::expand_path;

/// Patch engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub backup_dir: PathBuf,
    pub max_backups: usize,
    pub escaped_fallback: bool,
    pub retries: u32,
}

impl PatchConfig {
    pub const MAX_BACKUPS: FieldPath = FieldPath::new("patch.max_backups");
    pub const RETRIES: FieldPath = FieldPath::new("patch.retries");

    pub fn normalize(&mut self, root: &Path) {
        self.backup_dir = expand_path(&self.backup_dir, root);
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.max_backups == 0 {
            diag.error_with_hint(
                Self::MAX_BACKUPS,
                "must keep at least one backup",
                "every patch must stay recoverable",
            );
        }
        if self.retries == 0 {
            diag.error(Self::RETRIES, "must allow at least one attempt");
        }
    }
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            backup_dir: PathBuf::from(".inplace/backups"),
            max_backups: 20,
            escaped_fallback: true,
            retries: 3,
        }
    }
}
