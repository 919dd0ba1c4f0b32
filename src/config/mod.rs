//! Project configuration management for `inplace.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── history    # [history]
//! │   ├── limits     # [limits]
//! │   ├── patch      # [patch]
//! │   ├── project    # [project]
//! │   └── scan       # [scan]
//! ├── types/         # Utility types
//! │   ├── error      # ConfigError, ConfigDiagnostics
//! │   ├── field      # FieldPath
//! │   └── handle     # Global config handle
//! └── mod.rs         # EditorConfig (this file)
//! ```
//!
//! A missing config file is not an error: every section has defaults and the
//! working directory becomes the project root.

pub mod section;
pub mod types;
mod util;

use util::find_config_file;

pub use section::{HistoryConfig, LimitsConfig, PatchConfig, ProjectConfig, ScanConfig};
pub use types::{ConfigDiagnostics, ConfigError, FieldPath, cfg, init_config};

use crate::{cli::Cli, log};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing inplace.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub patch: PatchConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub limits: LimitsConfig,
}

impl EditorConfig {
    /// Load configuration for a CLI invocation.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(&cli.config) {
            Some(path) => {
                let config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                (Self { config_path: path, ..config }, root)
            }
            None => {
                crate::debug!("config"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd)
            }
        };

        config.finalize(&root);
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        &self.root
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.root = path.to_path_buf();
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        crate::utils::path::relative_to(path.as_ref(), &self.root)
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve root and every configured path to absolute form.
    fn finalize(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);
        self.set_root(&root);

        if !self.config_path.as_os_str().is_empty() {
            self.config_path = crate::utils::path::normalize_path(&self.config_path);
        }

        self.project.normalize(&root);
        self.patch.normalize(&root);
        self.history.normalize(&root);
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.project.validate(&mut diag);
        self.scan.validate(&mut diag);
        self.patch.validate(&mut diag);
        self.limits.validate(&mut diag);

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }

    /// Build a finalized config rooted at `root` (for tests and embedding).
    pub fn with_root(mut self, root: &Path) -> Self {
        self.finalize(root);
        self
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse a config snippet.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> EditorConfig {
    let (parsed, ignored) = EditorConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

// ============================================================================
// tests
// ============================================================================
