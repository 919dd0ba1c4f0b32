//! `[project]` section configuration.
//!
//! Where the template sources live.
//!
//! # Example
//!
//! ```toml
//! [project]
//! sources = ["resources/views", "templates"]   # Roots patches may touch
//! extensions = ["html", "php", "twig"]          # Files searched for old values
//! default_locale = "en"
//! ```
//!
//! Paths are relative to the directory containing `inplace.toml`. A patch
//! target outside every source root is refused.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};
use crate::config::util::expand_path;

/// Template source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Source roots, relative to the project root.
    pub sources: Vec<PathBuf>,

    /// File extensions considered template sources (without dot).
    pub extensions: Vec<String>,

    /// Locale assumed when a change does not name one.
    pub default_locale: String,
}

impl ProjectConfig {
    pub const SOURCES: FieldPath = FieldPath::new("project.sources");
    pub const EXTENSIONS: FieldPath = FieldPath::new("project.extensions");

    /// Resolve source roots against the project root.
    pub fn normalize(&mut self, root: &Path) {
        self.sources = self.sources.iter().map(|p| expand_path(p, root)).collect();
    }

    /// Whether `path` has one of the configured template extensions.
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.sources.is_empty() {
            diag.error_with_hint(
                Self::SOURCES,
                "at least one source root is required",
                "use [\".\"] to allow the whole project",
            );
        }
        if self.extensions.is_empty() {
            diag.error(Self::EXTENSIONS, "at least one extension is required");
        }
    }
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            sources: vec![PathBuf::from(".")],
            extensions: [
                "html", "htm", "php", "twig", "hbs", "mustache", "erb", "njk", "liquid", "j2",
                "jinja", "tpl", "vue", "svelte", "astro",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            default_locale: "en".to_string(),
        }
    }
}
