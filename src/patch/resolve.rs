//! Target file resolution.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use rayon::prelude::*;

use super::error::{PatchError, PatchResult};
use crate::config::ProjectConfig;
use crate::utils::html::{escape, escape_attr};
use crate::utils::path::{is_within, resolve_path};

/// Dependency and build directories never searched for template sources.
const IGNORED_DIRS: &[&str] = &["node_modules", "vendor", "target", "dist", "build"];

/// Resolve a caller-supplied path against `root`.
///
/// Fails with `PermissionError` when the result leaves every source root.
pub fn checked_path(project: &ProjectConfig, root: &Path, path: &Path) -> PatchResult<PathBuf> {
    let full = resolve_path(path, root);
    if project.sources.iter().any(|src| is_within(&full, src)) {
        Ok(full)
    } else {
        Err(PatchError::Permission { path: full })
    }
}

/// Find the single source file that contains `old`.
pub fn find_source(project: &ProjectConfig, old: &str, escaped_fallback: bool) -> PatchResult<PathBuf> {
    let mut needles = vec![old.to_string()];
    if escaped_fallback {
        for form in [escape(old), escape_attr(old)] {
            if !needles.iter().any(|n| *n == form) {
                needles.push(form.into_owned());
            }
        }
    }

    let mut files: Vec<PathBuf> = source_files(project)
        .into_par_iter()
        .filter(|path| {
            fs::read_to_string(path)
                .is_ok_and(|content| needles.iter().any(|n| content.contains(n.as_str())))
        })
        .collect();
    files.sort();
    files.dedup();

    match files.len() {
        0 => Err(PatchError::Mismatch { file: None }),
        1 => Ok(files.remove(0)),
        _ => Err(PatchError::AmbiguousFile { files }),
    }
}

/// Template files under every source root.
pub fn source_files(project: &ProjectConfig) -> Vec<PathBuf> {
    project
        .sources
        .iter()
        .flat_map(|root| {
            WalkDir::new(root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .map(|e| e.path())
                .filter(|path| !in_ignored_dir(path, root))
                .filter(|path| project.is_source_file(path))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn in_ignored_dir(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| IGNORED_DIRS.iter().any(|d| c.as_os_str() == *d))
}
