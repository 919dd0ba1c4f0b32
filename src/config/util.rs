//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/site/resources/views/  ← cwd
/// /home/user/site/inplace.toml      ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    find_config_from(&cwd, config_name)
}

/// Walk up from `start` looking for `config_name`.
fn find_config_from(start: &Path, config_name: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.is_file() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None, // Reached filesystem root
        }
    }
}

/// Expand `~` and resolve a configured path against the project root.
pub fn expand_path(path: &Path, root: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    let full_path = if path.is_relative() {
        root.join(&path)
    } else {
        path
    };
    crate::utils::path::normalize_path(&full_path)
}

// ============================================================================
// tests
// ============================================================================
