//! Backups and atomic file replacement.
//!
//! Backups mirror the project layout under the backup directory:
//!
//! ```text
//! resources/views/home.blade.php
//! .inplace/backups/resources/views/home.blade.php.1718462445123.bak
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tempfile::NamedTempFile;

const BACKUP_EXT: &str = "bak";

/// Replace `path` with `data` via a sibling temp file and rename.
///
/// The target keeps its permissions. On error the target is untouched.
pub fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Timestamped copies of patched files.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
    root: PathBuf,
    max: usize,
}

impl BackupStore {
    pub fn new(dir: impl Into<PathBuf>, root: impl Into<PathBuf>, max: usize) -> Self {
        Self {
            dir: dir.into(),
            root: root.into(),
            max,
        }
    }

    /// Store `content` as the newest backup of `file`.
    pub fn save(&self, file: &Path, content: &[u8]) -> io::Result<PathBuf> {
        let (dir, name) = self.location(file)?;
        fs::create_dir_all(&dir)?;

        // Stamps stay strictly increasing, even within one millisecond
        let last = stamped(&dir, &name)?.last().map_or(0, |(stamp, _)| stamp + 1);
        let path = dir.join(backup_name(&name, now_millis().max(last)));
        write_atomic(&path, content)?;
        Ok(path)
    }

    /// Backups of `file`, oldest first.
    pub fn list(&self, file: &Path) -> io::Result<Vec<PathBuf>> {
        let (dir, name) = self.location(file)?;
        Ok(stamped(&dir, &name)?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    /// Delete the oldest backups of `file` beyond the retention limit.
    ///
    /// Returns how many were removed.
    pub fn prune(&self, file: &Path) -> io::Result<usize> {
        let backups = self.list(file)?;
        let excess = backups.len().saturating_sub(self.max);
        for path in &backups[..excess] {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }

    /// Mirrored backup directory and file name for `file`.
    fn location(&self, file: &Path) -> io::Result<(PathBuf, String)> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not a file path"))?;

        let relative = file.strip_prefix(&self.root).unwrap_or(file);
        let mut dir = self.dir.clone();
        if let Some(parent) = relative.parent() {
            // Absolute paths outside the root are mirrored without their root
            dir.extend(parent.components().filter(|c| {
                matches!(c, std::path::Component::Normal(_))
            }));
        }
        Ok((dir, name))
    }
}

/// Backups named after `name` in `dir`, sorted by stamp.
fn stamped(dir: &Path, name: &str) -> io::Result<Vec<(u64, PathBuf)>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut backups: Vec<(u64, PathBuf)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let stamp = parse_stamp(&entry.file_name().to_string_lossy(), name)?;
            Some((stamp, entry.path()))
        })
        .collect();
    backups.sort_by_key(|(stamp, _)| *stamp);
    Ok(backups)
}

fn backup_name(name: &str, stamp: u64) -> String {
    format!("{name}.{stamp}.{BACKUP_EXT}")
}

/// Timestamp of a backup named after `name`, if `file_name` is one.
fn parse_stamp(file_name: &str, name: &str) -> Option<u64> {
    file_name
        .strip_prefix(name)?
        .strip_prefix('.')?
        .strip_suffix(BACKUP_EXT)?
        .strip_suffix('.')?
        .parse()
        .ok()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        // No temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("page.html");
        fs::write(&path, "old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&path, b"new").unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[test]
    fn test_backup_mirrors_project_layout() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let store = BackupStore::new(root.join(".inplace/backups"), root, 5);
        let file = root.join("views/home.html");

        let backup = store.save(&file, b"<p>Hi</p>").unwrap();
        assert!(backup.starts_with(root.join(".inplace/backups/views")));
        let name = backup.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("home.html."));
        assert!(name.ends_with(".bak"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), "<p>Hi</p>");
    }

    #[test]
    fn test_list_and_prune() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let store = BackupStore::new(root.join("backups"), root, 2);
        let file = root.join("a.html");

        let saved: Vec<_> = (0..4)
            .map(|i| store.save(&file, format!("v{i}").as_bytes()).unwrap())
            .collect();
        // Unrelated files are not backups of a.html
        fs::write(root.join("backups/ab.html.1.bak"), "x").unwrap();
        fs::write(root.join("backups/a.html.notes"), "x").unwrap();

        assert_eq!(store.list(&file).unwrap(), saved);
        assert_eq!(store.prune(&file).unwrap(), 2);
        assert_eq!(store.list(&file).unwrap(), saved[2..].to_vec());
        assert_eq!(fs::read_to_string(&saved[3]).unwrap(), "v3");
    }

    #[test]
    fn test_list_without_backups() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path().join("none"), dir.path(), 2);
        assert!(store.list(&dir.path().join("x.html")).unwrap().is_empty());
    }

    #[test]
    fn test_parse_stamp() {
        assert_eq!(parse_stamp("a.html.123.bak", "a.html"), Some(123));
        assert_eq!(parse_stamp("ab.html.123.bak", "a.html"), None);
        assert_eq!(parse_stamp("a.html.x.bak", "a.html"), None);
    }
}
