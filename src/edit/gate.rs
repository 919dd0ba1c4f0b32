//! Collaborators the edit service consults around each write.

use std::path::Path;

use super::ContentChange;

/// Decides whether `actor` may apply `change`.
pub trait PermissionGate: Send + Sync {
    /// `Err` carries the reason shown to the caller.
    fn authorize(&self, actor: &str, change: &ContentChange) -> Result<(), String>;
}

/// Allows every change.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn authorize(&self, _actor: &str, _change: &ContentChange) -> Result<(), String> {
        Ok(())
    }
}

/// Notified after every successful write.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate(&self, file: &Path, content_id: &str);
}

/// Logs invalidations at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogInvalidator;

impl CacheInvalidator for LogInvalidator {
    fn invalidate(&self, file: &Path, content_id: &str) {
        crate::debug!("cache"; "invalidate {} ({})", file.display(), content_id);
    }
}
