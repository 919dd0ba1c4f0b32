//! Edit service errors.

use thiserror::Error;

use crate::guard::{LockConflict, RateLimited};
use crate::history::HistoryError;
use crate::patch::PatchError;

#[derive(Debug, Error)]
pub enum EditError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("not allowed: {0}")]
    Permission(String),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Conflict(#[from] LockConflict),

    #[error(transparent)]
    RateLimited(#[from] RateLimited),

    #[error(transparent)]
    History(#[from] HistoryError),
}

impl EditError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Permission(_) => "PermissionError",
            Self::Patch(e) => e.code(),
            Self::Conflict(_) => "ConcurrentEditConflict",
            Self::RateLimited(_) => "RateLimited",
            Self::History(_) => "Io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_codes_follow_the_source() {
        let err: EditError = PatchError::Mismatch { file: None }.into();
        assert_eq!(err.code(), "PatchMismatch");
        assert_eq!(
            err.to_string(),
            "the original content changed elsewhere; re-scan and retry"
        );

        let err: EditError = LockConflict {
            key: "hero".into(),
            holder: "alice".into(),
        }
        .into();
        assert_eq!(err.code(), "ConcurrentEditConflict");

        let err: EditError = RateLimited {
            actor: "bob".into(),
            limit: 1,
            window: Duration::from_secs(60),
            retry_after: Duration::from_secs(30),
        }
        .into();
        assert_eq!(err.code(), "RateLimited");
        assert_eq!(EditError::validation("x").code(), "ValidationError");
    }
}
