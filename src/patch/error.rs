//! Patch error taxonomy.

use std::path::PathBuf;

use thiserror::Error;

/// Why a patch was refused. The target file is unchanged in every case.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid change: {0}")]
    Validation(String),

    #[error("`{}` is outside every configured source root", .path.display())]
    Permission { path: PathBuf },

    /// Zero matches. `file` is `None` when no source file contained the value.
    #[error("the original content changed elsewhere; re-scan and retry")]
    Mismatch { file: Option<PathBuf> },

    #[error("{count} occurrences in `{}` (lines {}); pass a line hint", .file.display(), join_lines(.lines))]
    AmbiguousMatch {
        file: PathBuf,
        count: usize,
        lines: Vec<usize>,
    },

    #[error("{} source files contain the original value; pass a file path", .files.len())]
    AmbiguousFile { files: Vec<PathBuf> },

    #[error("edit would break the structure of `{}` near line {line}: {reason}", .file.display())]
    SyntaxRisk {
        file: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("`{}` kept changing during {attempts} attempts", .file.display())]
    Unstable { file: PathBuf, attempts: u32 },

    #[error("IO error on `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Permission { .. } => "PermissionError",
            Self::Mismatch { .. } => "PatchMismatch",
            Self::AmbiguousMatch { .. } | Self::AmbiguousFile { .. } => "AmbiguousMatch",
            Self::SyntaxRisk { .. } => "SyntaxRisk",
            Self::Unstable { .. } => "ConcurrentEditConflict",
            Self::Io { .. } => "Io",
        }
    }
}

fn join_lines(lines: &[usize]) -> String {
    lines
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub type PatchResult<T> = std::result::Result<T, PatchError>;
