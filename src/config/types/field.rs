//! Config field path used by validation diagnostics.

use owo_colors::OwoColorize;
use std::fmt;

/// A dotted path into `inplace.toml` (e.g. `scan.loop_threshold`).
///
/// Section structs expose their paths as associated constants so diagnostics
/// never carry hand-typed strings:
///
/// ```ignore
/// diag.error(ScanConfig::LOOP_THRESHOLD, "must be at least 2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath(pub &'static str);

impl FieldPath {
    #[inline]
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_args!("`{}`", self.0).bright_blue())
    }
}

impl AsRef<str> for FieldPath {
    fn as_ref(&self) -> &str {
        self.0
    }
}
