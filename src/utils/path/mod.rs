//! Path utilities.
//!
//! Pure functions for path manipulation. No side effects beyond
//! `canonicalize` lookups.
//!
//! - [`fs`]: normalization, containment checks, project-relative display

pub mod fs;

pub use fs::{is_within, normalize_path, relative_to, resolve_path};
