//! Configuration section definitions.
//!
//! Each module corresponds to a section in `inplace.toml`:
//!
//! | Module    | TOML Section  | Purpose                                 |
//! |-----------|---------------|-----------------------------------------|
//! | `project` | `[project]`   | Source roots, extensions, locale        |
//! | `scan`    | `[scan]`      | Classifier vocabularies and thresholds  |
//! | `patch`   | `[patch]`     | Backups, escaping fallback, retries     |
//! | `history` | `[history]`   | History file                            |
//! | `limits`  | `[limits]`    | Rate ceilings, lock timing, batch size  |

mod history;
mod limits;
mod patch;
mod project;
mod scan;

pub use history::HistoryConfig;
pub use limits::LimitsConfig;
pub use patch::PatchConfig;
pub use project::ProjectConfig;
pub use scan::ScanConfig;
