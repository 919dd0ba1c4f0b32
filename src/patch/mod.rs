//! Source-mapped patch engine.
//!
//! Applies one text replacement to one template source file:
//!
//! ```text
//! read ─► plan (match, disambiguate, sanity) ─► re-hash ─► backup ─► temp + rename
//!   ▲                                              │
//!   └──────────── file changed meanwhile ──────────┘
//! ```
//!
//! Either the whole new content is committed or the file is left exactly as
//! it was. Locking and history are the caller's concern (see `edit`).

pub mod engine;
pub mod error;
pub mod resolve;
pub mod sanity;
pub mod write;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

pub use error::{PatchError, PatchResult};

use crate::config::{PatchConfig, ProjectConfig};
use crate::utils::hash::ContentHash;
use engine::{PlanError, Replace};
use write::{BackupStore, write_atomic};

/// Per-call options.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatchOptions {
    pub line_hint: Option<usize>,
    pub allow_multiple: bool,
}

/// The version record of one successful patch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub file: PathBuf,
    /// `None` for a no-op.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup: Option<PathBuf>,
    pub occurrences: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub escaped: bool,
    pub before_hash: String,
    pub after_hash: String,
    /// Read attempts needed because the file changed underneath.
    pub attempts: u32,
    /// Backups removed by retention.
    pub pruned: usize,
}

impl PatchOutcome {
    pub fn is_noop(&self) -> bool {
        self.occurrences == 0
    }
}

/// Patches files of one project.
#[derive(Debug, Clone)]
pub struct Patcher<'a> {
    project: &'a ProjectConfig,
    config: &'a PatchConfig,
    root: &'a Path,
    backups: BackupStore,
}

impl<'a> Patcher<'a> {
    pub fn new(project: &'a ProjectConfig, config: &'a PatchConfig, root: &'a Path) -> Self {
        Self {
            project,
            config,
            root,
            backups: BackupStore::new(&config.backup_dir, root, config.max_backups),
        }
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Resolve the target: a supplied path must stay in a source root,
    /// otherwise the source roots are searched for `old`.
    pub fn resolve(&self, file: Option<&Path>, old: &str) -> PatchResult<PathBuf> {
        match file {
            Some(path) => resolve::checked_path(self.project, self.root, path),
            None => resolve::find_source(self.project, old, self.config.escaped_fallback),
        }
    }

    /// Replace `old` with `new` in `file`.
    pub fn patch(
        &self,
        file: &Path,
        old: &str,
        new: &str,
        options: PatchOptions,
    ) -> PatchResult<PatchOutcome> {
        if old.is_empty() {
            return Err(PatchError::Validation(
                "the original value is empty".to_string(),
            ));
        }

        let file = resolve::checked_path(self.project, self.root, file)?;
        if old == new {
            let hash = ContentHash::of(&read(&file)?).to_hex();
            return Ok(PatchOutcome {
                file,
                backup: None,
                occurrences: 0,
                line: None,
                escaped: false,
                before_hash: hash.clone(),
                after_hash: hash,
                attempts: 1,
                pruned: 0,
            });
        }

        let request = Replace {
            old,
            new,
            line_hint: options.line_hint,
            allow_multiple: options.allow_multiple,
            escaped_fallback: self.config.escaped_fallback,
        };

        let attempts = self.config.retries.max(1);
        for attempt in 1..=attempts {
            let bytes = read(&file)?;
            let before = ContentHash::of(&bytes);
            let content = std::str::from_utf8(&bytes).map_err(|_| {
                PatchError::Validation(format!("`{}` is not valid UTF-8", file.display()))
            })?;

            let planned = engine::plan(content, &request).map_err(|e| match e {
                PlanError::NotFound => PatchError::Mismatch {
                    file: Some(file.clone()),
                },
                PlanError::Ambiguous { lines } => PatchError::AmbiguousMatch {
                    file: file.clone(),
                    count: lines.len(),
                    lines,
                },
                PlanError::SyntaxRisk { line, reason } => PatchError::SyntaxRisk {
                    file: file.clone(),
                    line,
                    reason,
                },
            })?;

            if ContentHash::of(&read(&file)?) != before {
                continue;
            }

            let backup = self
                .backups
                .save(&file, &bytes)
                .map_err(|e| PatchError::io(&self.config.backup_dir, e))?;
            write_atomic(&file, planned.content.as_bytes())
                .map_err(|e| PatchError::io(&file, e))?;
            // Retention is best effort; the patch itself already succeeded
            let pruned = self.backups.prune(&file).unwrap_or(0);

            return Ok(PatchOutcome {
                backup: Some(backup),
                occurrences: planned.occurrences,
                line: Some(planned.line),
                escaped: planned.escaped,
                before_hash: before.to_hex(),
                after_hash: ContentHash::of(planned.content.as_bytes()).to_hex(),
                attempts: attempt,
                pruned,
                file,
            });
        }

        Err(PatchError::Unstable { file, attempts })
    }

    /// Put back the bytes a committed patch replaced, from its backup.
    ///
    /// Only when the file still holds exactly what the patch wrote. Returns
    /// whether the file was reverted.
    pub fn revert(&self, outcome: &PatchOutcome) -> PatchResult<bool> {
        let Some(backup) = &outcome.backup else {
            return Ok(false);
        };
        if ContentHash::of(&read(&outcome.file)?).to_hex() != outcome.after_hash {
            return Ok(false);
        }
        let original = read(backup)?;
        write_atomic(&outcome.file, &original).map_err(|e| PatchError::io(&outcome.file, e))?;
        Ok(true)
    }
}

fn read(path: &Path) -> PatchResult<Vec<u8>> {
    fs::read(path).map_err(|e| PatchError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::path::normalize_path;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
        project: ProjectConfig,
        config: PatchConfig,
    }

    impl Fixture {
        fn new(max_backups: usize) -> Self {
            let dir = TempDir::new().unwrap();
            let root = normalize_path(dir.path());
            fs::create_dir_all(root.join("views")).unwrap();

            let mut project = ProjectConfig {
                sources: vec![PathBuf::from("views")],
                ..ProjectConfig::default()
            };
            project.normalize(&root);
            let mut config = PatchConfig {
                max_backups,
                ..PatchConfig::default()
            };
            config.normalize(&root);

            Self {
                _dir: dir,
                root,
                project,
                config,
            }
        }

        fn patcher(&self) -> Patcher<'_> {
            Patcher::new(&self.project, &self.config, &self.root)
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.root.join("views").join(name);
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_patch_writes_backup_and_content() {
        let fx = Fixture::new(5);
        let file = fx.write("home.html", "<h1>Welcome</h1>");

        let outcome = fx
            .patcher()
            .patch(&file, "Welcome", "Hello", PatchOptions::default())
            .unwrap();

        assert_eq!(fs::read_to_string(&file).unwrap(), "<h1>Hello</h1>");
        let backup = outcome.backup.as_ref().unwrap();
        assert!(backup.starts_with(fx.root.join(".inplace/backups/views")));
        assert_eq!(fs::read_to_string(backup).unwrap(), "<h1>Welcome</h1>");
        assert_eq!(outcome.occurrences, 1);
        assert_eq!(outcome.line, Some(1));
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.before_hash, ContentHash::of(b"<h1>Welcome</h1>").to_hex());
        assert_eq!(outcome.after_hash, ContentHash::of(b"<h1>Hello</h1>").to_hex());
    }

    #[test]
    fn test_revert_only_when_file_is_unchanged() {
        let fx = Fixture::new(5);
        let file = fx.write("home.html", "<h1>Welcome</h1>");
        let patcher = fx.patcher();

        let outcome = patcher
            .patch(&file, "Welcome", "Hello", PatchOptions::default())
            .unwrap();
        assert!(patcher.revert(&outcome).unwrap());
        assert_eq!(fs::read_to_string(&file).unwrap(), "<h1>Welcome</h1>");

        let outcome = patcher
            .patch(&file, "Welcome", "Hello", PatchOptions::default())
            .unwrap();
        fs::write(&file, "<h1>Hello there</h1>").unwrap();
        assert!(!patcher.revert(&outcome).unwrap());
        assert_eq!(fs::read_to_string(&file).unwrap(), "<h1>Hello there</h1>");
    }

    #[test]
    fn test_failures_leave_file_untouched() {
        let fx = Fixture::new(5);
        let original = "<p>Sale</p>\n<p>Sale</p>\n<p>Price</p>";
        let file = fx.write("shop.html", original);
        let patcher = fx.patcher();

        let err = patcher
            .patch(&file, "Sale", "Deal", PatchOptions::default())
            .unwrap_err();
        assert!(matches!(err, PatchError::AmbiguousMatch { count: 2, .. }));

        let err = patcher
            .patch(&file, "Gone", "Here", PatchOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "PatchMismatch");

        let err = patcher
            .patch(&file, "Price", "{{ $price }}", PatchOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "SyntaxRisk");

        assert_eq!(fs::read_to_string(&file).unwrap(), original);
        assert!(patcher.backups().list(&file).unwrap().is_empty());
    }

    #[test]
    fn test_line_hint_disambiguates() {
        let fx = Fixture::new(5);
        let file = fx.write("shop.html", "<p>Sale</p>\n<p>Sale</p>");
        let options = PatchOptions {
            line_hint: Some(2),
            ..PatchOptions::default()
        };
        let outcome = fx.patcher().patch(&file, "Sale", "Deal", options).unwrap();
        assert_eq!(outcome.line, Some(2));
        assert_eq!(fs::read_to_string(&file).unwrap(), "<p>Sale</p>\n<p>Deal</p>");
    }

    #[test]
    fn test_noop_and_validation() {
        let fx = Fixture::new(5);
        let file = fx.write("home.html", "<h1>Same</h1>");
        let patcher = fx.patcher();

        let outcome = patcher
            .patch(&file, "Same", "Same", PatchOptions::default())
            .unwrap();
        assert!(outcome.is_noop());
        assert!(outcome.backup.is_none());
        assert!(patcher.backups().list(&file).unwrap().is_empty());

        let err = patcher
            .patch(&file, "", "x", PatchOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "ValidationError");
    }

    #[test]
    fn test_outside_source_root_is_refused() {
        let fx = Fixture::new(5);
        let outside = fx.root.join("secret.html");
        fs::write(&outside, "<p>Secret</p>").unwrap();

        let err = fx
            .patcher()
            .patch(&outside, "Secret", "Public", PatchOptions::default())
            .unwrap_err();
        assert_eq!(err.code(), "PermissionError");
        assert_eq!(fs::read_to_string(&outside).unwrap(), "<p>Secret</p>");
    }

    #[test]
    fn test_backup_retention() {
        let fx = Fixture::new(2);
        let file = fx.write("count.html", "<p>v0</p>");
        let patcher = fx.patcher();

        for i in 0..4 {
            patcher
                .patch(&file, &format!("v{i}"), &format!("v{}", i + 1), PatchOptions::default())
                .unwrap();
        }
        let backups = patcher.backups().list(&file).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[1]).unwrap(), "<p>v3</p>");
        assert_eq!(fs::read_to_string(&file).unwrap(), "<p>v4</p>");
    }

    #[test]
    fn test_resolve_without_path() {
        let fx = Fixture::new(5);
        let file = fx.write("about.html", "<p>About us</p>");
        fx.write("home.html", "<p>Home</p>");
        assert_eq!(fx.patcher().resolve(None, "About us").unwrap(), file);
        assert_eq!(
            fx.patcher()
                .resolve(Some(Path::new("views/about.html")), "About us")
                .unwrap(),
            file
        );
    }
}
