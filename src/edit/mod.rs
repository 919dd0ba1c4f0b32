//! Edit service: the write path around the patch engine.
//!
//! ```text
//! update ─► permission ─► rate limit ─► lock(id) ─► resolve file ─► patch
//!                                                                    │
//!                          invalidate cache ◄─ history record ◄──────┘
//! ```
//!
//! Single updates fail as a whole. Bulk updates run the same path per item
//! and keep going after a failed item.

mod change;
mod error;
mod gate;


use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashSet;
use serde_json::Value;

pub use change::{
    Applied, BulkRequest, BulkResponse, ContentChange, ErrorBody, ItemError, ItemResult, Summary,
    UpdateItem, UpdateResponse,
};
pub use error::EditError;
pub use gate::{AllowAll, CacheInvalidator, LogInvalidator, PermissionGate};

use crate::config::EditorConfig;
use crate::guard::{LockTable, RateLimiter};
use crate::history::{Action, Draft, HistoryRecord, HistoryStore};
use crate::patch::{PatchOptions, PatchOutcome, Patcher};

/// Metadata keys written to every history record.
mod meta {
    pub const FILE: &str = "file";
    pub const LOCALE: &str = "locale";
    pub const LINE: &str = "line";
    pub const BACKUP: &str = "backup";
    pub const BEFORE_HASH: &str = "beforeHash";
    pub const AFTER_HASH: &str = "afterHash";
    pub const OCCURRENCES: &str = "occurrences";
    pub const ESCAPED: &str = "escaped";
    pub const ERROR: &str = "error";
    pub const MESSAGE: &str = "message";
}

pub struct EditService<'a> {
    config: &'a EditorConfig,
    patcher: Patcher<'a>,
    history: HistoryStore,
    locks: LockTable,
    limiter: RateLimiter,
    gate: Box<dyn PermissionGate + 'a>,
    invalidator: Box<dyn CacheInvalidator + 'a>,
}

impl<'a> EditService<'a> {
    pub fn new(config: &'a EditorConfig) -> Self {
        Self {
            config,
            patcher: Patcher::new(&config.project, &config.patch, config.get_root()),
            history: HistoryStore::new(&config.history.path),
            locks: LockTable::new(config.limits.lock_ttl()),
            limiter: RateLimiter::new(config.limits.writes_per_window, config.limits.window()),
            gate: Box::new(AllowAll),
            invalidator: Box::new(LogInvalidator),
        }
    }

    pub fn with_gate(mut self, gate: impl PermissionGate + 'a) -> Self {
        self.gate = Box::new(gate);
        self
    }

    pub fn with_invalidator(mut self, invalidator: impl CacheInvalidator + 'a) -> Self {
        self.invalidator = Box::new(invalidator);
        self
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Single update contract.
    pub fn update(&self, item: UpdateItem, actor: &str) -> Result<Applied, EditError> {
        let change = item.into_change(&self.config.project.default_locale)?;
        self.apply(&change, actor, Action::Update, None)
    }

    /// Bulk update contract.
    ///
    /// Batch-level problems (empty, too large, duplicate `(id, locale)`) fail
    /// before any file is touched. Item failures are collected.
    pub fn bulk(&self, items: Vec<UpdateItem>, actor: &str) -> Result<BulkResponse, EditError> {
        self.validate_batch(&items)?;

        let default_locale = &self.config.project.default_locale;
        let mut results = Vec::with_capacity(items.len());
        let mut errors = Vec::new();

        for (index, item) in items.into_iter().enumerate() {
            let id = item.id.clone();
            let locale = item.locale_or(default_locale).to_string();
            let result = item
                .into_change(default_locale)
                .and_then(|change| self.apply(&change, actor, Action::Update, None));

            match result {
                Ok(applied) => results.push(ItemResult {
                    id,
                    locale,
                    success: true,
                    history_id: applied.history_id,
                    file: Some(self.config.root_relative(&applied.outcome.file)),
                }),
                Err(err) => {
                    crate::debug!("apply"; "item {} ({}) failed: {}", index, id, err);
                    errors.push(ItemError {
                        index,
                        id: id.clone(),
                        code: err.code(),
                        message: err.to_string(),
                    });
                    results.push(ItemResult {
                        id,
                        locale,
                        success: false,
                        history_id: None,
                        file: None,
                    });
                }
            }
        }

        let summary = Summary {
            total: results.len(),
            successful: results.iter().filter(|r| r.success).count(),
            failed: errors.len(),
        };
        Ok(BulkResponse {
            results,
            summary,
            errors: (!errors.is_empty()).then_some(errors),
        })
    }

    /// Put back the old snapshot of history record `history_id`.
    ///
    /// Creates a new `restore` record; history itself is never rewritten.
    pub fn restore(&self, history_id: u64, actor: &str) -> Result<Applied, EditError> {
        let record = self
            .history
            .get(history_id)?
            .ok_or_else(|| EditError::validation(format!("no history record {history_id}")))?;
        if record.action == Action::Failed {
            return Err(EditError::validation(format!(
                "history record {history_id} is a failed edit"
            )));
        }

        let change = restore_change(&record);
        self.apply(&change, actor, Action::Restore, Some(history_id))
    }

    /// History of one content id, oldest first.
    pub fn history_of(&self, content_id: &str) -> Result<Vec<HistoryRecord>, EditError> {
        Ok(self.history.for_content(content_id)?)
    }

    fn validate_batch(&self, items: &[UpdateItem]) -> Result<(), EditError> {
        if items.is_empty() {
            return Err(EditError::validation("no updates submitted"));
        }
        let max = self.config.limits.max_bulk_items;
        if items.len() > max {
            return Err(EditError::validation(format!(
                "{} updates submitted, at most {max} allowed",
                items.len()
            )));
        }

        let default_locale = &self.config.project.default_locale;
        let mut seen = FxHashSet::default();
        for item in items {
            if !seen.insert((item.id.as_str(), item.locale_or(default_locale))) {
                return Err(EditError::validation(format!(
                    "duplicate update for `{}` ({})",
                    item.id,
                    item.locale_or(default_locale)
                )));
            }
        }
        Ok(())
    }

    fn apply(
        &self,
        change: &ContentChange,
        actor: &str,
        action: Action,
        restored_from: Option<u64>,
    ) -> Result<Applied, EditError> {
        self.gate
            .authorize(actor, change)
            .map_err(EditError::Permission)?;
        self.limiter.check(actor)?;
        let _lock = self
            .locks
            .acquire(&change.id, actor, self.config.limits.lock_timeout())?;

        let result = self.patch(change);
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                if self.config.history.record_failures
                    && let Err(history_err) = self.record_failure(change, actor, &err)
                {
                    crate::log!("warning"; "failed edit of `{}` not recorded: {}", change.id, history_err);
                }
                return Err(err);
            }
        };

        if outcome.attempts > 1 {
            crate::debug!("patch"; "{} changed while patching, took {} attempts", outcome.file.display(), outcome.attempts);
        }
        if outcome.pruned > 0 {
            crate::debug!("patch"; "pruned {} old backup(s) of {}", outcome.pruned, outcome.file.display());
        }
        if outcome.is_noop() {
            return Ok(Applied {
                history_id: None,
                outcome,
            });
        }

        let appended = self.history.append(Draft {
            content_type: content_type(change),
            content_id: change.id.clone(),
            action,
            old_snapshot: change.old_value.clone(),
            new_snapshot: change.new_value.clone(),
            actor: actor.to_string(),
            metadata: self.outcome_metadata(change, &outcome),
            restored_from,
        });
        let record = match appended {
            Ok(record) => record,
            Err(err) => {
                // An edit without its history record is not committed
                self.roll_back(&outcome);
                return Err(err.into());
            }
        };
        self.invalidator.invalidate(&outcome.file, &change.id);

        Ok(Applied {
            history_id: Some(record.id),
            outcome,
        })
    }

    fn patch(&self, change: &ContentChange) -> Result<PatchOutcome, EditError> {
        let file = self
            .patcher
            .resolve(change.file_path.as_deref(), &change.old_value)?;
        let options = PatchOptions {
            line_hint: change.line_hint,
            allow_multiple: change.allow_multiple,
        };
        Ok(self
            .patcher
            .patch(&file, &change.old_value, &change.new_value, options)?)
    }

    fn outcome_metadata(
        &self,
        change: &ContentChange,
        outcome: &PatchOutcome,
    ) -> BTreeMap<String, Value> {
        let mut metadata = change.metadata.clone();
        let mut set = |key: &str, value: Value| {
            metadata.insert(key.to_string(), value);
        };
        set(meta::FILE, path_value(&self.config.root_relative(&outcome.file)));
        set(meta::LOCALE, Value::from(change.locale.as_str()));
        set(meta::BEFORE_HASH, Value::from(outcome.before_hash.as_str()));
        set(meta::AFTER_HASH, Value::from(outcome.after_hash.as_str()));
        set(meta::OCCURRENCES, Value::from(outcome.occurrences));
        set(meta::ESCAPED, Value::from(outcome.escaped));
        if let Some(line) = outcome.line {
            set(meta::LINE, Value::from(line));
        }
        if let Some(backup) = &outcome.backup {
            set(meta::BACKUP, path_value(&self.config.root_relative(backup)));
        }
        metadata
    }

    fn roll_back(&self, outcome: &PatchOutcome) {
        let file = outcome.file.display();
        match self.patcher.revert(outcome) {
            Ok(true) => crate::debug!("patch"; "reverted {} after history failure", file),
            Ok(false) => {
                crate::log!("warning"; "{} changed after the edit, left as is", file);
            }
            Err(err) => crate::log!("warning"; "could not revert {}: {}", file, err),
        }
    }

    fn record_failure(
        &self,
        change: &ContentChange,
        actor: &str,
        err: &EditError,
    ) -> Result<(), EditError> {
        let mut metadata = change.metadata.clone();
        metadata.insert(meta::LOCALE.into(), Value::from(change.locale.as_str()));
        metadata.insert(meta::ERROR.into(), Value::from(err.code()));
        metadata.insert(meta::MESSAGE.into(), Value::from(err.to_string()));
        if let Some(file) = &change.file_path {
            metadata.insert(meta::FILE.into(), path_value(file));
        }

        self.history.append(Draft {
            content_type: content_type(change),
            content_id: change.id.clone(),
            action: Action::Failed,
            old_snapshot: change.old_value.clone(),
            new_snapshot: change.new_value.clone(),
            actor: actor.to_string(),
            metadata,
            restored_from: None,
        })?;
        Ok(())
    }
}

/// The change that undoes `record`.
fn restore_change(record: &HistoryRecord) -> ContentChange {
    let str_meta = |key: &str| record.metadata.get(key).and_then(Value::as_str);
    ContentChange {
        id: record.content_id.clone(),
        old_value: record.new_snapshot.clone(),
        new_value: record.old_snapshot.clone(),
        locale: str_meta(meta::LOCALE).unwrap_or_default().to_string(),
        content_type: crate::scan::EditableType::parse(&record.content_type),
        file_path: str_meta(meta::FILE).map(Into::into),
        line_hint: record
            .metadata
            .get(meta::LINE)
            .and_then(Value::as_u64)
            .and_then(|line| usize::try_from(line).ok()),
        allow_multiple: false,
        metadata: BTreeMap::new(),
    }
}

fn content_type(change: &ContentChange) -> String {
    change
        .content_type
        .map_or("unknown", |t| t.as_str())
        .to_string()
}

fn path_value(path: &Path) -> Value {
    Value::from(path.to_string_lossy().replace('\\', "/"))
}
