//! Append-only edit history.
//!
//! One JSON record per line:
//!
//! ```text
//! {"id":1,"contentType":"heading","contentId":"3f2a9c01","action":"update",...}
//! {"id":2,"contentType":"heading","contentId":"3f2a9c01","action":"restore","restoredFrom":1,...}
//! ```
//!
//! Records are never rewritten. A restore is a new record pointing back at
//! the one it restored.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::utils::date::DateTimeUtc;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("IO error on history file `{}`", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("history file `{}` is corrupt at line {line}", .path.display())]
    Corrupt {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode history record")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Update,
    Restore,
    Failed,
}

/// One persisted change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: u64,
    pub content_type: String,
    pub content_id: String,
    pub action: Action,
    pub old_snapshot: String,
    pub new_snapshot: String,
    pub actor: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_from: Option<u64>,
}

/// A record before the store assigns its id and timestamp.
#[derive(Debug, Clone)]
pub struct Draft {
    pub content_type: String,
    pub content_id: String,
    pub action: Action,
    pub old_snapshot: String,
    pub new_snapshot: String,
    pub actor: String,
    pub metadata: BTreeMap<String, Value>,
    pub restored_from: Option<u64>,
}

/// JSON Lines history file.
pub struct HistoryStore {
    path: PathBuf,
    /// Next id, loaded from the file on first append.
    next_id: Mutex<Option<u64>>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            next_id: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record, assigning the next id.
    pub fn append(&self, draft: Draft) -> Result<HistoryRecord, HistoryError> {
        let mut next_id = self.next_id.lock();
        let id = match *next_id {
            Some(id) => id,
            None => self.load()?.last().map_or(1, |r| r.id + 1),
        };

        let record = HistoryRecord {
            id,
            content_type: draft.content_type,
            content_id: draft.content_id,
            action: draft.action,
            old_snapshot: draft.old_snapshot,
            new_snapshot: draft.new_snapshot,
            actor: draft.actor,
            timestamp: DateTimeUtc::now().to_rfc3339(),
            metadata: draft.metadata,
            restored_from: draft.restored_from,
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        self.write_line(&line).map_err(|source| HistoryError::Io {
            path: self.path.clone(),
            source,
        })?;

        *next_id = Some(id + 1);
        Ok(record)
    }

    /// All records, oldest first. A missing file is an empty history.
    pub fn load(&self) -> Result<Vec<HistoryRecord>, HistoryError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(HistoryError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let complete = content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        let mut records = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                // Interrupted final append
                Err(_) if !complete && i + 1 == lines.len() => {}
                Err(source) => {
                    return Err(HistoryError::Corrupt {
                        path: self.path.clone(),
                        line: i + 1,
                        source,
                    });
                }
            }
        }
        Ok(records)
    }

    /// Records for one content id, oldest first.
    pub fn for_content(&self, content_id: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        let mut records = self.load()?;
        records.retain(|r| r.content_id == content_id);
        Ok(records)
    }

    pub fn get(&self, id: u64) -> Result<Option<HistoryRecord>, HistoryError> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let existing = fs::read(&self.path)?;
        if existing.last().is_some_and(|&c| c != b'\n') {
            let start = existing.iter().rposition(|&c| c == b'\n').map_or(0, |i| i + 1);
            if serde_json::from_slice::<HistoryRecord>(&existing[start..]).is_ok() {
                // A complete record that only lost its newline stays
                file.write_all(b"\n")?;
            } else {
                // Tail of an interrupted append; it was never acknowledged
                file.set_len(start as u64)?;
            }
        }
        file.write_all(line.as_bytes())?;
        file.sync_data()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn draft(content_id: &str, old: &str, new: &str) -> Draft {
        Draft {
            content_type: "heading".into(),
            content_id: content_id.into(),
            action: Action::Update,
            old_snapshot: old.into(),
            new_snapshot: new.into(),
            actor: "alice".into(),
            metadata: BTreeMap::from([("locale".to_string(), Value::from("en"))]),
            restored_from: None,
        }
    }

    #[test]
    fn test_append_assigns_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join(".inplace/history.jsonl"));

        let a = store.append(draft("hero", "Welcome", "Hello")).unwrap();
        let b = store.append(draft("cta", "Buy", "Shop")).unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(DateTimeUtc::parse(&a.timestamp).is_some());

        // A fresh store continues after the last id on disk
        let reopened = HistoryStore::new(store.path());
        let c = reopened.append(draft("hero", "Hello", "Hi")).unwrap();
        assert_eq!(c.id, 3);
        assert_eq!(reopened.load().unwrap().len(), 3);
    }

    #[test]
    fn test_for_content_and_get() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.jsonl"));
        store.append(draft("hero", "A", "B")).unwrap();
        store.append(draft("cta", "X", "Y")).unwrap();
        store.append(draft("hero", "B", "C")).unwrap();

        let hero = store.for_content("hero").unwrap();
        assert_eq!(hero.len(), 2);
        assert_eq!(hero[1].new_snapshot, "C");
        assert_eq!(store.get(2).unwrap().unwrap().content_id, "cta");
        assert!(store.get(9).unwrap().is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("none.jsonl"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_record_json_shape() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.jsonl"));
        store.append(draft("hero", "A", "B")).unwrap();

        let line = fs::read_to_string(store.path()).unwrap();
        let json: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(json["contentId"], "hero");
        assert_eq!(json["action"], "update");
        assert_eq!(json["oldSnapshot"], "A");
        assert_eq!(json["metadata"]["locale"], "en");
        assert!(json.get("restoredFrom").is_none());
    }

    #[test]
    fn test_interrupted_append_is_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = HistoryStore::new(&path);
        store.append(draft("hero", "A", "B")).unwrap();

        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("{\"id\":2,\"conte");
        fs::write(&path, content).unwrap();

        let store = HistoryStore::new(&path);
        assert_eq!(store.load().unwrap().len(), 1);
        let next = store.append(draft("hero", "B", "C")).unwrap();
        assert_eq!(next.id, 2);

        let records = HistoryStore::new(&path).load().unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_record_missing_newline_is_kept() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = HistoryStore::new(&path);
        store.append(draft("hero", "A", "B")).unwrap();
        store.append(draft("hero", "B", "C")).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        fs::write(&path, content.trim_end_matches('\n')).unwrap();

        let store = HistoryStore::new(&path);
        assert_eq!(store.load().unwrap().len(), 2);
        let next = store.append(draft("hero", "C", "D")).unwrap();
        assert_eq!(next.id, 3);

        let records = HistoryStore::new(&path).load().unwrap();
        assert_eq!(records.iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(records[1].new_snapshot, "C");
    }

    #[test]
    fn test_corrupt_line_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.jsonl");
        fs::write(&path, "not json\n").unwrap();
        assert!(matches!(
            HistoryStore::new(&path).load(),
            Err(HistoryError::Corrupt { line: 1, .. })
        ));
    }
}
