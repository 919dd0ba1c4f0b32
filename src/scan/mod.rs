//! Editable-region scanning.
//!
//! # Pipeline
//!
//! ```text
//! raw markup
//!   └── marker::extract     strip source markers, keep regions
//!         └── dom::Document::parse
//!               └── Classifier::classify_document   (post-order, rules)
//!                     ├── identity::identify        (editable only)
//!                     └── SourceMap::resolve        (file, line hint)
//!                           └── ScanResult
//! ```
//!
//! Scanning is pure: no I/O, no shared state. Everything a caller needs to
//! persist (new ids, collisions) comes back in the [`ScanResult`].
//!
//! # Modules
//!
//! | Module     | Purpose                                         |
//! |------------|-------------------------------------------------|
//! | `dom`      | Owned element tree over `tl`                    |
//! | `marker`   | Source marker extraction and resolution         |
//! | `rules`    | Ordered classification rules                    |
//! | `classify` | Rule runner                                     |
//! | `identity` | Content addresses                               |
//! | `annotate` | `data-cms-*` wire attributes                    |
//! | `report`   | Human-readable diagnostic pass                  |

pub mod annotate;
pub mod classify;
pub mod dom;
pub mod element;
pub mod identity;
pub mod marker;
pub mod report;
pub mod rules;
pub mod wire;

#[cfg(test)]
mod tests;

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;

pub use annotate::annotate;
pub use classify::Classifier;
pub use element::{Classification, DynamicReason, EditableType, IgnoreReason, ScannedElement};

use crate::config::ScanConfig;
use dom::Document;
use identity::{IdentityInput, identify};

/// Scan parameters besides the markup.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub locale: Option<String>,
    /// Keep only editable elements of these types.
    pub types: Option<Vec<EditableType>>,
}

/// Counts over the returned elements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub total: usize,
    /// Editable elements per type.
    pub by_type: BTreeMap<&'static str, usize>,
    pub editable: usize,
    pub components: usize,
    pub ignored: usize,
}

/// Everything one scan produced.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    pub elements: Vec<ScannedElement>,
    pub stats: ScanStats,
    /// Ids generated by this scan (not read from a previous annotation).
    pub pending_ids: Vec<String>,
    /// Ids carried by more than one element, with their counts.
    pub collisions: BTreeMap<String, usize>,
    /// Source end markers without a begin.
    pub unmatched_markers: usize,
    /// Marker-stripped markup the element offsets refer to.
    #[serde(skip)]
    pub markup: String,
}

impl ScanResult {
    pub fn editable(&self) -> impl Iterator<Item = &ScannedElement> {
        self.elements
            .iter()
            .filter(|el| el.classification.is_editable())
    }

    pub fn find(&self, content_id: &str) -> Option<&ScannedElement> {
        self.elements
            .iter()
            .find(|el| el.content_id.as_deref() == Some(content_id))
    }
}

/// Scan rendered markup.
pub fn scan(raw: &str, config: &ScanConfig, options: &ScanOptions) -> ScanResult {
    let extracted = marker::extract(raw);
    let markup = extracted.markup;
    let map = extracted.map;
    let doc = Document::parse(&markup);

    let mut elements: Vec<ScannedElement> = Classifier::new(config)
        .classify_document(&doc)
        .into_iter()
        .map(|(node, verdict)| {
            let tag = doc.tag(node).to_string();
            let text = doc.text(node);
            let element = doc.element(node);
            let offset = element.and_then(|el| el.offset);
            let attr = |name: &str| doc.attr(node, name).unwrap_or("");

            let classification = verdict.classification;
            let (content_id, generated) = match classification.editable_type() {
                Some(editable_type) => {
                    let identity = identify(&IdentityInput {
                        editable_type,
                        text: &text,
                        src: attr("src"),
                        href: attr("href"),
                        class: attr("class"),
                        existing: doc.attr(node, wire::ID),
                    });
                    (Some(identity.id), identity.generated)
                }
                None => (None, false),
            };

            let text_snapshot = match classification.editable_type() {
                Some(EditableType::Image) => attr("src").to_string(),
                _ => text,
            };
            let message = match &classification {
                Classification::Component { reason } => Some(reason.message()),
                _ => None,
            };
            let source = offset.and_then(|offset| map.resolve(&markup, offset));

            ScannedElement {
                tag,
                text_snapshot,
                attributes: doc.attrs(node).iter().cloned().collect(),
                classification,
                rule: verdict.rule,
                message,
                content_id,
                source_file: source.as_ref().map(|s| s.file_path.clone()),
                line_hint: source.and_then(|s| s.line),
                offset,
                generated_id: generated,
            }
        })
        .collect();

    if let Some(types) = &options.types {
        elements.retain(|el| {
            el.classification
                .editable_type()
                .is_some_and(|t| types.contains(&t))
        });
    }

    let stats = stats(&elements);
    let (pending_ids, collisions) = id_bookkeeping(&elements);

    ScanResult {
        locale: options.locale.clone(),
        elements,
        stats,
        pending_ids,
        collisions,
        unmatched_markers: map.unmatched,
        markup,
    }
}

fn stats(elements: &[ScannedElement]) -> ScanStats {
    let mut stats = ScanStats {
        total: elements.len(),
        ..ScanStats::default()
    };
    for el in elements {
        match &el.classification {
            Classification::Editable { editable_type } => {
                stats.editable += 1;
                *stats.by_type.entry(editable_type.as_str()).or_default() += 1;
            }
            Classification::Component { .. } => stats.components += 1,
            Classification::Ignored { .. } => stats.ignored += 1,
        }
    }
    stats
}

/// New ids in first-seen order, and ids seen more than once.
fn id_bookkeeping(elements: &[ScannedElement]) -> (Vec<String>, BTreeMap<String, usize>) {
    let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
    let mut pending = Vec::new();

    for el in elements {
        let Some(id) = el.content_id.as_deref() else {
            continue;
        };
        let count = counts.entry(id).or_default();
        *count += 1;
        if *count == 1 && el.generated_id {
            pending.push(id.to_string());
        }
    }

    let collisions = counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, n)| (id.to_string(), n))
        .collect();
    (pending, collisions)
}
