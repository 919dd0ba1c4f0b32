//! `[scan]` section configuration.
//!
//! Tunes the classifier heuristics. Every vocabulary here is a best-effort
//! pattern list for one ecosystem's conventions, so all of them can be
//! replaced per project.
//!
//! # Example
//!
//! ```toml
//! [scan]
//! loop_threshold = 3          # identical siblings that mark a loop
//! loop_depth = 3              # ancestor levels checked for loops
//! listing_prefixes = ["product-", "post-", "comment-", "category-"]
//! tooling_prefixes = ["cms-"]
//! ```

use serde::{Deserialize, Serialize};

use crate::config::types::{ConfigDiagnostics, FieldPath};

/// Classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Tags reported by a scan. Everything else is only structure.
    pub candidate_tags: Vec<String>,

    /// Structurally identical siblings (inclusive) that mark loop output.
    pub loop_threshold: usize,

    /// How many levels (element, parent, ...) the loop check climbs.
    pub loop_depth: usize,

    /// Tags counted as loop items even without classes or child elements.
    pub loop_item_tags: Vec<String>,

    /// Class prefixes of database listings.
    pub listing_prefixes: Vec<String>,

    /// Attributes naming a database record.
    pub record_attributes: Vec<String>,

    /// Treat any `data-<name>-id` attribute as a record attribute.
    pub record_id_suffix: bool,

    /// Container attributes declaring a collection.
    pub collection_attributes: Vec<String>,

    /// Class/id tokens of pagination widgets.
    pub pagination_tokens: Vec<String>,

    /// Class/id tokens of header, footer and navigation regions. A token
    /// matches itself and its `-*`/`_*` variants, never a `*-` suffix.
    pub header_footer_tokens: Vec<String>,

    /// Class tokens of dropdown libraries.
    pub dropdown_markers: Vec<String>,

    /// Class/id prefixes reserved for injected editor tooling.
    pub tooling_prefixes: Vec<String>,

    /// Attributes that mark UI widgets the editor must never touch.
    pub reserved_ui_attributes: Vec<String>,
}

impl ScanConfig {
    pub const CANDIDATE_TAGS: FieldPath = FieldPath::new("scan.candidate_tags");
    pub const LOOP_THRESHOLD: FieldPath = FieldPath::new("scan.loop_threshold");
    pub const LOOP_DEPTH: FieldPath = FieldPath::new("scan.loop_depth");

    /// Whether a lowercase tag name is reported by scans.
    pub fn is_candidate(&self, tag: &str) -> bool {
        self.candidate_tags.iter().any(|t| t == tag)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.candidate_tags.is_empty() {
            diag.error_with_hint(
                Self::CANDIDATE_TAGS,
                "must not be empty",
                "remove the key to use the defaults",
            );
        }
        if self.loop_threshold < 2 {
            diag.error(Self::LOOP_THRESHOLD, "must be at least 2");
        }
        if self.loop_depth == 0 {
            diag.error(Self::LOOP_DEPTH, "must be at least 1");
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            candidate_tags: strings(&[
                "h1", "h2", "h3", "h4", "h5", "h6", "p", "span", "a", "img", "li", "td", "th",
                "dt", "dd", "button", "label", "blockquote", "figcaption", "caption", "strong",
                "em", "b", "i", "small", "div", "section", "article",
            ]),
            loop_threshold: 3,
            loop_depth: 3,
            loop_item_tags: strings(&["li", "tr", "td", "th", "dt", "dd", "option"]),
            listing_prefixes: strings(&[
                "product-", "post-", "comment-", "category-", "review-", "listing-", "result-",
            ]),
            record_attributes: strings(&[
                "data-id",
                "data-record",
                "data-record-id",
                "data-entity",
                "data-model",
                "data-key",
            ]),
            record_id_suffix: true,
            collection_attributes: strings(&[
                "data-items",
                "data-collection",
                "data-results",
                "data-loop",
                "data-foreach",
            ]),
            pagination_tokens: strings(&["pagination", "pager", "page-numbers", "load-more"]),
            header_footer_tokens: strings(&[
                "header",
                "footer",
                "nav",
                "navbar",
                "navigation",
                "topbar",
                "breadcrumb",
                "breadcrumbs",
                "site-header",
                "site-footer",
                "site-nav",
                "main-header",
                "main-footer",
                "main-nav",
                "global-header",
                "global-footer",
                "global-nav",
            ]),
            dropdown_markers: strings(&[
                "dropdown",
                "dropdown-menu",
                "dropdown-item",
                "select2",
                "choices",
                "tom-select",
                "chosen-container",
                "nice-select",
            ]),
            tooling_prefixes: strings(&["cms-"]),
            reserved_ui_attributes: strings(&[
                "data-cms-ui",
                "data-cms-toolbar",
                "data-cms-panel",
                "data-cms-ignore",
            ]),
        }
    }
}
