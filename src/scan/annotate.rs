//! Wire representation.
//!
//! Rewrites the opening tag of every editable and component element so the
//! editor client can find them:
//!
//! ```text
//! <h1 class="title">Welcome</h1>
//! <h1 data-cms-editable="true" data-cms-type="heading" data-cms-id="3f2a9c01"
//!     data-cms-original="Welcome" class="title">Welcome</h1>
//! ```
//!
//! Only opening tags change; all other bytes of the marker-stripped markup
//! are kept as they were. Wire attributes from an earlier pass are dropped
//! before the new ones are written.

use super::element::{Classification, ScannedElement};
use super::{ScanOptions, ScanResult, scan, wire};
use crate::config::ScanConfig;
use crate::utils::html::escape_attr;

/// Annotated markup plus the scan it was built from.
#[derive(Debug, Clone)]
pub struct Annotated {
    pub markup: String,
    pub result: ScanResult,
}

/// Scan and annotate rendered markup.
pub fn annotate(raw: &str, config: &ScanConfig) -> Annotated {
    let result = scan(raw, config, &ScanOptions::default());
    let markup = apply(&result.markup, &result.elements);
    Annotated { markup, result }
}

/// Insert wire attributes for `elements` into `markup`.
pub fn apply(markup: &str, elements: &[ScannedElement]) -> String {
    let mut edits: Vec<(usize, usize, String)> = elements
        .iter()
        .filter_map(|el| {
            let attrs = wire_attributes(el)?;
            let start = el.offset?;
            let end = tag_end(markup, start)?;
            Some((start, end, rewrite_tag(&markup[start..end], &attrs)))
        })
        .collect();

    let mut out = markup.to_string();
    edits.sort_by_key(|(start, _, _)| std::cmp::Reverse(*start));
    for (start, end, tag) in edits {
        out.replace_range(start..end, &tag);
    }
    out
}

fn wire_attributes(el: &ScannedElement) -> Option<Vec<(&'static str, String)>> {
    match &el.classification {
        Classification::Editable { editable_type } => Some(vec![
            (wire::EDITABLE, "true".to_string()),
            (wire::TYPE, editable_type.to_string()),
            (wire::ID, el.content_id.clone().unwrap_or_default()),
            (wire::ORIGINAL, el.text_snapshot.clone()),
        ]),
        Classification::Component { reason } => Some(vec![
            (wire::COMPONENT, "true".to_string()),
            (wire::MESSAGE, reason.message()),
        ]),
        Classification::Ignored { .. } => None,
    }
}

/// Index of the `>` closing the tag opened at `start`, quote-aware.
fn tag_end(markup: &str, start: usize) -> Option<usize> {
    let bytes = markup.as_bytes();
    if bytes.get(start) != Some(&b'<') {
        return None;
    }
    let mut quote: Option<u8> = None;
    for (i, &b) in bytes.iter().enumerate().skip(start + 1) {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            (None, _) => {}
        }
    }
    None
}

/// `tag` is `<name ...` without the closing `>`.
fn rewrite_tag(tag: &str, attrs: &[(&'static str, String)]) -> String {
    let name_end = tag[1..]
        .find(|c: char| c.is_ascii_whitespace() || c == '/')
        .map_or(tag.len(), |i| i + 1);

    let mut out = String::with_capacity(tag.len() + 128);
    out.push_str(&tag[..name_end]);
    for (key, value) in attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }

    let rest = &tag[name_end..];
    let mut last = 0;
    for (name, span) in attribute_spans(rest) {
        if wire::is_wire_attribute(name) {
            out.push_str(&rest[last..span.start]);
            last = span.end;
        }
    }
    out.push_str(&rest[last..]);
    out
}

/// Attribute names with their spans (leading whitespace included).
fn attribute_spans(s: &str) -> Vec<(&str, std::ops::Range<usize>)> {
    let bytes = s.as_bytes();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'/' {
            i += 1;
            continue;
        }

        let name_start = i;
        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && !matches!(bytes[i], b'=' | b'/')
        {
            i += 1;
        }
        let name = &s[name_start..i];

        let mut j = i;
        while j < bytes.len() && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j < bytes.len() && bytes[j] == b'=' {
            j += 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            match bytes.get(j) {
                Some(&q @ (b'"' | b'\'')) => {
                    j += 1;
                    while j < bytes.len() && bytes[j] != q {
                        j += 1;
                    }
                    j = (j + 1).min(bytes.len());
                }
                _ => {
                    while j < bytes.len() && !bytes[j].is_ascii_whitespace() {
                        j += 1;
                    }
                }
            }
            i = j;
        }

        if name.is_empty() {
            i = i.max(start + 1);
            continue;
        }
        spans.push((name, start..i));
    }
    spans
}
