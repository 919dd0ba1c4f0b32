//! Content addresses for editable elements.
//!
//! | Type            | Address                                         |
//! |-----------------|-------------------------------------------------|
//! | image           | `img-` + fp(src basename without ext, src)      |
//! | link            | `link-` + fp(href, first 20 chars of text)      |
//! | heading / text  | fp(first 30 chars of text, class attribute)     |
//!
//! `fp` is an 8-hex-digit FxHash fingerprint, stable across processes. Ids are
//! short and can collide; collisions are reported per scan, not prevented.

use std::path::Path;

use super::element::EditableType;
use crate::utils::hash::fingerprint_parts;

const LINK_TEXT_CHARS: usize = 20;
const TEXT_CHARS: usize = 30;

/// What identity depends on.
#[derive(Debug, Clone, Copy)]
pub struct IdentityInput<'a> {
    pub editable_type: EditableType,
    /// Visible text, already collapsed.
    pub text: &'a str,
    pub src: &'a str,
    pub href: &'a str,
    pub class: &'a str,
    /// Id from a previous annotation.
    pub existing: Option<&'a str>,
}

/// Identity and whether it was newly generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub generated: bool,
}

/// Derive the content address of an element.
pub fn identify(input: &IdentityInput<'_>) -> Identity {
    if let Some(existing) = input.existing.map(str::trim).filter(|s| !s.is_empty()) {
        return Identity {
            id: existing.to_string(),
            generated: false,
        };
    }

    let id = match input.editable_type {
        EditableType::Image => {
            format!("img-{}", fingerprint_parts(&[image_stem(input.src), input.src]))
        }
        EditableType::Link => {
            let text = prefix_chars(input.text, LINK_TEXT_CHARS);
            format!("link-{}", fingerprint_parts(&[input.href, text]))
        }
        EditableType::Heading | EditableType::Text => {
            fingerprint_parts(&[prefix_chars(input.text, TEXT_CHARS), input.class])
        }
    };
    Identity { id, generated: true }
}

/// `/img/logo.png?v=2` -> `logo`
fn image_stem(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or("");
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
}

/// First `n` characters (not bytes).
fn prefix_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
