//! HTML utility functions.
//!
//! Provides common HTML processing functions:
//! - `escape()`, `escape_attr()`, `unescape()` - HTML entity handling
//! - `collapse_whitespace()` - visible-text normalization
//! - `is_opaque_element()` - parser helper
//! - `is_heading()`, `is_media_element()` - editable type helpers

use std::borrow::Cow;

// =============================================================================
// HTML Escaping
// =============================================================================

/// Characters escaped in text content.
const TEXT_ESCAPE_CHARS: [char; 3] = ['<', '>', '&'];

/// Characters escaped in attribute values.
const ATTR_ESCAPE_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Get the HTML entity for a special character.
#[inline]
fn escape_char(c: char) -> Option<&'static str> {
    match c {
        '<' => Some("&lt;"),
        '>' => Some("&gt;"),
        '&' => Some("&amp;"),
        '"' => Some("&quot;"),
        '\'' => Some("&#39;"),
        _ => None,
    }
}

/// Escape HTML special characters in text content.
///
/// Quotes are left alone: template sources usually keep them literal in text,
/// and the escaped form is used to find rendered text inside those sources.
///
/// # Example
/// ```ignore
/// assert_eq!(escape("Tom & Jerry"), "Tom &amp; Jerry");
/// assert_eq!(escape("hello"), "hello"); // No allocation
/// ```
#[inline]
pub fn escape(s: &str) -> Cow<'_, str> {
    escape_with(s, &TEXT_ESCAPE_CHARS)
}

/// Escape HTML attribute values (quotes included).
#[inline]
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape_with(s, &ATTR_ESCAPE_CHARS)
}

#[inline]
fn escape_with<'a>(s: &'a str, chars: &[char]) -> Cow<'a, str> {
    if !s.contains(chars) {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match escape_char(c).filter(|_| chars.contains(&c)) {
            Some(entity) => result.push_str(entity),
            None => result.push(c),
        }
    }
    Cow::Owned(result)
}

/// Unescape HTML entities back to characters.
///
/// Handles common named entities and numeric character references.
/// Unknown entities are kept verbatim.
pub fn unescape(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('&') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        // Entities are short; anything longer is literal text
        let Some(end) = tail.find(';').filter(|&end| {
            end > 0 && end <= 10 && tail[..end].chars().all(|c| c.is_ascii_alphanumeric() || c == '#')
        }) else {
            result.push('&');
            rest = tail;
            continue;
        };

        match decode_entity(&tail[..end]) {
            Some(c) => result.push(c),
            None => {
                result.push('&');
                result.push_str(&tail[..=end]);
            }
        }
        rest = &tail[end + 1..];
    }
    result.push_str(rest);

    Cow::Owned(result)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{00A0}'),
        s if s.starts_with("#x") || s.starts_with("#X") => {
            u32::from_str_radix(&s[2..], 16).ok().and_then(char::from_u32)
        }
        s if s.starts_with('#') => s[1..].parse().ok().and_then(char::from_u32),
        _ => None,
    }
}

/// Collapse runs of whitespace (including non-breaking spaces) into a single
/// space and trim both ends, the way a browser renders inline text.
pub fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split(|c: char| c.is_whitespace() || c == '\u{00A0}') {
        if word.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

// =============================================================================
// Element Classification
// =============================================================================

/// Elements whose content is never visible page text.
///
/// Scanning does not descend into these.
#[inline]
pub fn is_opaque_element(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "template" | "noscript" | "head" | "svg" | "iframe"
    )
}

/// `h1` through `h6`.
#[inline]
pub fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

/// Media elements may be editable without any text content.
#[inline]
pub fn is_media_element(tag: &str) -> bool {
    matches!(tag, "img" | "picture" | "video" | "audio" | "source")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape("hello world"), "hello world");
        assert!(matches!(escape("hello"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_escape_text_keeps_quotes() {
        assert_eq!(escape("<b>"), "&lt;b&gt;");
        assert_eq!(escape("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(escape("it's \"fine\""), "it's \"fine\"");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("normal"), "normal");
        assert_eq!(escape_attr("a\"b&c"), "a&quot;b&amp;c");
        assert_eq!(escape_attr("it's"), "it&#39;s");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("hello"), "hello");
        assert_eq!(unescape("&lt;script&gt;"), "<script>");
        assert_eq!(unescape("a &amp; b"), "a & b");
        assert_eq!(unescape("&quot;hi&quot;"), "\"hi\"");
        assert_eq!(unescape("&#39;"), "'");
        assert_eq!(unescape("&#x27;"), "'");
        assert_eq!(unescape("&#65;"), "A");
        assert_eq!(unescape("&nbsp;"), "\u{00A0}");
    }

    #[test]
    fn test_unescape_keeps_unknown_and_bare_ampersands() {
        assert_eq!(unescape("&bogus;"), "&bogus;");
        assert_eq!(unescape("R&D"), "R&D");
        assert_eq!(unescape("a & b &amp; c"), "a & b & c");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Hello \n\t world  "), "Hello world");
        assert_eq!(collapse_whitespace("a\u{00A0}\u{00A0}b"), "a b");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_element_helpers() {
        assert!(is_opaque_element("script"));
        assert!(!is_opaque_element("p"));
        assert!(is_heading("h3"));
        assert!(!is_heading("header"));
        assert!(is_media_element("video"));
        assert!(!is_media_element("a"));
    }
}
