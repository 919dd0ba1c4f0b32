//! Source markers.
//!
//! Templates rendered in edit mode wrap each included file in comments:
//!
//! ```text
//! <!-- inplace:begin resources/views/home.blade.php:12 -->
//!   ...rendered output of home.blade.php...
//! <!-- inplace:end resources/views/home.blade.php -->
//! ```
//!
//! [`extract`] strips the comments before the DOM is built and records one
//! [`SourceRegion`] per begin/end pair in stripped-markup coordinates.
//! [`SourceMap::resolve`] then maps an element offset to the innermost region
//! around it.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*inplace:(begin|end)\s+(\S+?)\s*-->").unwrap()
});

/// A span of stripped markup rendered from one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRegion {
    pub file: PathBuf,
    /// Line in `file` where the region's output starts, if the marker gave one.
    pub line: Option<usize>,
    pub start: usize,
    pub end: usize,
    /// Nesting depth, 0 for outermost regions.
    pub depth: usize,
}

/// Resolved origin of an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMarker {
    pub file_path: PathBuf,
    pub line: Option<usize>,
}

/// Regions recovered from one document.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    pub regions: Vec<SourceRegion>,
    /// End markers without a matching begin.
    pub unmatched: usize,
}

/// Markup with markers removed, plus the regions they described.
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    pub markup: String,
    pub map: SourceMap,
}

struct Open {
    file: PathBuf,
    line: Option<usize>,
    start: usize,
}

/// Strip marker comments, recording their regions.
pub fn extract(raw: &str) -> Extracted {
    let mut markup = String::with_capacity(raw.len());
    let mut map = SourceMap::default();
    let mut stack: Vec<Open> = Vec::new();
    let mut last = 0;

    for caps in MARKER.captures_iter(raw) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        markup.push_str(&raw[last..whole.start]);
        last = whole.end;

        let (file, line) = split_line(&caps[2]);
        if &caps[1] == "begin" {
            stack.push(Open {
                file,
                line,
                start: markup.len(),
            });
            continue;
        }

        // Close the innermost open region for this file; anything opened
        // inside it without its own end closes here too.
        match stack.iter().rposition(|open| open.file == file) {
            Some(pos) => {
                while stack.len() > pos {
                    let depth = stack.len() - 1;
                    if let Some(open) = stack.pop() {
                        map.regions.push(region(open, markup.len(), depth));
                    }
                }
            }
            None => map.unmatched += 1,
        }
    }
    markup.push_str(&raw[last..]);

    // Unclosed regions run to the end
    while let Some(open) = stack.pop() {
        let depth = stack.len();
        map.regions.push(region(open, markup.len(), depth));
    }

    map.regions.sort_by_key(|r| (r.start, r.depth));
    Extracted { markup, map }
}

fn region(open: Open, end: usize, depth: usize) -> SourceRegion {
    SourceRegion {
        file: open.file,
        line: open.line,
        start: open.start,
        end,
        depth,
    }
}

/// Split `path:12` into path and line. A non-numeric suffix is part of the path.
fn split_line(token: &str) -> (PathBuf, Option<usize>) {
    match token.rsplit_once(':') {
        Some((path, line)) if !path.is_empty() && !line.is_empty() => match line.parse() {
            Ok(line) => (PathBuf::from(path), Some(line)),
            Err(_) => (PathBuf::from(token), None),
        },
        _ => (PathBuf::from(token), None),
    }
}

impl SourceMap {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Innermost region containing `offset`, with a line hint counted from
    /// the region start.
    pub fn resolve(&self, markup: &str, offset: usize) -> Option<SourceMarker> {
        let region = self
            .regions
            .iter()
            .filter(|r| r.start <= offset && offset < r.end)
            .max_by_key(|r| (r.depth, r.start))?;

        let line = region.line.map(|line| {
            let between = markup.get(region.start..offset).unwrap_or("");
            line + between.bytes().filter(|&b| b == b'\n').count()
        });

        Some(SourceMarker {
            file_path: region.file.clone(),
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_extract_strips_markers() {
        let raw = "<!-- inplace:begin views/home.html:3 --><h1>Hi</h1><!-- inplace:end views/home.html -->";
        let out = extract(raw);
        assert_eq!(out.markup, "<h1>Hi</h1>");
        assert_eq!(out.map.regions.len(), 1);
        let r = &out.map.regions[0];
        assert_eq!(r.file, Path::new("views/home.html"));
        assert_eq!(r.line, Some(3));
        assert_eq!((r.start, r.end), (0, out.markup.len()));
        assert_eq!(out.map.unmatched, 0);
    }

    #[test]
    fn test_no_markers_leaves_markup_untouched() {
        let raw = "<p>plain <!-- a normal comment --></p>";
        let out = extract(raw);
        assert_eq!(out.markup, raw);
        assert!(out.map.is_empty());
        assert_eq!(out.map.resolve(&out.markup, 3), None);
    }

    #[test]
    fn test_nested_regions_resolve_innermost() {
        let raw = concat!(
            "<!-- inplace:begin layout.html:1 -->\n<main>\n",
            "<!--inplace:begin partials/card.html:10-->\n<p>Card</p>\n<!--inplace:end partials/card.html-->\n",
            "<p>After</p>\n</main>\n<!-- inplace:end layout.html -->"
        );
        let out = extract(raw);
        assert_eq!(out.map.regions.len(), 2);

        let card = out.markup.find("<p>Card").unwrap();
        let marker = out.map.resolve(&out.markup, card).unwrap();
        assert_eq!(marker.file_path, Path::new("partials/card.html"));
        assert_eq!(marker.line, Some(11));

        let after = out.markup.find("<p>After").unwrap();
        let marker = out.map.resolve(&out.markup, after).unwrap();
        assert_eq!(marker.file_path, Path::new("layout.html"));
    }

    #[test]
    fn test_unclosed_begin_runs_to_end() {
        let out = extract("<!-- inplace:begin a.html --><p>x</p>");
        assert_eq!(out.map.regions[0].end, out.markup.len());
        assert_eq!(out.map.regions[0].line, None);
        let marker = out.map.resolve(&out.markup, 0).unwrap();
        assert_eq!(marker.line, None);
    }

    #[test]
    fn test_stray_end_is_counted() {
        let out = extract("<p>x</p><!-- inplace:end nowhere.html -->");
        assert_eq!(out.markup, "<p>x</p>");
        assert_eq!(out.map.unmatched, 1);
        assert!(out.map.is_empty());
    }

    #[test]
    fn test_split_line_suffix() {
        assert_eq!(split_line("a/b.php:42"), (PathBuf::from("a/b.php"), Some(42)));
        assert_eq!(split_line("a/b.php"), (PathBuf::from("a/b.php"), None));
        assert_eq!(split_line("a:b.php"), (PathBuf::from("a:b.php"), None));
    }
}
