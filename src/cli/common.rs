//! Common utilities shared across CLI commands.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{Context, Result, bail};
use jwalk::WalkDir;
use serde::Serialize;

/// Input arguments that mean "read stdin".
const STDIN: &str = "-";

/// Extensions of rendered pages picked up when a directory is scanned.
const PAGE_EXTENSIONS: &[&str] = &["html", "htm"];

/// Expand directories into the pages they contain.
///
/// Files, urls and `-` pass through unchanged; directory entries come out
/// sorted so repeated runs print the same order.
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<String>> {
    let mut expanded = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = Path::new(input);
        if is_url(input) || input == STDIN || !path.is_dir() {
            expanded.push(input.clone());
            continue;
        }

        let mut pages: Vec<String> = WalkDir::new(path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && is_page(&entry.path()))
            .map(|entry| entry.path().to_string_lossy().into_owned())
            .collect();
        pages.sort();

        if pages.is_empty() {
            crate::log!("warning"; "no html files under {}", path.display());
        }
        expanded.extend(pages);
    }
    Ok(expanded)
}

/// Read one input: a file, an http(s) url, or `-` for stdin.
pub fn read_input(input: &str) -> Result<String> {
    if input == STDIN {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    if is_url(input) {
        return fetch(input);
    }
    fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
}

fn fetch(url: &str) -> Result<String> {
    crate::debug!("fetch"; "GET {}", url);
    let response = reqwest::blocking::get(url).with_context(|| format!("Failed to fetch {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("{url} answered {status}");
    }
    response
        .text()
        .with_context(|| format!("Failed to read body of {url}"))
}

/// Print `value` as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    println!("{}", to_json(value, pretty)?);
    Ok(())
}

pub fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

fn is_page(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PAGE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_expand_inputs_walks_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("blog")).unwrap();
        fs::write(dir.path().join("index.html"), "<p>a</p>").unwrap();
        fs::write(dir.path().join("blog/post.HTM"), "<p>b</p>").unwrap();
        fs::write(dir.path().join("style.css"), "p {}").unwrap();

        let root = dir.path().to_string_lossy().into_owned();
        let expanded = expand_inputs(&[root, "-".into(), "https://example.com".into()]).unwrap();

        assert_eq!(expanded.len(), 4);
        assert!(expanded[0].ends_with("post.HTM"));
        assert!(expanded[1].ends_with("index.html"));
        assert_eq!(&expanded[2..], ["-", "https://example.com"]);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_input("/definitely/not/here.html").unwrap_err();
        assert!(err.to_string().contains("not/here.html"));
    }

    #[test]
    fn test_to_json() {
        let value = serde_json::json!({"a": 1});
        assert_eq!(to_json(&value, false).unwrap(), r#"{"a":1}"#);
        assert!(to_json(&value, true).unwrap().contains('\n'));
    }
}
