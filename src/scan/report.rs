//! Diagnostic report for `scan --report`.
//!
//! Kept apart from classification: the classifier returns verdicts, this
//! module explains them.

use std::collections::BTreeMap;
use std::fmt;

use owo_colors::OwoColorize;

use super::ScanResult;
use super::element::Classification;
use crate::utils::plural_s;

const SNIPPET_CHARS: usize = 40;

/// A single reported element.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub tag: String,
    pub snippet: String,
    pub rule: &'static str,
    pub label: String,
    pub editable: bool,
    pub component: bool,
}

/// Scan verdicts grouped by input.
#[derive(Debug, Default)]
pub struct ScanReport {
    pub inputs: BTreeMap<String, Vec<ReportEntry>>,
    /// Colliding ids per input.
    pub collisions: BTreeMap<String, Vec<String>>,
    pub unmatched_markers: usize,
}

impl ScanReport {
    /// Add the verdicts of one input.
    pub fn add(&mut self, source: String, result: &ScanResult) {
        let entries = result
            .elements
            .iter()
            .map(|el| ReportEntry {
                tag: el.tag.clone(),
                snippet: snippet(&el.text_snapshot),
                rule: el.rule,
                label: el.classification.label(),
                editable: el.classification.is_editable(),
                component: matches!(el.classification, Classification::Component { .. }),
            })
            .collect();
        if !result.collisions.is_empty() {
            self.collisions
                .insert(source.clone(), result.collisions.keys().cloned().collect());
        }
        self.unmatched_markers += result.unmatched_markers;
        self.inputs.insert(source, entries);
    }

    pub fn count(&self, pred: impl Fn(&ReportEntry) -> bool) -> usize {
        self.inputs.values().flatten().filter(|e| pred(*e)).count()
    }

    /// Print the full report to stderr.
    pub fn print(&self) {
        for (source, entries) in &self.inputs {
            eprintln!();
            eprintln!("{}{}{}", "[".dimmed(), source.cyan(), "]".dimmed());
            for e in entries {
                let label = if e.editable {
                    e.label.green().to_string()
                } else if e.component {
                    e.label.yellow().to_string()
                } else {
                    e.label.dimmed().to_string()
                };
                eprintln!(
                    "{} <{}> {} {} {}",
                    "→".dimmed(),
                    e.tag,
                    format!("{:?}", e.snippet).dimmed(),
                    label,
                    format!("({})", e.rule).dimmed()
                );
            }
        }

        for (source, ids) in &self.collisions {
            eprintln!(
                "{} {} {}",
                "collision".red().bold(),
                source.cyan(),
                ids.join(", ")
            );
        }
        if self.unmatched_markers > 0 {
            eprintln!(
                "{} {} unmatched end marker{}",
                "warning".magenta().bold(),
                self.unmatched_markers,
                plural_s(self.unmatched_markers)
            );
        }
    }
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let editable = self.count(|e| e.editable);
        let components = self.count(|e| e.component);
        let ignored = self.count(|e| !e.editable && !e.component);
        write!(
            f,
            "{} editable, {} component{}, {} ignored",
            editable.to_string().green().bold(),
            components.to_string().yellow().bold(),
            plural_s(components),
            ignored.to_string().dimmed()
        )
    }
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
