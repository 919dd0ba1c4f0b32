//! In-memory match and replace.
//!
//! Pure: takes file content, returns the patched content or the reason no
//! patch is possible. All I/O lives in [`super::Patcher`].

use std::borrow::Cow;

use super::sanity;
use crate::utils::html::{escape, escape_attr};

/// What to replace.
#[derive(Debug, Clone, Copy)]
pub struct Replace<'a> {
    pub old: &'a str,
    pub new: &'a str,
    /// 1-based line near the intended occurrence.
    pub line_hint: Option<usize>,
    pub allow_multiple: bool,
    /// Also try the HTML-escaped forms when the literal text is absent.
    pub escaped_fallback: bool,
}

/// A successful plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned {
    pub content: String,
    pub occurrences: usize,
    /// 1-based line of the first replaced occurrence.
    pub line: usize,
    /// The escaped form matched instead of the literal text.
    pub escaped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    NotFound,
    Ambiguous { lines: Vec<usize> },
    SyntaxRisk { line: usize, reason: String },
}

/// Plan the replacement of `req.old` in `content`.
pub fn plan(content: &str, req: &Replace<'_>) -> Result<Planned, PlanError> {
    let (old, new, escaped, starts) = variants(req)
        .into_iter()
        .find_map(|(old, new, escaped)| {
            let starts: Vec<usize> = content.match_indices(old.as_ref()).map(|(i, _)| i).collect();
            (!starts.is_empty()).then_some((old, new, escaped, starts))
        })
        .ok_or(PlanError::NotFound)?;

    let lines = line_numbers(content, &starts);
    let chosen: Vec<(usize, usize)> = if starts.len() == 1 || req.allow_multiple {
        starts.into_iter().zip(lines).collect()
    } else {
        let index = nearest(&lines, req.line_hint).ok_or_else(|| PlanError::Ambiguous {
            lines: lines.clone(),
        })?;
        vec![(starts[index], lines[index])]
    };

    for &(start, line) in &chosen {
        sanity::check(content, start, &old, &new)
            .map_err(|reason| PlanError::SyntaxRisk { line, reason })?;
    }

    let mut out = String::with_capacity(content.len() + new.len() * chosen.len());
    let mut last = 0;
    for &(start, _) in &chosen {
        out.push_str(&content[last..start]);
        out.push_str(&new);
        last = start + old.len();
    }
    out.push_str(&content[last..]);

    Ok(Planned {
        content: out,
        occurrences: chosen.len(),
        line: chosen[0].1,
        escaped,
    })
}

/// Candidate `(old, new, escaped)` forms, in the order they are tried.
fn variants<'a>(req: &Replace<'a>) -> Vec<(Cow<'a, str>, Cow<'a, str>, bool)> {
    let mut out = vec![(Cow::Borrowed(req.old), Cow::Borrowed(req.new), false)];
    if !req.escaped_fallback {
        return out;
    }
    for (old, new) in [
        (escape(req.old), escape(req.new)),
        (escape_attr(req.old), escape_attr(req.new)),
    ] {
        if out.iter().all(|(seen, _, _)| *seen != old) {
            out.push((old, new, true));
        }
    }
    out
}

/// 1-based line of each (ascending) byte offset.
fn line_numbers(content: &str, starts: &[usize]) -> Vec<usize> {
    let mut line = 1;
    let mut pos = 0;
    starts
        .iter()
        .map(|&start| {
            line += content.as_bytes()[pos..start]
                .iter()
                .filter(|&&b| b == b'\n')
                .count();
            pos = start;
            line
        })
        .collect()
}

/// Index of the single line nearest `hint`. Ties and a missing hint give `None`.
fn nearest(lines: &[usize], hint: Option<usize>) -> Option<usize> {
    let hint = hint?;
    let best = lines.iter().map(|l| l.abs_diff(hint)).min()?;
    let mut winners = lines
        .iter()
        .enumerate()
        .filter(|(_, l)| l.abs_diff(hint) == best);
    let (index, _) = winners.next()?;
    winners.next().is_none().then_some(index)
}
