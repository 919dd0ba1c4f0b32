//! `annotate` command.

use std::path::Path;

use anyhow::{Context, Result};

use super::args::AnnotateArgs;
use super::common::read_input;
use crate::config::EditorConfig;
use crate::log;
use crate::scan::annotate;
use crate::utils::plural_s;

pub fn run_annotate(args: &AnnotateArgs, config: &EditorConfig) -> Result<()> {
    let raw = read_input(&args.input)?;
    let annotated = annotate(&raw, &config.scan);

    let stats = &annotated.result.stats;
    crate::debug!("annotate"; "{} editable, {} component{}", stats.editable, stats.components, plural_s(stats.components));
    if !annotated.result.collisions.is_empty() {
        log!("warning"; "duplicate ids: {}", annotated.result.collisions.keys().cloned().collect::<Vec<_>>().join(", "));
    }

    match &args.output {
        Some(path) => write_output(path, &annotated.markup),
        None => {
            print!("{}", annotated.markup);
            Ok(())
        }
    }
}

fn write_output(path: &Path, markup: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, markup)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log!("annotate"; "wrote {}", path.display());
    Ok(())
}
