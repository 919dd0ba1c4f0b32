//! `update` and `apply` commands.

use anyhow::{Context, Result, bail};

use super::args::{ApplyArgs, UpdateArgs};
use super::common::{print_json, read_input};
use crate::config::EditorConfig;
use crate::edit::{BulkRequest, EditService, UpdateItem, UpdateResponse};
use crate::log;
use crate::utils::plural_count;

/// Apply one edit. The response is printed either way; a failure also fails
/// the command.
pub fn run_update(args: &UpdateArgs, config: &EditorConfig) -> Result<()> {
    let item = UpdateItem {
        id: args.id.clone(),
        value: args.value.clone(),
        original: Some(args.original.clone()),
        locale: args.locale.clone(),
        file_path: args.file.clone(),
        line_number: args.line,
        content_type: args.content_type,
        allow_multiple: args.all,
        ..UpdateItem::default()
    };

    let service = EditService::new(config);
    let result = service.update(item, &args.edit.actor);
    print_json(&UpdateResponse::from(&result), args.edit.pretty)?;

    match result {
        Ok(applied) if applied.history_id.is_none() => {
            log!("update"; "`{}` unchanged", args.id);
            Ok(())
        }
        Ok(applied) => {
            let outcome = &applied.outcome;
            log!("update"; "`{}` in {} ({})",
                args.id,
                config.root_relative(&outcome.file).display(),
                plural_count(outcome.occurrences, "occurrence"));
            Ok(())
        }
        Err(err) => bail!("{}: {}", err.code(), err),
    }
}

/// Apply a batch. Items fail independently; the command fails if any did.
pub fn run_apply(args: &ApplyArgs, config: &EditorConfig) -> Result<()> {
    let input = args.input.to_string_lossy();
    let raw = read_input(&input)?;
    let request: BulkRequest =
        serde_json::from_str(&raw).with_context(|| format!("Invalid batch in {input}"))?;

    let service = EditService::new(config);
    let response = match service.bulk(request.updates, &args.edit.actor) {
        Ok(response) => response,
        Err(err) => bail!("{}: {}", err.code(), err),
    };
    print_json(&response, args.edit.pretty)?;

    for error in response.errors.iter().flatten() {
        log!("error"; "#{} `{}` {}: {}", error.index, error.id, error.code, error.message);
    }
    let summary = response.summary;
    log!("apply"; "{} applied, {} failed", summary.successful, summary.failed);

    if summary.failed > 0 {
        bail!("{} of {} failed", summary.failed, plural_count(summary.total, "update"));
    }
    Ok(())
}
