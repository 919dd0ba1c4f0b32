//! `history` and `restore` commands.

use anyhow::{Result, bail};

use super::args::{HistoryArgs, RestoreArgs};
use super::common::print_json;
use crate::config::EditorConfig;
use crate::edit::{EditService, UpdateResponse};
use crate::log;
use crate::utils::plural_count;

pub fn run_history(args: &HistoryArgs, config: &EditorConfig) -> Result<()> {
    let service = EditService::new(config);
    let records = service.history_of(&args.content_id)?;
    crate::debug!("history"; "{} for `{}`", plural_count(records.len(), "record"), args.content_id);
    print_json(&records, args.pretty)
}

pub fn run_restore(args: &RestoreArgs, config: &EditorConfig) -> Result<()> {
    let service = EditService::new(config);
    let result = service.restore(args.history_id, &args.edit.actor);
    print_json(&UpdateResponse::from(&result), args.edit.pretty)?;

    match result {
        Ok(applied) => {
            match applied.history_id {
                Some(id) => log!("restore"; "record {} undone as record {}", args.history_id, id),
                None => log!("restore"; "record {} already undone", args.history_id),
            }
            Ok(())
        }
        Err(err) => bail!("{}: {}", err.code(), err),
    }
}
