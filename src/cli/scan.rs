//! `scan` command.
//!
//! Inputs are independent, so they are read and scanned on the rayon pool.
//! JSON goes to stdout; the diagnostic report and summary go to stderr.

use anyhow::Result;
use rayon::prelude::*;
use serde_json::{Map, Value as JsonValue};

use super::args::ScanArgs;
use super::common::{expand_inputs, print_json, read_input};
use crate::config::EditorConfig;
use crate::log;
use crate::logger::ProgressLine;
use crate::scan::report::ScanReport;
use crate::scan::{ScanOptions, ScanResult, scan};

pub fn run_scan(args: &ScanArgs, config: &EditorConfig) -> Result<()> {
    let inputs = expand_inputs(&args.inputs)?;
    let options = ScanOptions {
        locale: args.locale.clone(),
        types: args.types.clone(),
    };

    let progress = (inputs.len() > 1).then(|| ProgressLine::new("scan", &[("pages", inputs.len())]));
    let results: Vec<(String, Result<ScanResult>)> = inputs
        .par_iter()
        .map(|input| {
            let result = read_input(input).map(|raw| scan(&raw, &config.scan, &options));
            if let Some(progress) = &progress {
                progress.inc("pages");
            }
            (input.clone(), result)
        })
        .collect();
    if let Some(progress) = progress {
        progress.finish();
    }

    let mut report = ScanReport::default();
    let mut scanned = Vec::with_capacity(results.len());
    for (input, result) in results {
        match result {
            Ok(result) => {
                report.add(input.clone(), &result);
                scanned.push((input, result));
            }
            Err(err) => log!("error"; "{:#}", err),
        }
    }
    if scanned.is_empty() {
        anyhow::bail!("nothing scanned");
    }

    if args.report {
        report.print();
    }
    log!("scan"; "{}", report);

    output(&scanned, args.pretty)
}

/// One input prints its result; several print an object keyed by input.
fn output(scanned: &[(String, ScanResult)], pretty: bool) -> Result<()> {
    if let [(_, result)] = scanned {
        return print_json(result, pretty);
    }

    let mut by_input = Map::new();
    for (input, result) in scanned {
        by_input.insert(input.clone(), serde_json::to_value(result)?);
    }
    print_json(&JsonValue::Object(by_input), pretty)
}
