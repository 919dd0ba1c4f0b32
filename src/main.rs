//! inplace - find editable regions in rendered html and patch edits back
//! into the template sources.

#![allow(dead_code)]

mod cli;
mod config;
mod edit;
mod guard;
mod history;
mod logger;
mod patch;
mod scan;
mod utils;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::{Cli, Commands};
use config::{EditorConfig, init_config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose());

    let config = init_config(EditorConfig::load(&cli)?);
    if cli.writes() && config.config_path.as_os_str().is_empty() {
        log!("warning"; "no {} found, editing sources under {}", cli.config.display(), config.get_root().display());
    }

    match &cli.command {
        Commands::Scan { args } => cli::scan::run_scan(args, &config),
        Commands::Annotate { args } => cli::annotate::run_annotate(args, &config),
        Commands::Update { args } => cli::update::run_update(args, &config),
        Commands::Apply { args } => cli::update::run_apply(args, &config),
        Commands::History { args } => cli::history::run_history(args, &config),
        Commands::Restore { args } => cli::history::run_restore(args, &config),
    }
}
