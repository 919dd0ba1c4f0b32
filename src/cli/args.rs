//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

use crate::scan::EditableType;

/// Find editable regions in rendered html and patch edits back into the
/// template sources
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: inplace.toml)
    #[arg(short = 'C', long, default_value = "inplace.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Classify the elements of rendered pages and print them as JSON
    #[command(visible_alias = "s")]
    Scan {
        #[command(flatten)]
        args: ScanArgs,
    },

    /// Add data-cms-* attributes to a rendered page
    #[command(visible_alias = "a")]
    Annotate {
        #[command(flatten)]
        args: AnnotateArgs,
    },

    /// Apply one edit to the template sources
    #[command(visible_alias = "u")]
    Update {
        #[command(flatten)]
        args: UpdateArgs,
    },

    /// Apply a JSON batch of edits
    Apply {
        #[command(flatten)]
        args: ApplyArgs,
    },

    /// Show the edit history of a content id
    #[command(visible_alias = "h")]
    History {
        #[command(flatten)]
        args: HistoryArgs,
    },

    /// Undo an edit by restoring its old value
    Restore {
        #[command(flatten)]
        args: RestoreArgs,
    },
}

/// Scan command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ScanArgs {
    /// Html files, directories, http(s) urls, or `-` for stdin
    #[arg(value_name = "INPUT", required = true, value_hint = clap::ValueHint::AnyPath)]
    pub inputs: Vec<String>,

    /// Locale echoed in the output
    #[arg(short, long)]
    pub locale: Option<String>,

    /// Keep only editable elements of these types (comma-separated)
    #[arg(short, long, value_delimiter = ',', value_parser = parse_editable_type)]
    pub types: Option<Vec<EditableType>>,

    /// Print which rule decided each element (stderr)
    #[arg(short, long)]
    pub report: bool,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Annotate command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct AnnotateArgs {
    /// Html file, http(s) url, or `-` for stdin
    #[arg(value_name = "INPUT", value_hint = clap::ValueHint::FilePath)]
    pub input: String,

    /// Write output to file instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Update command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Content id (data-cms-id)
    #[arg(long)]
    pub id: String,

    /// Current text, as shown on the page
    #[arg(long, visible_alias = "old")]
    pub original: String,

    /// Replacement text
    #[arg(long)]
    pub value: String,

    /// Template source to patch (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub file: Option<PathBuf>,

    /// Line near the occurrence, to pick between several
    #[arg(short = 'n', long)]
    pub line: Option<usize>,

    #[arg(short, long)]
    pub locale: Option<String>,

    /// Editable type recorded in history
    #[arg(short, long = "type", value_parser = parse_editable_type)]
    pub content_type: Option<EditableType>,

    /// Replace every occurrence instead of requiring a unique one
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub edit: EditArgs,
}

/// Apply command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct ApplyArgs {
    /// JSON file with `{"updates": [...]}`, or `-` for stdin
    #[arg(value_name = "BATCH", value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,

    #[command(flatten)]
    pub edit: EditArgs,
}

/// History command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct HistoryArgs {
    /// Content id (data-cms-id)
    pub content_id: String,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

/// Restore command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct RestoreArgs {
    /// History record id to undo
    pub history_id: u64,

    #[command(flatten)]
    pub edit: EditArgs,
}

/// Shared arguments of the commands that write.
#[derive(clap::Args, Debug, Clone)]
pub struct EditArgs {
    /// Who is editing (recorded in history, used for rate limits)
    #[arg(long, default_value = "cli")]
    pub actor: String,

    /// Pretty-print JSON output
    #[arg(short, long)]
    pub pretty: bool,

    /// Enable verbose output for debugging
    #[arg(short = 'V', long)]
    pub verbose: bool,
}

fn parse_editable_type(s: &str) -> Result<EditableType, String> {
    EditableType::parse(s)
        .ok_or_else(|| format!("unknown type `{s}` (heading, image, link, text)"))
}

impl Cli {
    pub fn verbose(&self) -> bool {
        match &self.command {
            Commands::Scan { args } => args.verbose,
            Commands::Annotate { args } => args.verbose,
            Commands::History { args } => args.verbose,
            Commands::Update { args } => args.edit.verbose,
            Commands::Apply { args } => args.edit.verbose,
            Commands::Restore { args } => args.edit.verbose,
        }
    }

    pub const fn writes(&self) -> bool {
        matches!(
            self.command,
            Commands::Update { .. } | Commands::Apply { .. } | Commands::Restore { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from(["inplace", "scan", "a.html", "b.html", "--types", "heading,image", "-V"]);
        let Commands::Scan { args } = &cli.command else {
            panic!("expected scan");
        };
        assert_eq!(args.inputs, vec!["a.html", "b.html"]);
        assert_eq!(
            args.types,
            Some(vec![EditableType::Heading, EditableType::Image])
        );
        assert!(cli.verbose());
        assert_eq!(cli.config, PathBuf::from("inplace.toml"));
    }

    #[test]
    fn test_parse_update() {
        let cli = Cli::parse_from([
            "inplace", "-C", "site/inplace.toml", "update", "--id", "hero", "--original", "Welcome",
            "--value", "Hello", "--line", "12", "--actor", "alice",
        ]);
        let Commands::Update { args } = &cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.line, Some(12));
        assert_eq!(args.edit.actor, "alice");
        assert!(cli.writes());
    }

    #[test]
    fn test_rejects_unknown_type() {
        assert!(Cli::try_parse_from(["inplace", "scan", "a.html", "--types", "video"]).is_err());
    }
}
