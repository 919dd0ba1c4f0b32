//! Command-line interface module.

mod args;
pub mod annotate;
pub mod common;
pub mod history;
pub mod scan;
pub mod update;

pub use args::{Cli, Commands};
