//! Shared helpers: HTML text handling, hashing, dates, paths.

pub mod date;
pub mod hash;
pub mod html;
pub mod path;
mod plural;

pub use plural::{plural_count, plural_s};
