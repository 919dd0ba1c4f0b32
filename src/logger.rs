//! Logging utilities with colored output and progress display.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` macro, printed only with `--verbose`
//! - `ProgressLine` for single-line progress display with multiple counters
//!
//! Everything is written to stderr: stdout carries the JSON responses of the
//! scan and update commands and must stay machine-readable.
//!
//! # Example
//!
//! ```ignore
//! log!("patch"; "updated {} in {}", id, file.display());
//!
//! let progress = ProgressLine::new("apply", &[("updates", 12)]);
//! progress.inc("updates");
//! progress.finish();
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stderr},
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

/// Active progress line count (for log coordination)
static BAR_COUNT: AtomicUsize = AtomicUsize::new(0);

// ============================================================================
// Log Macro
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
///
/// # Usage
/// ```ignore
/// debug!("module"; "debug info: {}", value);
/// ```
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
#[allow(clippy::cast_possible_truncation)] // Safe: bars count is always small
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut out = stderr().lock();

    let bar_count = BAR_COUNT.load(Ordering::SeqCst);
    if bar_count > 0 {
        execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
    }

    writeln!(out, "{prefix} {message}").ok();
    out.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "scan" | "annotate" => prefix.bright_blue().bold().to_string(),
        "patch" | "restore" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "warning" => prefix.bright_magenta().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Progress Line (single-line counters)
// ============================================================================

/// Single-line progress display with multiple counters
///
/// Displays: `[apply] updates(4/12) failed(1/12)`
///
/// All counters update in place on the same line. Uses `try_lock` to avoid
/// blocking worker threads - if display is busy, the update is skipped
pub struct ProgressLine {
    module: &'static str,
    counters: Vec<Counter>,
    lock: Mutex<()>,
}

struct Counter {
    name: &'static str,
    total: usize,
    current: AtomicUsize,
}

impl ProgressLine {
    /// Create a new progress display.
    ///
    /// Only includes counters with total > 0.
    pub fn new(module: &'static str, items: &[(&'static str, usize)]) -> Self {
        let counters: Vec<_> = items
            .iter()
            .filter(|(_, total)| *total > 0)
            .map(|(name, total)| Counter {
                name,
                total: *total,
                current: AtomicUsize::new(0),
            })
            .collect();

        BAR_COUNT.store(1, Ordering::SeqCst);

        let progress = Self {
            module,
            counters,
            lock: Mutex::new(()),
        };
        progress.display(false);
        progress
    }

    /// Increment the counter with the given name.
    ///
    /// Non-blocking: if display lock is held, skips refresh.
    #[inline]
    pub fn inc(&self, name: &str) {
        let Some(counter) = self.counters.iter().find(|c| c.name == name) else {
            return;
        };
        counter.current.fetch_add(1, Ordering::Relaxed);
        if self.lock.try_lock().is_some() {
            self.display(false);
        }
    }

    fn render(&self) -> String {
        self.counters
            .iter()
            .map(|c| format!("{}({}/{})", c.name, c.current.load(Ordering::Relaxed), c.total))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Display the current progress line, optionally ending it with a newline.
    fn display(&self, newline: bool) {
        let line = self.render();
        let prefix = colorize_prefix(self.module, self.module);

        let mut out = stderr().lock();
        execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        if newline {
            writeln!(out, "{prefix} {line}").ok();
        } else {
            write!(out, "{prefix} {line}").ok();
        }
        out.flush().ok();
    }

    /// Finish progress display, preserve line and move to next line.
    pub fn finish(self) {
        BAR_COUNT.store(0, Ordering::SeqCst);
        {
            let _guard = self.lock.lock(); // Wait for any pending display
            self.display(true);
        }
        std::mem::forget(self); // Prevent Drop from clearing
    }
}

impl Drop for ProgressLine {
    fn drop(&mut self) {
        BAR_COUNT.store(0, Ordering::SeqCst);

        // Clear the line on drop (if not finished properly)
        let mut out = stderr().lock();
        execute!(out, cursor::MoveToColumn(0), Clear(ClearType::CurrentLine)).ok();
        out.flush().ok();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_skips_empty_counters() {
        let progress = ProgressLine::new("apply", &[("updates", 3), ("failed", 0)]);
        assert_eq!(progress.counters.len(), 1);
        progress.inc("updates");
        progress.inc("unknown");
        assert_eq!(progress.render(), "updates(1/3)");
        progress.finish();
    }

    #[test]
    fn test_verbose_flag() {
        set_verbose(true);
        assert!(is_verbose());
        set_verbose(false);
        assert!(!is_verbose());
    }
}
