//! Logging context for sparchive.
//!
//! Output goes through an explicit [`Logger`] value instead of global state.
//! The binary builds one from the `--verbose` flag and hands copies to every
//! component; tests use [`Logger::silent`] so nothing is printed.

use std::{fmt, time::Duration};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

/// How much output a [`Logger`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Silent,
    Normal,
    Verbose,
}

/// A cheap, copyable logging handle.
///
/// The `info!`, `success!`, `warning!`, `error!` and `debug!` macros exported
/// from the crate root all take a `Logger` as their first argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Logger {
    level: Level,
}

impl Logger {
    pub fn new(verbose: bool) -> Self {
        Self {
            level: if verbose {
                Level::Verbose
            } else {
                Level::Normal
            },
        }
    }

    pub fn silent() -> Self {
        Self {
            level: Level::Silent,
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        if self.level >= Level::Normal {
            println!("[{}] {}", "o".blue().bold(), args);
        }
    }

    pub fn success(&self, args: fmt::Arguments<'_>) {
        if self.level >= Level::Normal {
            println!("[{}] {}", "✓".green().bold(), args);
        }
    }

    pub fn warning(&self, args: fmt::Arguments<'_>) {
        if self.level >= Level::Normal {
            println!("[{}] {}", "!".yellow().bold(), args);
        }
    }

    /// Errors go to stderr.
    pub fn error(&self, args: fmt::Arguments<'_>) {
        if self.level >= Level::Normal {
            eprintln!("[{}] {}", "!".red().bold(), args);
        }
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        if self.level >= Level::Verbose {
            println!("[{}] {}", "·".dimmed(), args.to_string().dimmed());
        }
    }

    /// Creates a progress bar for `len` steps.
    ///
    /// Silent loggers get a hidden bar so callers never branch on the level.
    pub fn progress(&self, len: u64, message: &str) -> ProgressBar {
        if self.level == Level::Silent {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg} [{pos}/{len}]") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(false)
    }
}
