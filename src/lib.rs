//! Spotify Playlist Archive Library
//!
//! This library snapshots Spotify playlists into a version-controlled
//! directory tree. Each run fetches the tracked playlists, merges changed
//! state into per-playlist history files and, when running in CI, commits
//! and pushes the result.
//!
//! # Modules
//!
//! - `cli` - Command-line entry points and run summary
//! - `committer` - CI-gated commit and push of the snapshot directory
//! - `config` - Configuration management and environment variables
//! - `environment` - Repository root and snapshot directory resolution
//! - `error` - Error taxonomy shared by all components
//! - `formatter` - Plain text and Markdown renderings of snapshots
//! - `log` - Explicit logging context
//! - `management` - Snapshot files, cumulative views and the fetch cache
//! - `spotify` - Spotify Web API client implementation
//! - `types` - Data structures and type definitions
//! - `updater` - The update pipeline orchestrator
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use sparchive::{config, log::Logger};
//!
//! #[tokio::main]
//! async fn main() -> sparchive::Res<()> {
//!     let log = Logger::new(false);
//!     config::load_env(log).await;
//!     // Wire up the updater...
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod committer;
pub mod config;
pub mod environment;
pub mod error;
pub mod formatter;
pub mod log;
pub mod management;
pub mod spotify;
pub mod types;
pub mod updater;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used at the outermost layer (the binary and CLI wiring) where errors of
/// different components meet. Inner components return their own typed errors
/// from [`error`].
///
/// # Type Parameters
///
/// - `T` - The success type returned on successful operations
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// The first argument is the [`log::Logger`] to print through; the rest are
/// the same arguments `println!` accepts.
///
/// # Example
///
/// ```
/// info!(log, "Fetching {} playlists", count);
/// ```
#[macro_export]
macro_rules! info {
  ($log:expr, $($arg:tt)*) => ({
    $log.info(std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!(log, "Updated {} playlists", count);
/// ```
#[macro_export]
macro_rules! success {
  ($log:expr, $($arg:tt)*) => ({
    $log.success(std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark.
///
/// Unlike a plain `eprintln!`, this respects the logger's level. The caller
/// decides whether the error is fatal.
///
/// # Example
///
/// ```
/// error!(log, "Failed to push: {}", e);
/// ```
#[macro_export]
macro_rules! error {
  ($log:expr, $($arg:tt)*) => ({
    $log.error(std::format_args!($($arg)*));
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for recoverable issues, e.g. a failed discovery call or a cache
/// entry that could not be written.
///
/// # Example
///
/// ```
/// warning!(log, "Failed to fetch owned playlists: {}", e);
/// ```
#[macro_export]
macro_rules! warning {
  ($log:expr, $($arg:tt)*) => ({
    $log.warning(std::format_args!($($arg)*));
  })
}

/// Prints a dimmed debug message, only when the logger is verbose.
#[macro_export]
macro_rules! debug {
  ($log:expr, $($arg:tt)*) => ({
    $log.debug(std::format_args!($($arg)*));
  })
}
