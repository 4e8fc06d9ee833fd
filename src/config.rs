//! Configuration management for the playlist archive.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. Secrets such as the Spotify access
//! token never come from command-line flags.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the current directory
//! 3. `.env` file in the local data directory
//! 4. Application defaults (where applicable)

use std::{env, path::PathBuf};

use crate::{debug, error::SetupError, log::Logger};

pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_REPO_NAME: &str = "spotify-playlist-archive";

/// Loads environment variables from a `.env` file.
///
/// Looks in the current directory first and falls back to the
/// platform-specific local data directory:
/// - Linux: `~/.local/share/sparchive/.env`
/// - macOS: `~/Library/Application Support/sparchive/.env`
/// - Windows: `%LOCALAPPDATA%/sparchive/.env`
///
/// A missing file is not an error: in CI the variables usually come from the
/// job's environment directly. Existing environment variables are never
/// overridden.
///
/// # Example
///
/// ```
/// use sparchive::{config, log::Logger};
///
/// #[tokio::main]
/// async fn main() {
///     config::load_env(Logger::new(false)).await;
/// }
/// ```
pub async fn load_env(log: Logger) {
    let local = PathBuf::from(".env");
    if async_fs::metadata(&local).await.is_ok() {
        match dotenv::from_path(&local) {
            Ok(()) => debug!(log, "Loaded environment from {}", local.display()),
            Err(e) => debug!(log, "Cannot load {}: {}", local.display(), e),
        }
        return;
    }

    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("sparchive/.env");
    match dotenv::from_path(&path) {
        Ok(()) => debug!(log, "Loaded environment from {}", path.display()),
        Err(_) => debug!(log, "No .env file found, using process environment"),
    }
}

/// Returns the bearer token used for Spotify Web API requests.
///
/// Retrieves the `SPOTIFY_ACCESS_TOKEN` environment variable. Issuing and
/// refreshing the token happens outside of this tool, typically in a CI step
/// that runs before the archive job.
///
/// # Errors
///
/// Returns [`SetupError::Config`] if the variable is unset or empty.
pub fn spotify_access_token() -> Result<String, SetupError> {
    required("SPOTIFY_ACCESS_TOKEN")
}

/// Returns the Spotify Web API base URL.
///
/// Reads `SPOTIFY_API_URL`, defaulting to [`DEFAULT_SPOTIFY_API_URL`]. Tests
/// point this at a local mock server.
pub fn spotify_apiurl() -> String {
    optional("SPOTIFY_API_URL").unwrap_or_else(|| DEFAULT_SPOTIFY_API_URL.to_string())
}

/// Returns the expected directory name of the repository root.
///
/// Reads `SPARCHIVE_REPO_NAME`, defaulting to [`DEFAULT_REPO_NAME`].
pub fn repo_name() -> String {
    optional("SPARCHIVE_REPO_NAME").unwrap_or_else(|| DEFAULT_REPO_NAME.to_string())
}

/// Whether the process runs inside a CI job.
///
/// True when `GITHUB_ACTIONS` or `CI` is set to `true`.
pub fn is_ci() -> bool {
    ci_signal(|name| env::var(name).ok())
}

/// Evaluates the CI signal against an arbitrary variable lookup.
pub fn ci_signal<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    ["GITHUB_ACTIONS", "CI"]
        .iter()
        .any(|name| lookup(name).is_some_and(|v| v.eq_ignore_ascii_case("true")))
}

fn required(name: &str) -> Result<String, SetupError> {
    optional(name).ok_or_else(|| SetupError::Config(name.to_string()))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
