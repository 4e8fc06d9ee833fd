//! Error types for every stage of the update pipeline.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::types::PlaylistId;

/// Fatal problems detected before any playlist is fetched.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("repository root not found from {start}: {reason}")]
    RootNotFound { start: PathBuf, reason: String },

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("missing configuration: {0} must be set")]
    Config(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A failed upstream call for a single playlist.
///
/// Cloneable so it can be stored in the run's error mapping and reported
/// after the fetch tasks have finished.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited (retry after {retry_after}s)")]
    RateLimited { retry_after: u64 },

    #[error("authentication failed: {0}")]
    AuthFailure(String),

    #[error("transient failure: {0}")]
    Transient(String),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NotFound(_) => "not_found",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::AuthFailure(_) => "auth_failure",
            FetchError::Transient(_) => "transient",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FetchError::Transient(format!("request timed out: {}", err));
        }
        FetchError::Transient(err.to_string())
    }
}

/// The owned-playlists listing failed. Never fatal.
#[derive(Debug, Clone, Error)]
#[error("playlist discovery failed: {0}")]
pub struct DiscoveryError(#[from] pub FetchError);

/// A cache entry could not be read or written.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed cache entry: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("cache entry checksum mismatch for {0}")]
    ChecksumMismatch(PlaylistId),

    #[error("cache entry for {found} stored under key {expected}")]
    IdMismatch {
        expected: PlaylistId,
        found: PlaylistId,
    },
}

/// Snapshot directory reads and writes.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed snapshot file {path}: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid playlist ID: {0:?}")]
    InvalidPlaylistId(String),

    #[error("invalid alias: {0:?}")]
    InvalidAlias(String),

    #[error("malformed alias for {id}: {content:?}")]
    MalformedAlias { id: PlaylistId, content: String },

    #[error("unexpected files in snapshot directory: {}", display_paths(.0))]
    UnexpectedFiles(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Why a single playlist was skipped in a run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaylistError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to store snapshot: {0}")]
    Storage(String),
}

impl PlaylistError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlaylistError::Fetch(e) => e.kind(),
            PlaylistError::Storage(_) => "storage",
        }
    }
}

/// Committing or pushing the snapshot directory failed.
#[derive(Debug, Error)]
pub enum CommitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] io::Error),

    #[error("`git {args}` exited with {status}: {stderr}")]
    Git {
        args: String,
        status: String,
        stderr: String,
    },
}

pub(crate) fn storage_io(path: impl Into<PathBuf>, source: io::Error) -> StorageError {
    StorageError::Io {
        path: path.into(),
        source,
    }
}

pub(crate) fn cache_io(path: impl Into<PathBuf>, source: io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}
