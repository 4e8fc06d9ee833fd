use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{config, error::SetupError};

pub const PROD_PLAYLISTS_DIR: &str = "playlists";
pub const TEST_PLAYLISTS_DIR: &str = "_playlists";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotDirKind {
    Prod,
    Test,
}

/// Resolves snapshot directories relative to the repository root.
#[derive(Debug, Clone)]
pub struct Environment {
    start: PathBuf,
    canonical_name: String,
}

impl Environment {
    pub fn new(start: impl Into<PathBuf>, canonical_name: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            canonical_name: canonical_name.into(),
        }
    }

    pub fn from_config() -> Result<Self, SetupError> {
        let cwd = std::env::current_dir().map_err(|source| SetupError::Io {
            path: PathBuf::from("."),
            source,
        })?;
        Ok(Self::new(cwd, config::repo_name()))
    }

    /// Nearest ancestor of the start directory (itself included) holding a
    /// `.git` entry. Its directory name must match the canonical name.
    pub fn repo_root(&self) -> Result<PathBuf, SetupError> {
        let root = self
            .start
            .ancestors()
            .find(|dir| dir.join(".git").exists())
            .ok_or_else(|| SetupError::RootNotFound {
                start: self.start.clone(),
                reason: "no ancestor contains a .git entry".to_string(),
            })?;

        let name = root.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name != self.canonical_name {
            return Err(SetupError::RootNotFound {
                start: self.start.clone(),
                reason: format!(
                    "repository at {} is named {:?}, expected {:?}",
                    root.display(),
                    name,
                    self.canonical_name
                ),
            });
        }
        Ok(root.to_path_buf())
    }

    pub fn get_snapshot_dir(&self, kind: SnapshotDirKind) -> Result<PathBuf, SetupError> {
        let root = self.repo_root()?;
        match kind {
            SnapshotDirKind::Prod => Ok(root.join(PROD_PLAYLISTS_DIR)),
            SnapshotDirKind::Test => {
                ensure_ignored(&root, TEST_PLAYLISTS_DIR)?;
                Ok(root.join(TEST_PLAYLISTS_DIR))
            }
        }
    }
}

// Test fixtures must never be committed, so the test directory has to be
// listed verbatim in .gitignore.
fn ensure_ignored(root: &Path, dir_name: &str) -> Result<(), SetupError> {
    let gitignore = root.join(".gitignore");
    let content = fs::read_to_string(&gitignore).map_err(|source| SetupError::Io {
        path: gitignore.clone(),
        source,
    })?;
    let entry = format!("{}/", dir_name);
    if content.lines().any(|line| line.trim_end() == entry) {
        Ok(())
    } else {
        Err(SetupError::InvariantViolation(format!(
            "{} is not listed in {}",
            entry,
            gitignore.display()
        )))
    }
}
