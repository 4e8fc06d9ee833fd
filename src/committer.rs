use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::process::Command;

use crate::{debug, error::CommitError, info, log::Logger, success};

/// The version-control operations the committer needs.
#[async_trait]
pub trait VersionControl: Send + Sync {
    async fn has_changes(&self, path: &Path) -> Result<bool, CommitError>;

    async fn stage(&self, path: &Path) -> Result<(), CommitError>;

    async fn commit(&self, message: &str) -> Result<(), CommitError>;

    async fn push(&self) -> Result<(), CommitError>;
}

/// Runs the `git` binary inside a repository.
pub struct GitCli {
    repo_root: PathBuf,
    log: Logger,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            repo_root: repo_root.into(),
            log,
        }
    }

    async fn run(&self, args: &[&str]) -> Result<String, CommitError> {
        debug!(self.log, "Running: git {}", args.join(" "));
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_root)
            .args(args)
            .output()
            .await?;
        debug!(self.log, "Exited with: {}", output.status);

        if !output.status.success() {
            return Err(CommitError::Git {
                args: args.join(" "),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl VersionControl for GitCli {
    async fn has_changes(&self, path: &Path) -> Result<bool, CommitError> {
        let path = path.to_string_lossy().into_owned();
        let status = self
            .run(&["status", "--porcelain", "--untracked-files=all", "--", path.as_str()])
            .await?;
        Ok(!status.trim().is_empty())
    }

    async fn stage(&self, path: &Path) -> Result<(), CommitError> {
        let path = path.to_string_lossy().into_owned();
        self.run(&["add", "--all", "--", path.as_str()]).await.map(|_| ())
    }

    async fn commit(&self, message: &str) -> Result<(), CommitError> {
        self.run(&["commit", "--no-verify", "-m", message])
            .await
            .map(|_| ())
    }

    async fn push(&self) -> Result<(), CommitError> {
        self.run(&["push"]).await.map(|_| ())
    }
}

/// What [`Committer::commit_and_push_if_ci`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Unchanged,
    NotCi,
    NothingToCommit,
    Pushed,
}

/// Commits and pushes the snapshot directory, only from CI.
pub struct Committer<V: VersionControl> {
    vcs: V,
    playlists_dir: PathBuf,
    ci: bool,
    log: Logger,
}

impl<V: VersionControl> Committer<V> {
    pub fn new(vcs: V, playlists_dir: impl Into<PathBuf>, ci: bool, log: Logger) -> Self {
        Self {
            vcs,
            playlists_dir: playlists_dir.into(),
            ci,
            log,
        }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Local runs never commit. A failed push is an error: leaving an
    /// unpushed commit behind would tangle the next scheduled run.
    pub async fn commit_and_push_if_ci(
        &self,
        changed: bool,
        now: DateTime<Utc>,
    ) -> Result<CommitOutcome, CommitError> {
        if !changed {
            debug!(self.log, "No playlist changed, skipping commit");
            return Ok(CommitOutcome::Unchanged);
        }
        if !self.ci {
            info!(self.log, "Not running in CI, skipping commit and push");
            return Ok(CommitOutcome::NotCi);
        }
        if !self.vcs.has_changes(&self.playlists_dir).await? {
            info!(self.log, "Working tree is clean, nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }

        self.vcs.stage(&self.playlists_dir).await?;
        self.vcs.commit(&commit_message(now)).await?;
        self.vcs.push().await?;
        success!(self.log, "Committed and pushed playlist updates");
        Ok(CommitOutcome::Pushed)
    }
}

pub fn commit_message(now: DateTime<Utc>) -> String {
    format!("Updated playlists: {}", now.format("%Y-%m-%d %H:%M:%S UTC"))
}
