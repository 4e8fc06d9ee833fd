use std::{
    collections::{BTreeMap, BTreeSet},
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::{
    debug,
    error::{StorageError, storage_io},
    formatter, info,
    log::Logger,
    management::CumulativeManager,
    types::{
        Alias, CumulativePlaylist, FollowerHistory, HistoryEntry, PlaylistId, PlaylistSnapshot,
        SnapshotComparison, SnapshotHistory,
    },
    utils,
};

const HISTORY_DIR: &str = "history";
const PLAIN_DIR: &str = "plain";
const PRETTY_DIR: &str = "pretty";
const CUMULATIVE_DIR: &str = "cumulative";
const FOLLOWERS_DIR: &str = "followers";
const ALIASES_DIR: &str = "aliases";

/// Owns the snapshot directory.
///
/// `history/<id>.json` is the source of truth and doubles as the registry of
/// tracked playlists. `plain/`, `pretty/` and `cumulative/` are views derived
/// from it whenever a new history entry is appended, `followers/` logs the
/// follower count per day, and `aliases/<id>` optionally holds a one-line
/// display name. Nothing here deletes.
pub struct FileManager {
    playlists_dir: PathBuf,
    comparison: SnapshotComparison,
    log: Logger,
}

impl FileManager {
    pub fn new(playlists_dir: impl Into<PathBuf>, log: Logger) -> Self {
        Self {
            playlists_dir: playlists_dir.into(),
            comparison: SnapshotComparison::default(),
            log,
        }
    }

    pub fn with_comparison(mut self, comparison: SnapshotComparison) -> Self {
        self.comparison = comparison;
        self
    }

    pub fn playlists_dir(&self) -> &Path {
        &self.playlists_dir
    }

    pub async fn ensure_subdirs_exist(&self) -> Result<(), StorageError> {
        for dir in [
            HISTORY_DIR,
            PLAIN_DIR,
            PRETTY_DIR,
            CUMULATIVE_DIR,
            FOLLOWERS_DIR,
            ALIASES_DIR,
        ] {
            let path = self.playlists_dir.join(dir);
            async_fs::create_dir_all(&path)
                .await
                .map_err(|e| storage_io(&path, e))?;
        }
        Ok(())
    }

    pub async fn list_tracked_ids(&self) -> Result<BTreeSet<PlaylistId>, StorageError> {
        let mut ids = BTreeSet::new();
        for name in list_file_names(&self.playlists_dir.join(HISTORY_DIR)).await? {
            let id = name
                .strip_suffix(".json")
                .and_then(|stem| PlaylistId::new(stem).ok());
            match id {
                Some(id) => {
                    ids.insert(id);
                }
                None => debug!(self.log, "Ignoring unexpected file in history: {}", name),
            }
        }
        Ok(ids)
    }

    pub async fn read_history(
        &self,
        id: &PlaylistId,
    ) -> Result<Option<SnapshotHistory>, StorageError> {
        read_json(&self.history_path(id)).await
    }

    pub async fn read_latest(
        &self,
        id: &PlaylistId,
    ) -> Result<Option<PlaylistSnapshot>, StorageError> {
        Ok(self
            .read_history(id)
            .await?
            .and_then(|h| h.entries.into_iter().last())
            .map(|e| e.snapshot))
    }

    /// Creates an empty history for `id` unless one exists. Returns whether a
    /// file was created.
    pub async fn register(&self, id: &PlaylistId) -> Result<bool, StorageError> {
        let path = self.history_path(id);
        if async_fs::metadata(&path).await.is_ok() {
            return Ok(false);
        }

        info!(self.log, "Registering playlist: {}", id);
        write_json(&path, &SnapshotHistory::empty(id.clone())).await?;
        Ok(true)
    }

    /// Truncates alias files holding nothing but a newline, which is what
    /// web editors tend to save for an "empty" file.
    pub async fn fixup_aliases(&self) -> Result<(), StorageError> {
        let dir = self.playlists_dir.join(ALIASES_DIR);
        for name in list_file_names(&dir).await? {
            let path = dir.join(&name);
            let content = async_fs::read_to_string(&path)
                .await
                .map_err(|e| storage_io(&path, e))?;
            if content == "\n" {
                info!(self.log, "Truncating empty alias: {}", name);
                utils::atomic_write(&path, b"")
                    .await
                    .map_err(|e| storage_io(&path, e))?;
            }
        }
        Ok(())
    }

    /// The alias of `id`, if its alias file exists and is non-empty.
    ///
    /// A file with more than one line, or a line that is not a valid
    /// [`Alias`], is an error.
    pub async fn read_alias(&self, id: &PlaylistId) -> Result<Option<Alias>, StorageError> {
        let path = self.alias_path(id);
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(storage_io(&path, e)),
        };

        let malformed = || StorageError::MalformedAlias {
            id: id.clone(),
            content: content.clone(),
        };
        let lines: Vec<&str> = content.lines().collect();
        match lines.as_slice() {
            [] => Ok(None),
            [line] => Alias::new(*line).map(Some).map_err(|_| malformed()),
            _ => Err(malformed()),
        }
    }

    pub async fn read_aliases(
        &self,
        ids: &BTreeSet<PlaylistId>,
    ) -> Result<BTreeMap<PlaylistId, Alias>, StorageError> {
        let mut aliases = BTreeMap::new();
        for id in ids {
            if let Some(alias) = self.read_alias(id).await? {
                aliases.insert(id.clone(), alias);
            }
        }
        Ok(aliases)
    }

    /// Fails if a derived view, follower log or alias file belongs to no
    /// tracked playlist.
    pub async fn ensure_no_unexpected_files(
        &self,
        tracked: &BTreeSet<PlaylistId>,
    ) -> Result<(), StorageError> {
        let mut unexpected = Vec::new();
        for (dir, suffix) in [
            (PLAIN_DIR, ""),
            (PRETTY_DIR, ".md"),
            (CUMULATIVE_DIR, ".json"),
            (FOLLOWERS_DIR, ".json"),
            (ALIASES_DIR, ""),
        ] {
            let dir = self.playlists_dir.join(dir);
            for name in list_file_names(&dir).await? {
                let known = name
                    .strip_suffix(suffix)
                    .and_then(|stem| PlaylistId::new(stem).ok())
                    .is_some_and(|id| tracked.contains(&id));
                if !known {
                    unexpected.push(dir.join(name));
                }
            }
        }

        if unexpected.is_empty() {
            Ok(())
        } else {
            unexpected.sort();
            Err(StorageError::UnexpectedFiles(unexpected))
        }
    }

    /// Appends `snapshot` to the history of `id` unless it matches the
    /// latest entry, and logs its follower count. Returns whether anything
    /// was written.
    ///
    /// The history file is written last. If any earlier write fails the
    /// latest entry stays as it was, so the next run redoes the whole merge.
    pub async fn merge(
        &self,
        id: &PlaylistId,
        snapshot: &PlaylistSnapshot,
        recorded_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut history = self
            .read_history(id)
            .await?
            .unwrap_or_else(|| SnapshotHistory::empty(id.clone()));

        let unchanged = history
            .latest()
            .is_some_and(|latest| self.comparison.same(latest, snapshot));
        if unchanged {
            debug!(self.log, "Unchanged: {}", id);
            return self.record_followers(id, snapshot, recorded_at).await;
        }

        self.write_views(id, snapshot, recorded_at).await?;
        self.record_followers(id, snapshot, recorded_at).await?;

        history.entries.push(HistoryEntry {
            recorded_at,
            snapshot: snapshot.clone(),
        });
        write_json(&self.history_path(id), &history).await?;

        debug!(
            self.log,
            "Recorded {} ({} entries in history)",
            id,
            history.entries.len()
        );
        Ok(true)
    }

    async fn write_views(
        &self,
        id: &PlaylistId,
        snapshot: &PlaylistSnapshot,
        recorded_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let plain = self.plain_path(id);
        utils::write_if_changed(&plain, formatter::plain(snapshot).as_bytes())
            .await
            .map_err(|e| storage_io(&plain, e))?;

        let pretty = self.pretty_path(id);
        utils::write_if_changed(&pretty, formatter::markdown(id, snapshot).as_bytes())
            .await
            .map_err(|e| storage_io(&pretty, e))?;

        let cumulative_path = self.cumulative_path(id);
        let previous: Option<CumulativePlaylist> = read_json(&cumulative_path).await?;
        let cumulative =
            CumulativeManager::update(previous, id, snapshot, recorded_at.date_naive());
        write_json(&cumulative_path, &cumulative).await.map(|_| ())
    }

    async fn record_followers(
        &self,
        id: &PlaylistId,
        snapshot: &PlaylistSnapshot,
        recorded_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let Some(count) = snapshot.num_followers else {
            return Ok(false);
        };
        let path = self.followers_path(id);
        let mut followers: FollowerHistory = read_json(&path)
            .await?
            .unwrap_or_else(|| FollowerHistory::empty(id.clone()));
        followers.counts.insert(recorded_at.date_naive(), count);
        write_json(&path, &followers).await
    }

    pub fn history_path(&self, id: &PlaylistId) -> PathBuf {
        self.playlists_dir
            .join(HISTORY_DIR)
            .join(format!("{}.json", id))
    }

    pub fn plain_path(&self, id: &PlaylistId) -> PathBuf {
        self.playlists_dir.join(PLAIN_DIR).join(id.as_str())
    }

    pub fn pretty_path(&self, id: &PlaylistId) -> PathBuf {
        self.playlists_dir
            .join(PRETTY_DIR)
            .join(format!("{}.md", id))
    }

    pub fn cumulative_path(&self, id: &PlaylistId) -> PathBuf {
        self.playlists_dir
            .join(CUMULATIVE_DIR)
            .join(format!("{}.json", id))
    }

    pub fn followers_path(&self, id: &PlaylistId) -> PathBuf {
        self.playlists_dir
            .join(FOLLOWERS_DIR)
            .join(format!("{}.json", id))
    }

    pub fn alias_path(&self, id: &PlaylistId) -> PathBuf {
        self.playlists_dir.join(ALIASES_DIR).join(id.as_str())
    }
}

// Entry names of `dir`, sorted; a missing directory has none.
async fn list_file_names(dir: &Path) -> Result<Vec<String>, StorageError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(storage_io(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| storage_io(dir, e))? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let content = match async_fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(storage_io(path, e)),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| StorageError::Serde {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<bool, StorageError> {
    let json = utils::to_json_pretty(value).map_err(|source| StorageError::Serde {
        path: path.to_path_buf(),
        source,
    })?;
    utils::write_if_changed(path, json.as_bytes())
        .await
        .map_err(|e| storage_io(path, e))
}
