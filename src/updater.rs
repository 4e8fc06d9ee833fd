//! The update pipeline.
//!
//! One call to [`FileUpdater::run`] walks through these stages:
//!
//! ```text
//! Init → Discovering → Fetching → Merging → Reporting → Done
//! ```
//!
//! - **Init**: the snapshot directory layout is created if missing, empty
//!   alias files are normalized and stray files are rejected.
//! - **Discovering**: the tracked set is read from disk and, with
//!   auto-register on, extended with newly owned playlists. Discovery
//!   failures are logged and the run goes on with what is already tracked.
//!   Aliases of all tracked playlists are read; a malformed one is fatal.
//! - **Fetching**: every tracked playlist goes through the cache, with a
//!   bounded number of requests in flight. Failures are per playlist.
//! - **Merging**: successful fetches are renamed after their alias, if any,
//!   and merged one by one, in ID order.
//! - **Reporting**: a [`RunResult`] is handed back; per-playlist errors never
//!   fail the run. Whether to commit is the caller's decision.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::{sync::Semaphore, task::JoinSet};

use crate::{
    debug, error,
    error::{DiscoveryError, FetchError, PlaylistError, StorageError},
    info,
    log::Logger,
    management::{FileManager, PlaylistCache},
    spotify::PlaylistSource,
    types::{PlaylistId, PlaylistSnapshot},
    warning,
};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Outcome of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    /// Whether the snapshot directory was modified.
    pub changed: bool,
    /// Playlists fetched successfully.
    pub fetched: usize,
    /// Playlists registered by this run.
    pub registered: Vec<PlaylistId>,
    pub errors: BTreeMap<PlaylistId, PlaylistError>,
}

impl RunResult {
    pub fn errors_by_kind(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for error in self.errors.values() {
            *counts.entry(error.kind()).or_insert(0) += 1;
        }
        counts
    }
}

pub struct FileUpdater {
    file_manager: FileManager,
    cache: Arc<dyn PlaylistCache>,
    source: Arc<dyn PlaylistSource>,
    auto_register: bool,
    concurrency: usize,
    log: Logger,
}

impl FileUpdater {
    /// `cache` is expected to wrap the same `source`; the source is used
    /// directly only for discovery.
    pub fn new(
        file_manager: FileManager,
        cache: Arc<dyn PlaylistCache>,
        source: Arc<dyn PlaylistSource>,
        log: Logger,
    ) -> Self {
        Self {
            file_manager,
            cache,
            source,
            auto_register: false,
            concurrency: DEFAULT_CONCURRENCY,
            log,
        }
    }

    pub fn auto_register(mut self, enabled: bool) -> Self {
        self.auto_register = enabled;
        self
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn file_manager(&self) -> &FileManager {
        &self.file_manager
    }

    pub fn cache(&self) -> &Arc<dyn PlaylistCache> {
        &self.cache
    }

    /// Runs one full update cycle. `now` stamps every new history entry.
    ///
    /// Only problems with the snapshot directory itself (unreadable, stray
    /// files, malformed aliases) are returned as errors; everything per
    /// playlist ends up in [`RunResult::errors`].
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunResult, StorageError> {
        self.file_manager.ensure_subdirs_exist().await?;
        self.file_manager.fixup_aliases().await?;

        let mut tracked = self.file_manager.list_tracked_ids().await?;
        self.file_manager.ensure_no_unexpected_files(&tracked).await?;

        let registered = if self.auto_register {
            self.discover(&mut tracked).await
        } else {
            Vec::new()
        };
        let aliases = self.file_manager.read_aliases(&tracked).await?;
        info!(self.log, "Tracking {} playlists", tracked.len());

        let (fetched, mut errors) = self.fetch_all(&tracked).await;
        let fetched_count = fetched.len();

        let mut changed = !registered.is_empty();
        for (id, snapshot) in fetched {
            let snapshot = snapshot.with_alias(aliases.get(&id));
            match self.file_manager.merge(&id, &snapshot, now).await {
                Ok(true) => {
                    info!(self.log, "Updated {} ({})", snapshot.name, id);
                    changed = true;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(self.log, "Failed to store {}: {}", id, e);
                    errors.insert(id, PlaylistError::Storage(e.to_string()));
                }
            }
        }

        Ok(RunResult {
            changed,
            fetched: fetched_count,
            registered,
            errors,
        })
    }

    /// Registers owned playlists that are not tracked yet. Best effort: any
    /// failure leaves the tracked set as it was.
    async fn discover(&self, tracked: &mut BTreeSet<PlaylistId>) -> Vec<PlaylistId> {
        let owned = match self.source.fetch_owned_playlist_ids().await {
            Ok(owned) => owned,
            Err(e) => {
                warning!(self.log, "{}", DiscoveryError::from(e));
                return Vec::new();
            }
        };
        debug!(self.log, "Upstream reports {} owned playlists", owned.len());

        let mut registered = Vec::new();
        for id in owned {
            if tracked.contains(&id) {
                continue;
            }
            match self.file_manager.register(&id).await {
                Ok(created) => {
                    if created {
                        registered.push(id.clone());
                    }
                    tracked.insert(id);
                }
                Err(e) => warning!(self.log, "Failed to register {}: {}", id, e),
            }
        }
        registered
    }

    async fn fetch_all(
        &self,
        ids: &BTreeSet<PlaylistId>,
    ) -> (
        BTreeMap<PlaylistId, PlaylistSnapshot>,
        BTreeMap<PlaylistId, PlaylistError>,
    ) {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let pb = self.log.progress(ids.len() as u64, "Fetching playlists");
        let mut set = JoinSet::new();

        for id in ids {
            let id = id.clone();
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);
            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (id, Err(FetchError::Transient("fetch pool closed".to_string())));
                };
                let result = cache.get_or_fetch(&id).await;
                (id, result)
            });
        }

        let mut fetched = BTreeMap::new();
        let mut errors = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            pb.inc(1);
            match joined {
                Ok((id, Ok(snapshot))) => {
                    fetched.insert(id, snapshot);
                }
                Ok((id, Err(e))) => {
                    pb.suspend(|| warning!(self.log, "Failed to fetch {}: {}", id, e));
                    errors.insert(id, PlaylistError::Fetch(e));
                }
                Err(e) => pb.suspend(|| error!(self.log, "Fetch task failed: {}", e)),
            }
        }
        pb.finish_and_clear();

        // A panicked task takes its ID with it; account for it here.
        for id in ids {
            if !fetched.contains_key(id) && !errors.contains_key(id) {
                errors.insert(
                    id.clone(),
                    PlaylistError::Fetch(FetchError::Transient("fetch task aborted".to_string())),
                );
            }
        }

        (fetched, errors)
    }
}
