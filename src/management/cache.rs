use std::{
    fmt, io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    debug,
    error::{CacheError, FetchError, cache_io},
    log::Logger,
    spotify::PlaylistSource,
    types::{CacheEntry, PlaylistId, PlaylistSnapshot},
    utils, warning,
};

/// Fetches playlists through an optional memo layer.
#[async_trait]
pub trait PlaylistCache: Send + Sync {
    async fn get_or_fetch(&self, id: &PlaylistId) -> Result<PlaylistSnapshot, FetchError>;

    fn summary(&self) -> CacheSummary;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSummary {
    pub hits: usize,
    pub misses: usize,
    pub read_failures: usize,
    pub write_failures: usize,
}

impl fmt::Display for CacheSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache hits: {}, misses: {}", self.hits, self.misses)?;
        if self.read_failures > 0 {
            write!(f, ", unreadable entries: {}", self.read_failures)?;
        }
        if self.write_failures > 0 {
            write!(f, ", failed writes: {}", self.write_failures)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicUsize,
    misses: AtomicUsize,
    read_failures: AtomicUsize,
    write_failures: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn summary(&self) -> CacheSummary {
        CacheSummary {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Passthrough: every call goes upstream.
pub struct NoCache {
    source: Arc<dyn PlaylistSource>,
    counters: Counters,
}

impl NoCache {
    pub fn new(source: Arc<dyn PlaylistSource>) -> Self {
        Self {
            source,
            counters: Counters::default(),
        }
    }
}

#[async_trait]
impl PlaylistCache for NoCache {
    async fn get_or_fetch(&self, id: &PlaylistId) -> Result<PlaylistSnapshot, FetchError> {
        Counters::bump(&self.counters.misses);
        self.source.fetch_playlist(id).await
    }

    fn summary(&self) -> CacheSummary {
        self.counters.summary()
    }
}

/// Read-through cache persisted as one JSON entry per playlist.
///
/// Entries are only ever written after a successful fetch, atomically, and
/// carry a checksum of the snapshot. An entry that fails to load for any
/// reason is a miss, never an error.
pub struct ReadThroughCache {
    cache_dir: PathBuf,
    max_age: Option<Duration>,
    source: Arc<dyn PlaylistSource>,
    counters: Counters,
    log: Logger,
}

impl ReadThroughCache {
    pub fn new(cache_dir: impl Into<PathBuf>, source: Arc<dyn PlaylistSource>, log: Logger) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_age: None,
            source,
            counters: Counters::default(),
            log,
        }
    }

    /// Entries older than `max_age` are treated as misses.
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn entry_path(&self, id: &PlaylistId) -> PathBuf {
        self.cache_dir.join(format!("{}.json", id))
    }

    /// `Ok(None)` for an absent or expired entry.
    pub async fn load(&self, id: &PlaylistId) -> Result<Option<PlaylistSnapshot>, CacheError> {
        let path = self.entry_path(id);
        let content = match async_fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(cache_io(&path, e)),
        };

        let entry: CacheEntry = serde_json::from_str(&content)?;
        if &entry.id != id {
            return Err(CacheError::IdMismatch {
                expected: id.clone(),
                found: entry.id,
            });
        }
        if utils::snapshot_checksum(&entry.snapshot)? != entry.checksum {
            return Err(CacheError::ChecksumMismatch(entry.id));
        }
        if let Some(max_age) = self.max_age {
            let age = Utc::now()
                .signed_duration_since(entry.fetched_at)
                .to_std()
                .unwrap_or_default();
            if age > max_age {
                debug!(self.log, "Cache entry for {} expired", id);
                return Ok(None);
            }
        }
        Ok(Some(entry.snapshot))
    }

    pub async fn store(&self, id: &PlaylistId, snapshot: &PlaylistSnapshot) -> Result<(), CacheError> {
        let entry = CacheEntry {
            id: id.clone(),
            fetched_at: Utc::now(),
            checksum: utils::snapshot_checksum(snapshot)?,
            snapshot: snapshot.clone(),
        };
        let json = utils::to_json_pretty(&entry)?;
        let path = self.entry_path(id);
        utils::atomic_write(&path, json.as_bytes())
            .await
            .map_err(|e| cache_io(&path, e))
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

#[async_trait]
impl PlaylistCache for ReadThroughCache {
    async fn get_or_fetch(&self, id: &PlaylistId) -> Result<PlaylistSnapshot, FetchError> {
        match self.load(id).await {
            Ok(Some(snapshot)) => {
                Counters::bump(&self.counters.hits);
                debug!(self.log, "Cache hit: {}", id);
                return Ok(snapshot);
            }
            Ok(None) => {}
            Err(e) => {
                Counters::bump(&self.counters.read_failures);
                debug!(self.log, "Ignoring unreadable cache entry for {}: {}", id, e);
            }
        }

        Counters::bump(&self.counters.misses);
        let snapshot = self.source.fetch_playlist(id).await?;

        if let Err(e) = self.store(id, &snapshot).await {
            Counters::bump(&self.counters.write_failures);
            warning!(self.log, "Failed to cache {}: {}", id, e);
        }
        Ok(snapshot)
    }

    fn summary(&self) -> CacheSummary {
        self.counters.summary()
    }
}
