use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};

use crate::{
    Res,
    committer::{Committer, GitCli},
    config,
    environment::{Environment, SnapshotDirKind},
    error::SetupError,
    info,
    log::Logger,
    management::{CacheSummary, FileManager, NoCache, PlaylistCache, ReadThroughCache},
    spotify::{PlaylistSource, SpotifyClient},
    success,
    types::SnapshotComparison,
    updater::{DEFAULT_CONCURRENCY, FileUpdater, RunResult},
    warning,
};

/// Everything the `sparchive` command line can configure.
#[derive(Debug, Clone)]
pub struct UpdateOptions {
    pub playlists_dir: Option<PathBuf>,
    pub target: Option<SnapshotDirKind>,
    pub cache_dir: Option<PathBuf>,
    pub cache_max_age: Option<Duration>,
    pub auto_register: bool,
    pub commit_and_push: bool,
    pub concurrency: usize,
    pub ignore_track_order: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            playlists_dir: None,
            target: None,
            cache_dir: None,
            cache_max_age: None,
            auto_register: false,
            commit_and_push: false,
            concurrency: DEFAULT_CONCURRENCY,
            ignore_track_order: false,
        }
    }
}

/// Runs one archive update against the real Spotify API.
///
/// Builds the Spotify client from the environment and delegates to
/// [`run_update`].
///
/// # Errors
///
/// - No access token configured
/// - Snapshot directory or repository root cannot be resolved
/// - The snapshot directory cannot be read
/// - Commit or push failed (only with `commit_and_push`)
pub async fn update(opts: UpdateOptions, log: Logger) -> Res<RunResult> {
    let playlists_dir = resolve_playlists_dir(&opts)?;
    let source: Arc<dyn PlaylistSource> = Arc::new(SpotifyClient::from_config()?.with_logger(log));
    run_update(&opts, playlists_dir, source, config::is_ci(), Utc::now(), log).await
}

/// Wires the pipeline around an arbitrary upstream source and runs it.
///
/// Setup happens first: when committing is requested the repository root is
/// resolved before any fetch, so a misplaced checkout fails fast.
pub async fn run_update(
    opts: &UpdateOptions,
    playlists_dir: PathBuf,
    source: Arc<dyn PlaylistSource>,
    ci: bool,
    now: DateTime<Utc>,
    log: Logger,
) -> Res<RunResult> {
    let playlists_dir = std::path::absolute(&playlists_dir).map_err(|source| SetupError::Io {
        path: playlists_dir.clone(),
        source,
    })?;

    let committer = if opts.commit_and_push {
        let repo_root = Environment::new(&playlists_dir, config::repo_name()).repo_root()?;
        Some(Committer::new(
            GitCli::new(repo_root, log),
            &playlists_dir,
            ci,
            log,
        ))
    } else {
        None
    };

    let cache: Arc<dyn PlaylistCache> = match &opts.cache_dir {
        Some(dir) => {
            info!(log, "Using playlist cache at {}", dir.display());
            Arc::new(
                ReadThroughCache::new(dir, Arc::clone(&source), log)
                    .with_max_age(opts.cache_max_age),
            )
        }
        None => Arc::new(NoCache::new(Arc::clone(&source))),
    };

    let comparison = if opts.ignore_track_order {
        SnapshotComparison::IgnoreTrackOrder
    } else {
        SnapshotComparison::Exact
    };
    let file_manager = FileManager::new(&playlists_dir, log).with_comparison(comparison);

    let updater = FileUpdater::new(file_manager, cache, source, log)
        .auto_register(opts.auto_register)
        .concurrency(opts.concurrency);

    let result = updater.run(now).await?;
    print_summary(&result, updater.cache().summary(), log);

    if let Some(committer) = committer {
        committer.commit_and_push_if_ci(result.changed, now).await?;
    }

    Ok(result)
}

fn resolve_playlists_dir(opts: &UpdateOptions) -> Result<PathBuf, SetupError> {
    if let Some(dir) = &opts.playlists_dir {
        return Ok(dir.clone());
    }
    let kind = opts.target.ok_or_else(|| {
        SetupError::Config("--playlists-dir or --target".to_string())
    })?;
    Environment::from_config()?.get_snapshot_dir(kind)
}

/// Prints the end-of-run summary: fetch counts, cache statistics and
/// errors grouped by kind.
pub fn print_summary(result: &RunResult, cache: CacheSummary, log: Logger) {
    let attempted = result.fetched + result.errors.len();
    if !result.registered.is_empty() {
        info!(log, "Registered {} new playlists", result.registered.len());
    }
    info!(log, "{}", cache);

    if result.errors.is_empty() {
        success!(
            log,
            "Fetched {}/{} playlists, {}",
            result.fetched,
            attempted,
            if result.changed { "changes recorded" } else { "no changes" }
        );
        return;
    }

    let by_kind = result
        .errors_by_kind()
        .iter()
        .map(|(kind, count)| format!("{}={}", kind, count))
        .collect::<Vec<_>>()
        .join(", ");
    warning!(
        log,
        "Fetched {}/{} playlists, {}, errors: {}",
        result.fetched,
        attempted,
        if result.changed { "changes recorded" } else { "no changes" },
        by_kind
    );
    for (id, error) in &result.errors {
        warning!(log, "  {}: {}", id, error);
    }
}
