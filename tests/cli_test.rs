mod common;

use std::sync::Arc;

use common::{FakeSource, id, later, now, snapshot, track};
use sparchive::{
    cli::{UpdateOptions, run_update},
    error::FetchError,
    log::Logger,
    management::FileManager,
};
use tempfile::tempdir;

#[tokio::test]
async fn test_run_update_with_cache() {
    let dir = tempdir().unwrap();
    let playlists = dir.path().join("playlists");
    let source = Arc::new(FakeSource::new());
    let (a, b) = (id("A1"), id("B2"));
    source.set_playlist(&a, snapshot("Alpha", vec![track("t1", "One")]));
    source.fail_playlist(&b, FetchError::NotFound("gone".to_string()));
    source.set_owned(&[&a, &b]);

    let opts = UpdateOptions {
        cache_dir: Some(dir.path().join("cache")),
        auto_register: true,
        ..UpdateOptions::default()
    };

    let first = run_update(&opts, playlists.clone(), source.clone(), false, now(), Logger::silent())
        .await
        .unwrap();
    assert!(first.changed);
    assert_eq!(first.registered.len(), 2);
    assert_eq!(first.fetched, 1);
    assert_eq!(first.errors_by_kind().get("not_found"), Some(&1));

    let second = run_update(&opts, playlists.clone(), source.clone(), false, later(), Logger::silent())
        .await
        .unwrap();
    assert!(!second.changed);
    // A1 came from the cache, B2 was retried upstream.
    assert_eq!(source.fetch_calls(), 3);

    let fm = FileManager::new(&playlists, Logger::silent());
    assert!(fm.read_latest(&a).await.unwrap().is_some());
    assert!(fm.read_history(&b).await.unwrap().is_some());
}

#[tokio::test]
async fn test_commit_setup_fails_before_fetching() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    source.set_playlist(&a, snapshot("Alpha", vec![]));

    let playlists = dir.path().join("playlists");
    FileManager::new(&playlists, Logger::silent())
        .ensure_subdirs_exist()
        .await
        .unwrap();
    FileManager::new(&playlists, Logger::silent())
        .register(&a)
        .await
        .unwrap();

    let opts = UpdateOptions {
        commit_and_push: true,
        ..UpdateOptions::default()
    };

    let result = run_update(&opts, playlists, source.clone(), true, now(), Logger::silent()).await;

    assert!(result.is_err());
    assert_eq!(source.fetch_calls(), 0);
}

#[tokio::test]
async fn test_commit_outside_ci_is_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("spotify-playlist-archive");
    std::fs::create_dir_all(root.join(".git")).unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    source.set_playlist(&a, snapshot("Alpha", vec![track("t1", "One")]));
    source.set_owned(&[&a]);

    let opts = UpdateOptions {
        auto_register: true,
        commit_and_push: true,
        ..UpdateOptions::default()
    };

    // With ci=false the committer never shells out to git.
    let result = run_update(&opts, root.join("playlists"), source, false, now(), Logger::silent())
        .await
        .unwrap();

    assert!(result.changed);
    assert!(root.join("playlists/history/A1.json").exists());
}
