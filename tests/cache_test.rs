mod common;

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use common::{FakeSource, id, snapshot, track};
use sparchive::{
    error::FetchError,
    log::Logger,
    management::{CacheSummary, NoCache, PlaylistCache, ReadThroughCache},
    types::CacheEntry,
    utils,
};
use tempfile::tempdir;

#[tokio::test]
async fn test_hit_does_not_call_upstream() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    let s = snapshot("Mix", vec![track("t1", "One")]);
    source.set_playlist(&a, s.clone());

    let cache = ReadThroughCache::new(dir.path(), source.clone(), Logger::silent());
    assert_eq!(cache.get_or_fetch(&a).await.unwrap(), s);
    assert_eq!(cache.get_or_fetch(&a).await.unwrap(), s);

    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(
        cache.summary(),
        CacheSummary {
            hits: 1,
            misses: 1,
            ..CacheSummary::default()
        }
    );
}

#[tokio::test]
async fn test_entries_survive_across_instances() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    source.set_playlist(&a, snapshot("Mix", vec![track("t1", "One")]));

    ReadThroughCache::new(dir.path(), source.clone(), Logger::silent())
        .get_or_fetch(&a)
        .await
        .unwrap();

    let second = ReadThroughCache::new(dir.path(), source.clone(), Logger::silent());
    second.get_or_fetch(&a).await.unwrap();

    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(second.summary().hits, 1);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    source.fail_playlist(&a, FetchError::Transient("boom".to_string()));

    let cache = ReadThroughCache::new(dir.path(), source.clone(), Logger::silent());
    let err = cache.get_or_fetch(&a).await.unwrap_err();
    assert_eq!(err, FetchError::Transient("boom".to_string()));
    assert!(!cache.entry_path(&a).exists());

    let s = snapshot("Mix", vec![]);
    source.set_playlist(&a, s.clone());
    assert_eq!(cache.get_or_fetch(&a).await.unwrap(), s);
    assert_eq!(source.fetch_calls(), 2);
}

#[tokio::test]
async fn test_corrupt_entry_is_a_miss() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    let s = snapshot("Mix", vec![track("t1", "One")]);
    source.set_playlist(&a, s.clone());

    let cache = ReadThroughCache::new(dir.path(), source.clone(), Logger::silent());
    std::fs::write(cache.entry_path(&a), "{ not json").unwrap();

    assert_eq!(cache.get_or_fetch(&a).await.unwrap(), s);
    assert_eq!(source.fetch_calls(), 1);
    assert_eq!(cache.summary().read_failures, 1);

    // The bad entry was replaced by a good one.
    assert_eq!(cache.load(&a).await.unwrap(), Some(s));
}

#[tokio::test]
async fn test_tampered_entry_fails_checksum() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    let s = snapshot("Mix", vec![track("t1", "One")]);

    let cache = ReadThroughCache::new(dir.path(), source.clone(), Logger::silent());
    cache.store(&a, &s).await.unwrap();

    let path = cache.entry_path(&a);
    let mut entry: CacheEntry =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    entry.snapshot.name = "Edited".to_string();
    std::fs::write(&path, serde_json::to_string(&entry).unwrap()).unwrap();

    assert!(cache.load(&a).await.is_err());
}

#[tokio::test]
async fn test_entry_under_wrong_key_is_rejected() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let cache = ReadThroughCache::new(dir.path(), source, Logger::silent());

    cache
        .store(&id("A1"), &snapshot("Mix", vec![]))
        .await
        .unwrap();
    std::fs::copy(cache.entry_path(&id("A1")), cache.entry_path(&id("B2"))).unwrap();

    assert!(cache.load(&id("B2")).await.is_err());
}

#[tokio::test]
async fn test_max_age_expires_old_entries() {
    let dir = tempdir().unwrap();
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    let s = snapshot("Mix", vec![track("t1", "One")]);

    let entry = CacheEntry {
        id: a.clone(),
        fetched_at: Utc::now() - chrono::Duration::hours(2),
        checksum: utils::snapshot_checksum(&s).unwrap(),
        snapshot: s.clone(),
    };
    std::fs::write(
        dir.path().join("A1.json"),
        utils::to_json_pretty(&entry).unwrap(),
    )
    .unwrap();

    let unbounded = ReadThroughCache::new(dir.path(), source.clone(), Logger::silent());
    assert_eq!(unbounded.load(&a).await.unwrap(), Some(s));

    let bounded = ReadThroughCache::new(dir.path(), source, Logger::silent())
        .with_max_age(Some(Duration::from_secs(3600)));
    assert_eq!(bounded.load(&a).await.unwrap(), None);
}

#[tokio::test]
async fn test_failed_persist_still_returns_snapshot() {
    let dir = tempdir().unwrap();
    // A regular file where the cache directory should be
    let blocked = dir.path().join("not-a-dir");
    std::fs::write(&blocked, "").unwrap();

    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    let s = snapshot("Mix", vec![track("t1", "One")]);
    source.set_playlist(&a, s.clone());

    let cache = ReadThroughCache::new(&blocked, source.clone(), Logger::silent());
    assert_eq!(cache.get_or_fetch(&a).await.unwrap(), s);

    let summary = cache.summary();
    assert_eq!(summary.misses, 1);
    assert_eq!(summary.read_failures, 1);
    assert_eq!(summary.write_failures, 1);
    assert_eq!(source.fetch_calls(), 1);
}

#[tokio::test]
async fn test_store_leaves_no_temporary_file() {
    let dir = tempdir().unwrap();
    let cache = ReadThroughCache::new(dir.path(), Arc::new(FakeSource::new()), Logger::silent());
    let a = id("A1");

    cache.store(&a, &snapshot("Mix", vec![])).await.unwrap();

    assert!(cache.entry_path(&a).exists());
    assert!(!utils::tmp_path(&cache.entry_path(&a)).exists());
}

#[tokio::test]
async fn test_no_cache_always_goes_upstream() {
    let source = Arc::new(FakeSource::new());
    let a = id("A1");
    source.set_playlist(&a, snapshot("Mix", vec![]));

    let cache = NoCache::new(source.clone());
    cache.get_or_fetch(&a).await.unwrap();
    cache.get_or_fetch(&a).await.unwrap();

    assert_eq!(source.fetch_calls(), 2);
    assert_eq!(cache.summary().hits, 0);
    assert_eq!(cache.summary().misses, 2);
}

#[test]
fn test_summary_display() {
    let summary = CacheSummary {
        hits: 3,
        misses: 1,
        read_failures: 1,
        write_failures: 0,
    };
    assert_eq!(
        summary.to_string(),
        "cache hits: 3, misses: 1, unreadable entries: 1"
    );
}
