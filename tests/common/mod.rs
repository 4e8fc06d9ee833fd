#![allow(dead_code)]

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sparchive::{
    error::FetchError,
    spotify::PlaylistSource,
    types::{PlaylistId, PlaylistSnapshot, Track},
};

// Scripted upstream: per-ID results plus call counters.
#[derive(Default)]
pub struct FakeSource {
    playlists: Mutex<BTreeMap<PlaylistId, Result<PlaylistSnapshot, FetchError>>>,
    owned: Mutex<Option<Result<BTreeSet<PlaylistId>, FetchError>>>,
    delay: Option<Duration>,
    fetch_calls: AtomicUsize,
    owned_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_playlist(&self, id: &PlaylistId, snapshot: PlaylistSnapshot) {
        self.playlists
            .lock()
            .unwrap()
            .insert(id.clone(), Ok(snapshot));
    }

    pub fn fail_playlist(&self, id: &PlaylistId, error: FetchError) {
        self.playlists.lock().unwrap().insert(id.clone(), Err(error));
    }

    pub fn set_owned(&self, ids: &[&PlaylistId]) {
        let owned = ids.iter().map(|id| (*id).clone()).collect();
        *self.owned.lock().unwrap() = Some(Ok(owned));
    }

    pub fn fail_owned(&self, error: FetchError) {
        *self.owned.lock().unwrap() = Some(Err(error));
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn owned_calls(&self) -> usize {
        self.owned_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaylistSource for FakeSource {
    async fn fetch_playlist(&self, id: &PlaylistId) -> Result<PlaylistSnapshot, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let result = self
            .playlists
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(id.to_string())));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch_owned_playlist_ids(&self) -> Result<BTreeSet<PlaylistId>, FetchError> {
        self.owned_calls.fetch_add(1, Ordering::SeqCst);
        self.owned
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Ok(BTreeSet::new()))
    }
}

pub fn id(value: &str) -> PlaylistId {
    PlaylistId::new(value).unwrap()
}

pub fn track(id: &str, name: &str) -> Track {
    Track {
        id: id.to_string(),
        name: name.to_string(),
        artists: vec![format!("{} artist", name)],
        album: format!("{} album", name),
        duration_ms: 180_000,
        added_at: None,
    }
}

pub fn snapshot(name: &str, tracks: Vec<Track>) -> PlaylistSnapshot {
    PlaylistSnapshot {
        name: name.to_string(),
        description: format!("{} description", name),
        tracks,
        num_followers: None,
    }
}

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 12, 15, 12, 0, 0).unwrap()
}

pub fn later() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2021, 12, 16, 12, 0, 0).unwrap()
}
