use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::error::StorageError;

/// Spotify playlist identifier (base62, so plain ASCII alphanumerics).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlaylistId(String);

impl PlaylistId {
    pub fn new(id: impl Into<String>) -> Result<Self, StorageError> {
        let id = id.into();
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidPlaylistId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PlaylistId {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PlaylistId::new(value)
    }
}

impl From<PlaylistId> for String {
    fn from(id: PlaylistId) -> Self {
        id.0
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: u64,
    pub added_at: Option<DateTime<Utc>>,
}

/// User-chosen display name that replaces the upstream playlist name.
///
/// A single line without leading or trailing whitespace; spaces and tabs
/// inside are fine, other whitespace is not.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Alias(String);

impl Alias {
    pub fn new(alias: impl Into<String>) -> Result<Self, StorageError> {
        let alias = alias.into();
        let invalid = alias.is_empty()
            || alias.trim() != alias
            || alias
                .chars()
                .any(|c| matches!(c, '\n' | '\r' | '\x0b' | '\x0c'));
        if invalid {
            return Err(StorageError::InvalidAlias(alias));
        }
        Ok(Self(alias))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The state of a playlist at one point in time.
///
/// `num_followers` is carried along for the follower log but takes no part
/// in [`SnapshotComparison`]; it moves far more often than the playlist does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSnapshot {
    pub name: String,
    pub description: String,
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub num_followers: Option<u64>,
}

impl PlaylistSnapshot {
    /// Replaces the upstream name with `alias`, if any.
    pub fn with_alias(mut self, alias: Option<&Alias>) -> Self {
        if let Some(alias) = alias {
            self.name = alias.to_string();
        }
        self
    }
}

/// How a fetched snapshot is compared against the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SnapshotComparison {
    #[default]
    Exact,
    IgnoreTrackOrder,
}

impl SnapshotComparison {
    pub fn same(&self, a: &PlaylistSnapshot, b: &PlaylistSnapshot) -> bool {
        if a.name != b.name || a.description != b.description {
            return false;
        }
        match self {
            SnapshotComparison::Exact => a.tracks == b.tracks,
            SnapshotComparison::IgnoreTrackOrder => {
                let mut left: Vec<&Track> = a.tracks.iter().collect();
                let mut right: Vec<&Track> = b.tracks.iter().collect();
                left.sort();
                right.sort();
                left == right
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub recorded_at: DateTime<Utc>,
    pub snapshot: PlaylistSnapshot,
}

/// On-disk record of a playlist over time. The last entry is the latest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHistory {
    pub id: PlaylistId,
    pub entries: Vec<HistoryEntry>,
}

impl SnapshotHistory {
    pub fn empty(id: PlaylistId) -> Self {
        Self {
            id,
            entries: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&PlaylistSnapshot> {
        self.entries.last().map(|e| &e.snapshot)
    }
}

/// Follower count per day, `followers/<id>.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerHistory {
    pub id: PlaylistId,
    pub counts: BTreeMap<NaiveDate, u64>,
}

impl FollowerHistory {
    pub fn empty(id: PlaylistId) -> Self {
        Self {
            id,
            counts: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: PlaylistId,
    pub fetched_at: DateTime<Utc>,
    pub checksum: String,
    pub snapshot: PlaylistSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeTrack {
    pub id: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: u64,
    /// First date the track was seen in the playlist.
    pub date_added: NaiveDate,
    /// Set when the track was already present on the first scrape, so the
    /// real date added is unknown.
    pub date_added_asterisk: bool,
    /// Most recent removal date; `None` while the track is present.
    pub date_removed: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativePlaylist {
    pub id: PlaylistId,
    pub name: String,
    pub description: String,
    pub tracks: Vec<CumulativeTrack>,
    pub date_first_scraped: NaiveDate,
}

#[derive(Tabled)]
pub struct TrackTableRow {
    #[tabled(rename = "#")]
    pub position: usize,
    #[tabled(rename = "Title")]
    pub title: String,
    #[tabled(rename = "Artist(s)")]
    pub artists: String,
    #[tabled(rename = "Album")]
    pub album: String,
    #[tabled(rename = "Length")]
    pub length: String,
}

// Spotify Web API payloads.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistMetadataResponse {
    pub name: Option<String>,
    pub description: Option<String>,
    pub followers: Option<FollowersObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowersObject {
    pub total: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistTracksResponse {
    #[serde(default)]
    pub items: Vec<PlaylistItem>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub added_at: Option<String>,
    pub track: Option<TrackObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackObject {
    pub id: Option<String>,
    pub name: Option<String>,
    pub duration_ms: Option<u64>,
    pub album: Option<NamedObject>,
    #[serde(default)]
    pub artists: Vec<NamedObject>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedObject {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUserPlaylistsResponse {
    #[serde(default)]
    pub items: Vec<SimplifiedPlaylist>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub owner: PlaylistOwner,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistOwner {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyErrorResponse {
    pub error: SpotifyErrorBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyErrorBody {
    pub status: Option<u16>,
    pub message: Option<String>,
}
