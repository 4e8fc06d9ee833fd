use std::{
    io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::PlaylistSnapshot;

/// Writes `content` to `path` through a sibling temp file and a rename, so
/// readers see either the old file or the new one, never a partial write.
pub async fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        async_fs::create_dir_all(parent).await?;
    }

    let tmp = tmp_path(path);
    async_fs::write(&tmp, content).await?;
    if let Err(e) = async_fs::rename(&tmp, path).await {
        let _ = async_fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Like [`atomic_write`], but skips the write when the file already holds
/// exactly `content`. Returns whether a write happened.
pub async fn write_if_changed(path: &Path, content: &[u8]) -> io::Result<bool> {
    match async_fs::read(path).await {
        Ok(existing) if existing == content => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    atomic_write(path, content).await?;
    Ok(true)
}

pub fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Pretty JSON with a trailing newline, the format of every file we write.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    Ok(json)
}

/// Hex SHA-256 of the compact JSON encoding of a snapshot.
pub fn snapshot_checksum(snapshot: &PlaylistSnapshot) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(snapshot)?;
    Ok(hex::encode(Sha256::digest(&json)))
}

/// Parses a Spotify `added_at` timestamp.
///
/// Spotify reports `1970-01-01T00:00:00Z` for tracks added before it started
/// recording dates; that value, like an unparsable one, means "unknown".
pub fn parse_added_at(value: &str) -> Option<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()?;
    if parsed.timestamp() == 0 {
        return None;
    }
    Some(parsed)
}

/// Formats a duration as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_duration(duration_ms: u64) -> String {
    let total = duration_ms / 1000;
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
