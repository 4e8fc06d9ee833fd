use std::{collections::BTreeSet, time::Duration};

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::{
    debug,
    error::FetchError,
    types::{
        CurrentUserResponse, GetUserPlaylistsResponse, PlaylistId, PlaylistMetadataResponse,
        PlaylistSnapshot, PlaylistTracksResponse, SpotifyErrorResponse, Track,
    },
    utils, warning,
};

use super::SpotifyClient;

const PLAYLIST_FIELDS: &str = "name,description,followers.total";
const TRACK_FIELDS: &str =
    "items(added_at,track(id,name,duration_ms,album(name),artists(name))),next";

/// Retrieves the current state of a playlist from the Spotify Web API.
///
/// Fetches the playlist's metadata first and then walks the paginated track
/// listing, following the `next` links until Spotify reports no more pages.
/// Only the fields the archive stores are requested.
///
/// # Arguments
///
/// * `client` - Configured API client
/// * `id` - Playlist to fetch
///
/// # Returns
///
/// Returns a `Result` containing:
/// - `Ok(PlaylistSnapshot)` - Name, description, ordered tracks and follower count
/// - `Err(FetchError)` - Classified failure, see the module docs
///
/// # Skipped Items
///
/// - Items whose `track` is null (removed from the catalog)
/// - Local files, which have no Spotify track ID
///
/// An empty playlist is a valid result, not an error.
///
/// # Example
///
/// ```
/// let client = SpotifyClient::from_config()?;
/// let id = PlaylistId::new("37i9dQZF1DXcBWIGoYBM5M")?;
/// let snapshot = get_playlist(&client, &id).await?;
/// println!("{} has {} tracks", snapshot.name, snapshot.tracks.len());
/// ```
pub async fn get_playlist(
    client: &SpotifyClient,
    id: &PlaylistId,
) -> Result<PlaylistSnapshot, FetchError> {
    let metadata_url = with_params(
        &client.url(&format!("playlists/{}", id)),
        &[("fields", PLAYLIST_FIELDS)],
    )?;
    let metadata: PlaylistMetadataResponse = get_json(client, &metadata_url).await?;

    let name = metadata.name.unwrap_or_default();
    if name.trim().is_empty() {
        return Err(FetchError::Transient(format!(
            "empty playlist name for {}",
            id
        )));
    }

    let mut tracks = Vec::new();
    let mut next = Some(with_params(
        &client.url(&format!("playlists/{}/tracks", id)),
        &[("fields", TRACK_FIELDS), ("limit", "100")],
    )?);

    while let Some(url) = next {
        let page: PlaylistTracksResponse = get_json(client, &url).await?;
        for item in page.items {
            let Some(track) = item.track else {
                continue;
            };
            let Some(track_id) = track.id else {
                debug!(client.log, "Skipping local track in {}", id);
                continue;
            };

            let track_name = track.name.unwrap_or_default();
            if track_name.is_empty() {
                warning!(client.log, "Empty track name: {} in {}", track_id, id);
            }

            tracks.push(Track {
                id: track_id,
                name: track_name,
                artists: track
                    .artists
                    .into_iter()
                    .filter_map(|a| a.name)
                    .collect(),
                album: track.album.and_then(|a| a.name).unwrap_or_default(),
                duration_ms: track.duration_ms.unwrap_or_default(),
                added_at: item.added_at.as_deref().and_then(utils::parse_added_at),
            });
        }
        next = page.next;
    }

    let num_followers = metadata.followers.and_then(|f| f.total);
    if num_followers.is_none() {
        debug!(client.log, "No follower count for {}", id);
    }

    Ok(PlaylistSnapshot {
        name,
        description: metadata.description.unwrap_or_default(),
        tracks,
        num_followers,
    })
}

/// Retrieves the IDs of all playlists owned by the authenticated user.
///
/// `/me/playlists` also lists playlists the user merely follows, so the
/// current user's ID is looked up first and used to filter by owner.
/// Entries with IDs that are not valid playlist IDs are skipped.
pub async fn get_owned_playlist_ids(
    client: &SpotifyClient,
) -> Result<BTreeSet<PlaylistId>, FetchError> {
    let me: CurrentUserResponse = get_json(client, &client.url("me")).await?;

    let mut ids = BTreeSet::new();
    let mut next = Some(with_params(&client.url("me/playlists"), &[("limit", "50")])?);

    while let Some(url) = next {
        let page: GetUserPlaylistsResponse = get_json(client, &url).await?;
        for playlist in page.items {
            if playlist.owner.id != me.id {
                continue;
            }
            match PlaylistId::new(playlist.id) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => warning!(client.log, "Skipping owned playlist: {}", e),
            }
        }
        next = page.next;
    }

    Ok(ids)
}

fn with_params(url: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
    Url::parse_with_params(url, params)
        .map(String::from)
        .map_err(|e| FetchError::Transient(format!("invalid URL {}: {}", url, e)))
}

/// Sends an authenticated GET and decodes the JSON body.
///
/// Rate limits and gateway errors are retried according to the client's
/// [`super::RetryPolicy`]; everything else is classified immediately.
async fn get_json<T: DeserializeOwned>(client: &SpotifyClient, url: &str) -> Result<T, FetchError> {
    let mut attempt = 0;

    loop {
        debug!(client.log, "GET {}", url);
        let response = client
            .client
            .get(url)
            .bearer_auth(&client.token)
            .send()
            .await?;
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            return serde_json::from_str(&body)
                .map_err(|e| FetchError::Transient(format!("invalid JSON from {}: {}", url, e)));
        }

        let can_retry = attempt < client.retry.max_retries;
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                let wait = Duration::from_secs(retry_after);
                if can_retry && wait <= client.retry.max_retry_after {
                    warning!(client.log, "Rate limited, will retry after {}s", retry_after);
                    sleep(wait).await;
                    attempt += 1;
                    continue;
                }
                return Err(FetchError::RateLimited { retry_after });
            }
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
                if can_retry =>
            {
                warning!(client.log, "Server error ({}), will retry", status.as_u16());
                sleep(client.retry.server_error_backoff).await;
                attempt += 1;
                continue;
            }
            _ => {}
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<SpotifyErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| status.to_string());
        let info = format!("{} ({})", message, status.as_u16());

        return Err(match status {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => FetchError::NotFound(info),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::AuthFailure(info),
            _ => FetchError::Transient(info),
        });
    }
}
