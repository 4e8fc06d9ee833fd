use std::time::Duration;

use httpmock::prelude::*;
use serde_json::json;
use sparchive::{
    error::FetchError,
    spotify::{PlaylistSource, RetryPolicy, SpotifyClient},
    types::PlaylistId,
};

const TOKEN: &str = "test-token";

fn client(server: &MockServer) -> SpotifyClient {
    SpotifyClient::new(server.url("/v1"), TOKEN)
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_retries: 1,
            max_retry_after: Duration::from_secs(120),
            server_error_backoff: Duration::ZERO,
        })
}

fn playlist_id() -> PlaylistId {
    PlaylistId::new("P1").unwrap()
}

#[tokio::test]
async fn test_fetch_playlist_follows_pages() {
    let server = MockServer::start_async().await;

    let metadata = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/v1/playlists/P1")
                .header("authorization", "Bearer test-token")
                .query_param("fields", "name,description,followers.total");
            then.status(200).json_body(json!({
                "name": "Road Trip",
                "description": "Long drives",
                "followers": {"total": 42}
            }));
        })
        .await;
    let first_page = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1/tracks");
            then.status(200).json_body(json!({
                "items": [
                    {
                        "added_at": "2021-06-01T10:00:00Z",
                        "track": {
                            "id": "t1",
                            "name": "One",
                            "duration_ms": 201000,
                            "album": {"name": "First"},
                            "artists": [{"name": "A"}, {"name": "B"}]
                        }
                    },
                    {"added_at": "2021-06-01T10:00:00Z", "track": null},
                    {
                        "added_at": "2021-06-01T10:00:00Z",
                        "track": {"id": null, "name": "Local file", "duration_ms": 1000, "artists": []}
                    }
                ],
                "next": server.url("/v1/pages/2")
            }));
        })
        .await;
    let second_page = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/pages/2");
            then.status(200).json_body(json!({
                "items": [{
                    "added_at": "1970-01-01T00:00:00Z",
                    "track": {
                        "id": "t2",
                        "name": "Two",
                        "duration_ms": 185000,
                        "album": {"name": "Second"},
                        "artists": [{"name": "C"}]
                    }
                }],
                "next": null
            }));
        })
        .await;

    let snapshot = client(&server).fetch_playlist(&playlist_id()).await.unwrap();

    metadata.assert_async().await;
    first_page.assert_async().await;
    second_page.assert_async().await;

    assert_eq!(snapshot.name, "Road Trip");
    assert_eq!(snapshot.description, "Long drives");
    assert_eq!(snapshot.num_followers, Some(42));
    assert_eq!(snapshot.tracks.len(), 2);
    assert_eq!(snapshot.tracks[0].id, "t1");
    assert_eq!(snapshot.tracks[0].artists, vec!["A", "B"]);
    assert_eq!(snapshot.tracks[0].album, "First");
    assert!(snapshot.tracks[0].added_at.is_some());
    assert_eq!(snapshot.tracks[1].id, "t2");
    assert_eq!(snapshot.tracks[1].added_at, None);
}

#[tokio::test]
async fn test_empty_playlist_is_valid() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(200).json_body(json!({"name": "Empty", "description": null}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1/tracks");
            then.status(200).json_body(json!({"items": [], "next": null}));
        })
        .await;

    let snapshot = client(&server).fetch_playlist(&playlist_id()).await.unwrap();

    assert_eq!(snapshot.name, "Empty");
    assert_eq!(snapshot.description, "");
    assert_eq!(snapshot.num_followers, None);
    assert!(snapshot.tracks.is_empty());
}

#[tokio::test]
async fn test_empty_name_is_transient() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(200).json_body(json!({"name": "", "description": ""}));
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)));
}

#[tokio::test]
async fn test_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(404)
                .json_body(json!({"error": {"status": 404, "message": "Not found."}}));
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::NotFound("Not found. (404)".to_string()));
}

#[tokio::test]
async fn test_unauthorized() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(401).json_body(
                json!({"error": {"status": 401, "message": "The access token expired"}}),
            );
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::AuthFailure(_)));
    assert_eq!(err.kind(), "auth_failure");
}

#[tokio::test]
async fn test_rate_limit_beyond_max_wait_is_not_retried() {
    let server = MockServer::start_async().await;
    let limited = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(429).header("retry-after", "500");
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::RateLimited { retry_after: 500 });
    limited.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_rate_limit_retries_until_exhausted() {
    let server = MockServer::start_async().await;
    let limited = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(429).header("retry-after", "0");
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();

    assert_eq!(err, FetchError::RateLimited { retry_after: 0 });
    limited.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_gateway_errors_are_retried_then_transient() {
    let server = MockServer::start_async().await;
    let unavailable = server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(503);
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transient(_)));
    unavailable.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_slow_response_times_out_as_transient() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({"name": "Late", "description": ""}));
        })
        .await;

    let client = SpotifyClient::with_timeout(server.url("/v1"), TOKEN, Duration::from_millis(200))
        .unwrap()
        .with_retry_policy(RetryPolicy {
            max_retries: 0,
            max_retry_after: Duration::from_secs(120),
            server_error_backoff: Duration::ZERO,
        });

    let err = client.fetch_playlist(&playlist_id()).await.unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_invalid_json_is_transient() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/playlists/P1");
            then.status(200).body("<html>oops</html>");
        })
        .await;

    let err = client(&server)
        .fetch_playlist(&playlist_id())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Transient(_)));
}

#[tokio::test]
async fn test_owned_playlists_are_filtered_by_owner() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/me");
            then.status(200).json_body(json!({"id": "me"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/me/playlists");
            then.status(200).json_body(json!({
                "items": [
                    {"id": "Mine1", "owner": {"id": "me"}},
                    {"id": "Theirs", "owner": {"id": "someone"}},
                    {"id": "not valid!", "owner": {"id": "me"}}
                ],
                "next": server.url("/v1/more-playlists")
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/v1/more-playlists");
            then.status(200).json_body(json!({
                "items": [{"id": "Mine2", "owner": {"id": "me"}}],
                "next": null
            }));
        })
        .await;

    let ids = client(&server).fetch_owned_playlist_ids().await.unwrap();

    assert_eq!(
        ids.into_iter().map(String::from).collect::<Vec<_>>(),
        vec!["Mine1", "Mine2"]
    );
}
