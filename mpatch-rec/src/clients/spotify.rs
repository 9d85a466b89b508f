//! Spotify catalog client
//!
//! Searches tracks with a bearer token from the shared [`TokenCache`].
//! A 401 means the cached token went stale: it is invalidated and the search
//! is repeated once with a freshly acquired token.
//!
//! # API Reference
//! - Endpoint: https://api.spotify.com/v1/search?type=track
//! - Documentation: https://developer.spotify.com/documentation/web-api/reference/search

use super::{CatalogService, CatalogTrack, TokenCache};
use crate::error::UpstreamError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Spotify Web API base URL
const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1";

/// Spotify search client
pub struct SpotifyClient {
    http_client: Client,
    tokens: Arc<TokenCache>,
    base_url: String,
}

impl SpotifyClient {
    pub fn new(http_client: Client, tokens: Arc<TokenCache>) -> Self {
        Self {
            http_client,
            tokens,
            base_url: SPOTIFY_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn search_once(&self, token: &str, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, UpstreamError> {
        let limit = limit.to_string();
        let response = self
            .http_client
            .get(format!("{}/search", self.base_url))
            .bearer_auth(token)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest("Spotify", e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(UpstreamError::Unauthorized("Spotify token rejected".to_string()));
        }
        if !status.is_success() {
            return Err(UpstreamError::from_status("Spotify", status));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(format!("Failed to parse Spotify search response: {}", e)))?;

        Ok(body.tracks.items.into_iter().map(CatalogTrack::from).collect())
    }
}

#[async_trait]
impl CatalogService for SpotifyClient {
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, UpstreamError> {
        debug!(query = %query, limit, "Querying Spotify search");

        let token = self.tokens.token().await?;
        match self.search_once(&token, query, limit).await {
            Err(UpstreamError::Unauthorized(_)) => {
                self.tokens.invalidate(&token).await;
                let token = self.tokens.token().await?;
                self.search_once(&token, query, limit).await
            }
            other => other,
        }
    }
}

// ============================================================================
// Spotify API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
struct SpotifyTrack {
    id: String,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
    preview_url: Option<String>,
    album: Option<SpotifyAlbum>,
    duration_ms: Option<u64>,
    external_urls: Option<ExternalUrls>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct SpotifyAlbum {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

impl From<SpotifyTrack> for CatalogTrack {
    fn from(track: SpotifyTrack) -> Self {
        CatalogTrack {
            id: track.id,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            preview_url: track.preview_url.filter(|u| !u.is_empty()),
            image_url: track
                .album
                .and_then(|a| a.images.into_iter().next())
                .map(|i| i.url),
            duration_ms: track.duration_ms,
            external_url: track.external_urls.and_then(|u| u.spotify),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::{AccessToken, TokenProvider};
    use axum::extract::{Query, State};
    use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode as HttpStatus};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Issues "token-1", "token-2", ...
    #[derive(Default)]
    struct SequentialTokens {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenProvider for SequentialTokens {
        async fn fetch_token(&self) -> Result<AccessToken, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(AccessToken {
                value: format!("token-{}", n),
                expires_in: Duration::from_secs(3600),
            })
        }
    }

    /// Local search endpoint: answers `reject_status` to "token-1", a
    /// one-track page to anything else, and records every bearer it sees
    #[derive(Clone)]
    struct FakeSearch {
        reject_status: HttpStatus,
        bearers: Arc<Mutex<Vec<String>>>,
    }

    async fn fake_search(
        State(fake): State<FakeSearch>,
        headers: HeaderMap,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        let bearer = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        fake.bearers.lock().unwrap().push(bearer.clone());

        if bearer == "Bearer token-1" {
            return fake.reject_status.into_response();
        }
        Json(json!({
            "tracks": {"items": [{
                "id": format!("hit-{}", params.get("limit").cloned().unwrap_or_default()),
                "name": params.get("q").cloned(),
                "preview_url": "https://p.scdn.co/mp3-preview/hit"
            }]}
        }))
        .into_response()
    }

    async fn spawn_search_server(fake: FakeSearch) -> String {
        let app = Router::new().route("/search", get(fake_search)).with_state(fake);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_stale_token_invalidated_and_search_retried_once() {
        let fake = FakeSearch {
            reject_status: HttpStatus::UNAUTHORIZED,
            bearers: Arc::new(Mutex::new(Vec::new())),
        };
        let base_url = spawn_search_server(fake.clone()).await;
        let provider = Arc::new(SequentialTokens::default());
        let tokens = Arc::new(TokenCache::new(provider.clone()));
        let client = SpotifyClient::new(Client::new(), tokens.clone()).with_base_url(base_url);

        let tracks = client.search_tracks("happy songs", 3).await.unwrap();

        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].id, "hit-3");
        assert_eq!(tracks[0].name.as_deref(), Some("happy songs"));
        assert_eq!(
            *fake.bearers.lock().unwrap(),
            vec!["Bearer token-1".to_string(), "Bearer token-2".to_string()]
        );
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        // The replacement token stays cached
        assert_eq!(tokens.token().await.unwrap(), "token-2");
    }

    #[tokio::test]
    async fn test_forbidden_search_not_retried() {
        let fake = FakeSearch {
            reject_status: HttpStatus::FORBIDDEN,
            bearers: Arc::new(Mutex::new(Vec::new())),
        };
        let base_url = spawn_search_server(fake.clone()).await;
        let provider = Arc::new(SequentialTokens::default());
        let tokens = Arc::new(TokenCache::new(provider.clone()));
        let client = SpotifyClient::new(Client::new(), tokens.clone()).with_base_url(base_url);

        let result = client.search_tracks("sad songs", 5).await;

        assert_eq!(
            result.unwrap_err(),
            UpstreamError::Status {
                service: "Spotify",
                status: 403
            }
        );
        assert_eq!(fake.bearers.lock().unwrap().len(), 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tokens.token().await.unwrap(), "token-1");
    }

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "tracks": {
                "items": [
                    {
                        "id": "0VjIjW4GlUZAMYd2vXMi3b",
                        "name": "Blinding Lights",
                        "artists": [{"name": "The Weeknd"}],
                        "preview_url": null,
                        "album": {"images": [{"url": "https://i.scdn.co/image/a"}, {"url": "https://i.scdn.co/image/b"}]},
                        "duration_ms": 200040,
                        "external_urls": {"spotify": "https://open.spotify.com/track/0VjIjW4GlUZAMYd2vXMi3b"}
                    },
                    {
                        "id": "bare",
                        "preview_url": "https://p.scdn.co/mp3-preview/bare"
                    }
                ]
            }
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let tracks: Vec<CatalogTrack> = response.tracks.items.into_iter().map(CatalogTrack::from).collect();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].name.as_deref(), Some("Blinding Lights"));
        assert_eq!(tracks[0].artists, vec!["The Weeknd"]);
        assert!(tracks[0].preview_url.is_none());
        assert_eq!(tracks[0].image_url.as_deref(), Some("https://i.scdn.co/image/a"));
        assert_eq!(tracks[0].duration_ms, Some(200040));

        assert!(tracks[1].name.is_none());
        assert!(tracks[1].artists.is_empty());
        assert!(tracks[1].image_url.is_none());
        assert!(tracks[1].external_url.is_none());
        assert_eq!(tracks[1].preview_url.as_deref(), Some("https://p.scdn.co/mp3-preview/bare"));
    }

    #[test]
    fn test_empty_preview_url_treated_as_absent() {
        let track: SpotifyTrack = serde_json::from_str(r#"{"id": "x", "preview_url": ""}"#).unwrap();
        assert!(CatalogTrack::from(track).preview_url.is_none());
    }
}
