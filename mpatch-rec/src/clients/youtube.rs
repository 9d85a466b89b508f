//! YouTube Data API search client
//!
//! Finds a video whose audio can stand in for a track without a catalog
//! preview. Search calls are expensive against the daily quota, so the
//! client applies a process-wide rate limit before every request.
//!
//! # API Reference
//! - Endpoint: https://www.googleapis.com/youtube/v3/search
//! - Auth: `key` query parameter

use super::SecondaryLookup;
use crate::error::UpstreamError;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use std::num::NonZeroU32;
use tracing::debug;

/// YouTube search endpoint
const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// YouTube video search client
pub struct YouTubeClient {
    http_client: Client,
    api_key: String,
    endpoint: String,
    /// Outbound request limiter shared by all lookups
    rate_limiter: RateLimiter<
        governor::state::direct::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl YouTubeClient {
    /// Create client allowing `requests_per_second` lookups
    pub fn new(http_client: Client, api_key: String, requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            http_client,
            api_key,
            endpoint: YOUTUBE_SEARCH_URL.to_string(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<ItemId>,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

fn first_video_id(response: SearchResponse) -> Option<String> {
    response
        .items
        .into_iter()
        .next()
        .and_then(|item| item.id)
        .and_then(|id| id.video_id)
}

#[async_trait]
impl SecondaryLookup for YouTubeClient {
    async fn find_video_id(&self, query: &str) -> Result<Option<String>, UpstreamError> {
        self.rate_limiter.until_ready().await;
        debug!(query = %query, "Querying YouTube search");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[
                ("part", "id"),
                ("q", query),
                ("type", "video"),
                ("maxResults", "1"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UpstreamError::from_reqwest("YouTube", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::from_status("YouTube", status));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Parse(format!("Failed to parse YouTube response: {}", e)))?;

        Ok(first_video_id(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_video_id() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"items": [{"id": {"kind": "youtube#video", "videoId": "fHI8X4OXluQ"}}, {"id": {"videoId": "other"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_video_id(body).as_deref(), Some("fHI8X4OXluQ"));
    }

    #[test]
    fn test_no_items() {
        let body: SearchResponse = serde_json::from_str(r#"{"kind": "youtube#searchListResponse"}"#).unwrap();
        assert!(first_video_id(body).is_none());

        let body: SearchResponse = serde_json::from_str(r#"{"items": [{"id": {"kind": "youtube#channel"}}]}"#).unwrap();
        assert!(first_video_id(body).is_none());
    }
}
