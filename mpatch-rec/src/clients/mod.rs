//! External collaborator clients
//!
//! Each collaborator is a trait seam with one HTTP implementation:
//! - [`SentimentService`]: free text → emotion label (Sapling)
//! - [`CatalogService`]: query → track metadata with optional preview (Spotify)
//! - [`SecondaryLookup`]: search hint → video identifier (YouTube Data API)
//! - [`AudioStreamSource`]: video identifier → audio byte stream
//!
//! Implementations handle their own timeout and auth. They return
//! [`UpstreamError`] and never retry on their own except for credential
//! refresh; retry policy belongs to the calling service.

pub mod audio_stream;
pub mod retry;
pub mod sapling;
pub mod spotify;
pub mod token_cache;
pub mod youtube;

pub use audio_stream::HttpAudioStream;
pub use retry::{with_retry, RetryPolicy};
pub use sapling::SaplingClient;
pub use spotify::SpotifyClient;
pub use token_cache::{AccessToken, ClientCredentialsProvider, TokenCache, TokenProvider};
pub use youtube::YouTubeClient;

use crate::error::UpstreamError;
use async_trait::async_trait;
use axum::body::Bytes;
use futures::stream::BoxStream;

/// Catalog track as returned by a [`CatalogService`], before pipeline defaults
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogTrack {
    pub id: String,
    pub name: Option<String>,
    /// Artist names in credit order
    pub artists: Vec<String>,
    /// Native short preview clip, if the catalog provides one
    pub preview_url: Option<String>,
    pub image_url: Option<String>,
    pub duration_ms: Option<u64>,
    pub external_url: Option<String>,
}

/// Audio byte stream handed to the proxy route
pub struct AudioStream {
    /// Upstream media type, if it reported one
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Bytes, UpstreamError>>,
}

/// Sentiment classification service
#[async_trait]
pub trait SentimentService: Send + Sync {
    /// Classify `text` into an emotion label (casing as returned upstream)
    async fn detect_emotion(&self, text: &str) -> Result<String, UpstreamError>;
}

/// Music catalog search service
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Search tracks matching `query`, at most `limit` items
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, UpstreamError>;
}

/// Video-platform lookup for secondary audio sources
#[async_trait]
pub trait SecondaryLookup: Send + Sync {
    /// First video identifier matching `query`, if any
    async fn find_video_id(&self, query: &str) -> Result<Option<String>, UpstreamError>;
}

/// Byte-stream fetch for a validated secondary-source identifier
#[async_trait]
pub trait AudioStreamSource: Send + Sync {
    async fn open_stream(&self, video_id: &str) -> Result<AudioStream, UpstreamError>;
}

/// Stand-in catalog used when no client credentials are configured
///
/// Every search fails with [`UpstreamError::NotConfigured`], which the
/// searcher logs and turns into an empty batch.
pub struct UnconfiguredCatalog;

#[async_trait]
impl CatalogService for UnconfiguredCatalog {
    async fn search_tracks(&self, _query: &str, _limit: usize) -> Result<Vec<CatalogTrack>, UpstreamError> {
        Err(UpstreamError::NotConfigured("Spotify catalog"))
    }
}
