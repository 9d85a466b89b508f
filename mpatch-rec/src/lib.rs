//! mpatch-rec library interface
//!
//! Mood text in, multi-language song recommendations out. Exposes the
//! router and its state for the binary and for integration testing.

pub mod api;
pub mod clients;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use mpatch_common::config::ServiceConfig;
use mpatch_common::LanguageProfiles;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::clients::{
    AudioStreamSource, CatalogService, ClientCredentialsProvider, HttpAudioStream, SaplingClient,
    SecondaryLookup, SentimentService, SpotifyClient, TokenCache, UnconfiguredCatalog, YouTubeClient,
};
use crate::services::{AudioResolver, CatalogSearcher, EmotionClassifier, RecommendationComposer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub composer: Arc<RecommendationComposer>,
    /// Byte source for `/youtube-audio/:id`; `None` answers 502
    pub audio_source: Option<Arc<dyn AudioStreamSource>>,
    /// Catalog token cache, present when client credentials are configured
    pub token_cache: Option<Arc<TokenCache>>,
    /// False when catalog searches can only fail (reported by /health)
    pub catalog_configured: bool,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// State around an already-built composer (no token cache)
    pub fn new(composer: RecommendationComposer, audio_source: Option<Arc<dyn AudioStreamSource>>) -> Self {
        Self {
            composer: Arc::new(composer),
            audio_source,
            token_cache: None,
            catalog_configured: true,
            startup_time: Utc::now(),
        }
    }

    /// Wire the HTTP collaborators described by `config`
    ///
    /// Collaborators without credentials are left out and the pipeline
    /// degrades around them.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        let languages = Arc::new(config.languages.clone());

        let sentiment: Option<Arc<dyn SentimentService>> = config.sapling_api_key.as_ref().map(|key| {
            Arc::new(SaplingClient::new(http_client.clone(), key.clone())) as Arc<dyn SentimentService>
        });
        if sentiment.is_none() {
            tracing::warn!("Sapling API key not configured, emotion detection uses keywords only");
        }

        let token_cache = match (&config.spotify_client_id, &config.spotify_client_secret) {
            (Some(id), Some(secret)) => {
                let provider = ClientCredentialsProvider::new(http_client.clone(), id.clone(), secret.clone());
                Some(Arc::new(TokenCache::new(Arc::new(provider))))
            }
            _ => {
                tracing::warn!("Spotify client credentials not configured, live search disabled");
                None
            }
        };
        let catalog: Arc<dyn CatalogService> = match &token_cache {
            Some(tokens) => Arc::new(SpotifyClient::new(http_client.clone(), tokens.clone())),
            None => Arc::new(UnconfiguredCatalog),
        };

        let resolver = config.youtube_api_key.as_ref().map(|key| {
            let lookup: Arc<dyn SecondaryLookup> = Arc::new(YouTubeClient::new(
                http_client.clone(),
                key.clone(),
                config.lookup_rate_per_second,
            ));
            AudioResolver::new(lookup, languages.clone()).with_concurrency(config.lookup_concurrency)
        });
        if resolver.is_none() {
            tracing::warn!("YouTube API key not configured, tracks without previews stay link-only");
        }

        let audio_source = match &config.audio_stream_url_template {
            Some(template) => {
                // No total timeout: a full track can take longer than any request bound
                let stream_client = reqwest::Client::builder().connect_timeout(timeout).build()?;
                Some(Arc::new(HttpAudioStream::new(stream_client, template.clone(), timeout)) as Arc<dyn AudioStreamSource>)
            }
            None => {
                tracing::warn!("Audio stream URL template not configured, /youtube-audio answers 502");
                None
            }
        };

        let composer = build_composer(sentiment, catalog, resolver, languages);

        Ok(Self {
            composer: Arc::new(composer),
            audio_source,
            catalog_configured: token_cache.is_some(),
            token_cache,
            startup_time: Utc::now(),
        })
    }
}

/// Assemble the recommendation pipeline from its collaborators
pub fn build_composer(
    sentiment: Option<Arc<dyn SentimentService>>,
    catalog: Arc<dyn CatalogService>,
    resolver: Option<AudioResolver>,
    languages: Arc<LanguageProfiles>,
) -> RecommendationComposer {
    let classifier = EmotionClassifier::new(sentiment);
    let searcher = CatalogSearcher::new(catalog, resolver, languages.clone());
    RecommendationComposer::new(classifier, searcher, languages)
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::recommend_routes())
        .merge(api::audio_proxy_routes())
        .merge(api::health_routes())
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
