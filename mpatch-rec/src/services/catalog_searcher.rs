//! Catalog searcher
//!
//! One language-biased catalog search per call, followed by secondary
//! resolution for tracks without a preview. Upstream failures are logged
//! and turned into an empty batch; the composer reads "fewer than asked" as
//! the failure signal.

use super::audio_resolver::{AudioResolver, Unresolved};
use crate::clients::{with_retry, CatalogService, CatalogTrack, RetryPolicy};
use mpatch_common::api::Song;
use mpatch_common::LanguageProfiles;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Catalog search plus per-track audio resolution
#[derive(Clone)]
pub struct CatalogSearcher {
    catalog: Arc<dyn CatalogService>,
    resolver: Option<AudioResolver>,
    languages: Arc<LanguageProfiles>,
    retry: RetryPolicy,
}

impl CatalogSearcher {
    /// `resolver` is `None` when no secondary lookup key is configured
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        resolver: Option<AudioResolver>,
        languages: Arc<LanguageProfiles>,
    ) -> Self {
        Self {
            catalog,
            resolver,
            languages,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Search `query` for `language`, returning at most `limit` reachable songs
    pub async fn search(&self, query: &str, language: &str, limit: usize) -> Vec<Song> {
        if limit == 0 {
            return Vec::new();
        }

        let biased_query = self.languages.catalog_query(query, language);
        let catalog = self.catalog.clone();

        let tracks = match with_retry("catalog search", self.retry, || {
            let catalog = catalog.clone();
            let biased_query = biased_query.clone();
            async move { catalog.search_tracks(&biased_query, limit).await }
        })
        .await
        {
            Ok(tracks) => tracks,
            Err(e) => {
                warn!(language = %language, query = %biased_query, error = %e, "Catalog search failed");
                return Vec::new();
            }
        };

        let fetched = tracks.len();
        let mut songs = Vec::with_capacity(fetched.min(limit));
        let mut unresolved = Vec::new();

        for track in tracks.into_iter().take(limit) {
            let title_artist = title_artist(&track);
            let song = to_song(track, language);
            if song.audio.is_none() && self.resolver.is_some() {
                unresolved.push((songs.len(), Unresolved { song, title_artist }));
                // Placeholder slot keeps catalog order after resolution
                songs.push(None);
            } else {
                songs.push(Some(song));
            }
        }

        if let Some(resolver) = &self.resolver {
            if !unresolved.is_empty() {
                debug!(language = %language, count = unresolved.len(), "Resolving secondary sources");
                let (slots, batch): (Vec<usize>, Vec<Unresolved>) = unresolved.into_iter().unzip();
                let resolved = resolver.resolve_all(batch).await;
                for (slot, song) in slots.into_iter().zip(resolved) {
                    songs[slot] = Some(song);
                }
            }
        }

        let songs: Vec<Song> = songs
            .into_iter()
            .flatten()
            .filter(Song::is_reachable)
            .collect();

        info!(
            language = %language,
            requested = limit,
            fetched,
            usable = songs.len(),
            "Catalog search complete"
        );
        songs
    }
}

fn title_artist(track: &CatalogTrack) -> String {
    let name = track.name.as_deref().unwrap_or_default();
    let artist = track.artists.first().map(String::as_str).unwrap_or_default();
    format!("{} {}", name, artist).trim().to_string()
}

/// Convert a catalog track to a pipeline song with display defaults
fn to_song(track: CatalogTrack, language: &str) -> Song {
    let artist = if track.artists.is_empty() {
        None
    } else {
        Some(track.artists.join(", "))
    };

    let mut song = Song::new(track.id, track.name, artist, language);
    song.audio = track.preview_url;
    if let Some(image) = track.image_url.filter(|u| !u.is_empty()) {
        song.image = image;
    }
    song.duration_ms = track.duration_ms.unwrap_or(0);
    song.spotify_url = track.external_url;
    song
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::SecondaryLookup;
    use crate::error::UpstreamError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct StubCatalog {
        tracks: Vec<CatalogTrack>,
        failures_before_success: u32,
        failure: UpstreamError,
        calls: AtomicU32,
        queries: Mutex<Vec<(String, usize)>>,
    }

    impl StubCatalog {
        fn returning(tracks: Vec<CatalogTrack>) -> Self {
            Self {
                tracks,
                failures_before_success: 0,
                failure: UpstreamError::Network("down".into()),
                calls: AtomicU32::new(0),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CatalogService for StubCatalog {
        async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<CatalogTrack>, UpstreamError> {
            self.queries.lock().unwrap().push((query.to_string(), limit));
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures_before_success {
                return Err(self.failure.clone());
            }
            Ok(self.tracks.clone())
        }
    }

    struct FoundLookup;

    #[async_trait]
    impl SecondaryLookup for FoundLookup {
        async fn find_video_id(&self, query: &str) -> Result<Option<String>, UpstreamError> {
            if query.contains("Nowhere") {
                Err(UpstreamError::Network("unreachable".into()))
            } else {
                Ok(Some("eYq7WapuDLU".into()))
            }
        }
    }

    fn track(id: &str, preview: bool, spotify: bool) -> CatalogTrack {
        CatalogTrack {
            id: id.to_string(),
            name: Some(format!("Song {}", id)),
            artists: vec!["Artist One".to_string(), "Artist Two".to_string()],
            preview_url: preview.then(|| format!("https://p.scdn.co/mp3-preview/{}", id)),
            image_url: Some(format!("https://i.scdn.co/image/{}", id)),
            duration_ms: Some(180_000),
            external_url: spotify.then(|| format!("https://open.spotify.com/track/{}", id)),
        }
    }

    fn profiles() -> Arc<LanguageProfiles> {
        Arc::new(LanguageProfiles::builtin())
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy::single_retry().with_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_query_bias_and_limit() {
        let catalog = Arc::new(StubCatalog::returning(vec![track("a", true, true)]));
        let searcher = CatalogSearcher::new(catalog.clone(), None, profiles());

        searcher.search("sad", "tamil", 5).await;
        searcher.search("", "english", 3).await;

        let queries = catalog.queries.lock().unwrap().clone();
        assert_eq!(
            queries,
            vec![
                (r#"sad genre:tamil OR genre:"tamil film""#.to_string(), 5),
                ("genre:pop OR genre:rock".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_zero_limit_makes_no_call() {
        let catalog = Arc::new(StubCatalog::returning(vec![track("a", true, true)]));
        let searcher = CatalogSearcher::new(catalog.clone(), None, profiles());

        assert!(searcher.search("happy", "english", 0).await.is_empty());
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_song_mapping() {
        let catalog = Arc::new(StubCatalog::returning(vec![track("a", true, true)]));
        let searcher = CatalogSearcher::new(catalog, None, profiles());

        let songs = searcher.search("happy", "english", 5).await;
        assert_eq!(songs.len(), 1);
        let song = &songs[0];
        assert_eq!(song.name, "Song a");
        assert_eq!(song.artist, "Artist One, Artist Two");
        assert_eq!(song.audio.as_deref(), Some("https://p.scdn.co/mp3-preview/a"));
        assert_eq!(song.language, "english");
        assert_eq!(song.duration_ms, 180_000);
        assert_eq!(song.image, "https://i.scdn.co/image/a");
    }

    #[tokio::test]
    async fn test_unlinkable_tracks_dropped_linkable_kept() {
        let catalog = Arc::new(StubCatalog::returning(vec![
            track("preview", true, false),
            track("link-only", false, true),
            track("nothing", false, false),
        ]));
        let searcher = CatalogSearcher::new(catalog, None, profiles());

        let songs = searcher.search("calm", "english", 10).await;
        let ids: Vec<_> = songs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["preview", "link-only"]);
        assert!(songs[1].audio.is_none());
    }

    #[tokio::test]
    async fn test_missing_previews_resolved_in_order() {
        let catalog = Arc::new(StubCatalog::returning(vec![
            track("a", false, true),
            track("b", true, true),
            track("c", false, false),
        ]));
        let resolver = AudioResolver::new(Arc::new(FoundLookup), profiles());
        let searcher = CatalogSearcher::new(catalog, Some(resolver), profiles());

        let songs = searcher.search("happy", "tamil", 10).await;
        let ids: Vec<_> = songs.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(songs[0].audio.as_deref(), Some("/youtube-audio/eYq7WapuDLU"));
        assert_eq!(songs[1].audio.as_deref(), Some("https://p.scdn.co/mp3-preview/b"));
        assert_eq!(songs[2].youtube_id.as_deref(), Some("eYq7WapuDLU"));
    }

    #[tokio::test]
    async fn test_failed_lookup_keeps_song_with_spotify_link() {
        let mut keep = track("keep", false, true);
        keep.artists = vec!["Nowhere Man".to_string()];
        let mut drop = track("drop", false, false);
        drop.artists = vec!["Nowhere Man".to_string()];

        let catalog = Arc::new(StubCatalog::returning(vec![keep, drop]));
        let resolver = AudioResolver::new(Arc::new(FoundLookup), profiles()).with_retry_policy(RetryPolicy::none());
        let searcher = CatalogSearcher::new(catalog, Some(resolver), profiles());

        let songs = searcher.search("sad", "english", 10).await;
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, "keep");
        assert!(songs[0].audio.is_none());
        assert!(songs[0].spotify_url.is_some());
    }

    #[tokio::test]
    async fn test_transient_failure_retried_once() {
        let catalog = Arc::new(StubCatalog {
            failures_before_success: 1,
            ..StubCatalog::returning(vec![track("a", true, true)])
        });
        let searcher = CatalogSearcher::new(catalog.clone(), None, profiles()).with_retry_policy(fast_retry());

        assert_eq!(searcher.search("happy", "english", 5).await.len(), 1);
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_upstream_failure_yields_empty() {
        let catalog = Arc::new(StubCatalog {
            failures_before_success: u32::MAX,
            failure: UpstreamError::Unauthorized("bad client".into()),
            ..StubCatalog::returning(vec![track("a", true, true)])
        });
        let searcher = CatalogSearcher::new(catalog.clone(), None, profiles()).with_retry_policy(fast_retry());

        assert!(searcher.search("happy", "english", 5).await.is_empty());
        // Permanent failures are not retried
        assert_eq!(catalog.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_oversized_catalog_page_truncated() {
        let tracks = (0..8).map(|i| track(&i.to_string(), true, true)).collect();
        let catalog = Arc::new(StubCatalog::returning(tracks));
        let searcher = CatalogSearcher::new(catalog, None, profiles());

        assert_eq!(searcher.search("happy", "english", 3).await.len(), 3);
    }
}
