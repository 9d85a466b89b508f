//! Recommendation composer
//!
//! Top-level pipeline for one request:
//!
//! 1. validate the mood text (the only branch that skips every upstream call)
//! 2. classify it once
//! 3. search every requested language with an even quota, a few at a time
//! 4. top up the shortfall once from the first language
//! 5. substitute the static fallback if nothing survived
//! 6. truncate to the requested count
//!
//! Individual search failures only shrink the result; the composer itself
//! fails only on validation.

use super::catalog_searcher::CatalogSearcher;
use super::emotion_classifier::EmotionClassifier;
use super::fallback::fallback_songs;
use crate::error::ValidationError;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use mpatch_common::api::{RecommendationRequest, RecommendationResponse, ResultSource, Song};
use mpatch_common::LanguageProfiles;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error message for a missing mood description
pub const EMPTY_MESSAGE_ERROR: &str = "Please describe your mood";

/// Per-language catalog searches in flight per request
pub const SEARCH_CONCURRENCY: usize = 4;

/// Request → emotion + ordered songs
pub struct RecommendationComposer {
    classifier: EmotionClassifier,
    searcher: CatalogSearcher,
    languages: Arc<LanguageProfiles>,
}

impl RecommendationComposer {
    pub fn new(classifier: EmotionClassifier, searcher: CatalogSearcher, languages: Arc<LanguageProfiles>) -> Self {
        Self {
            classifier,
            searcher,
            languages,
        }
    }

    /// Static fallback for `languages`, used by the HTTP layer on internal failure
    pub fn fallback_for(&self, languages: &[String]) -> Vec<Song> {
        fallback_songs(languages, &self.languages)
    }

    /// Compose a recommendation
    ///
    /// # Errors
    ///
    /// [`ValidationError`] when the message is blank; it carries the static
    /// fallback for the requested languages.
    pub async fn compose(&self, request: &RecommendationRequest) -> Result<RecommendationResponse, ValidationError> {
        let languages = request.effective_languages();

        if request.is_blank() {
            debug!("Rejecting blank mood text");
            return Err(ValidationError {
                message: EMPTY_MESSAGE_ERROR.to_string(),
                fallback: self.fallback_for(&languages),
            });
        }

        let emotion = self.classifier.classify(&request.message).await;
        let count = request.effective_count();
        info!(emotion = %emotion, count, languages = ?languages, "Composing recommendation");

        if count == 0 {
            return Ok(RecommendationResponse {
                emotion,
                source: ResultSource::Live,
                songs: Vec::new(),
            });
        }

        let quota = count.div_ceil(languages.len());
        let batches: Vec<Vec<Song>> = stream::iter(&languages)
            .map(|language| self.searcher.search(&emotion, language, quota))
            .buffered(SEARCH_CONCURRENCY)
            .collect()
            .boxed()
            .await;

        let mut seen = HashSet::new();
        let mut songs = Vec::with_capacity(count);
        for batch in batches {
            extend_unique(&mut songs, &mut seen, batch);
        }

        if songs.len() < count {
            let shortfall = count - songs.len();
            let top_up_language = &languages[0];
            debug!(language = %top_up_language, shortfall, "Topping up from first language");
            let extra = self.searcher.search("", top_up_language, shortfall).await;
            extend_unique(&mut songs, &mut seen, extra);
        }

        let source = if songs.is_empty() {
            warn!(emotion = %emotion, "Live composition empty, serving static fallback");
            songs = self.fallback_for(&languages);
            ResultSource::Fallback
        } else {
            ResultSource::Live
        };

        songs.truncate(count);
        info!(emotion = %emotion, songs = songs.len(), source = ?source, "Recommendation composed");

        Ok(RecommendationResponse { emotion, source, songs })
    }
}

/// Append songs whose id has not been seen yet
fn extend_unique(songs: &mut Vec<Song>, seen: &mut HashSet<String>, batch: Vec<Song>) {
    songs.extend(batch.into_iter().filter(|song| seen.insert(song.id.clone())));
}
