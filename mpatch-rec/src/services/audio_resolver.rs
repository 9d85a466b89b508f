//! Secondary audio source resolution
//!
//! Candidates the catalog returned without a preview clip get one lookup on
//! the video platform. Lookups for a batch run concurrently with a small
//! bound and their results are re-assembled in the original candidate order.

use crate::clients::{with_retry, RetryPolicy, SecondaryLookup};
use futures::stream::{self, StreamExt};
use mpatch_common::api::Song;
use mpatch_common::LanguageProfiles;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default number of lookups in flight per batch
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Length of a YouTube video identifier
const VIDEO_ID_LEN: usize = 11;

/// True for a well-formed video identifier (11 chars of `[A-Za-z0-9_-]`)
pub fn is_valid_video_id(id: &str) -> bool {
    id.len() == VIDEO_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Song awaiting secondary resolution plus its `"{title} {artist}"` hint
#[derive(Debug, Clone)]
pub struct Unresolved {
    pub song: Song,
    pub title_artist: String,
}

/// Resolves secondary sources through a [`SecondaryLookup`]
#[derive(Clone)]
pub struct AudioResolver {
    lookup: Arc<dyn SecondaryLookup>,
    languages: Arc<LanguageProfiles>,
    concurrency: usize,
    retry: RetryPolicy,
}

impl AudioResolver {
    pub fn new(lookup: Arc<dyn SecondaryLookup>, languages: Arc<LanguageProfiles>) -> Self {
        Self {
            lookup,
            languages,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Look up one secondary source identifier
    ///
    /// Returns `None` when nothing matched, the lookup failed, or the
    /// returned identifier is malformed.
    pub async fn resolve_secondary_source(&self, title_artist_hint: &str, language: &str) -> Option<String> {
        let query = self.languages.lookup_hint(title_artist_hint, language);
        let lookup = self.lookup.clone();

        match with_retry("secondary lookup", self.retry, || {
            let lookup = lookup.clone();
            let query = query.clone();
            async move { lookup.find_video_id(&query).await }
        })
        .await
        {
            Ok(Some(id)) if is_valid_video_id(&id) => Some(id),
            Ok(Some(id)) => {
                warn!(query = %query, video_id = %id, "Lookup returned malformed identifier, ignoring");
                None
            }
            Ok(None) => {
                debug!(query = %query, "No secondary source found");
                None
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Secondary source lookup failed");
                None
            }
        }
    }

    /// Resolve a batch, preserving input order
    ///
    /// Songs that resolve get `audio` pointed at the local proxy; the rest
    /// come back unchanged.
    pub async fn resolve_all(&self, batch: Vec<Unresolved>) -> Vec<Song> {
        stream::iter(batch)
            .map(|item| async move {
                match self
                    .resolve_secondary_source(&item.title_artist, &item.song.language)
                    .await
                {
                    Some(id) => item.song.with_secondary_source(id),
                    None => item.song,
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }
}
