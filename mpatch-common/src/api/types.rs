//! Shared API request/response types
//!
//! `Song` is the unit every component of the recommendation pipeline produces
//! and the browser player consumes. Field names on the wire follow the player's
//! existing JSON contract (`youtube_id`, `spotify_url`, `duration`).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

/// Display name used when the catalog omits a track title
pub const UNKNOWN_TRACK: &str = "Unknown Track";

/// Display name used when the catalog omits the artist list
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Artwork shown when the catalog has no album image
pub const PLACEHOLDER_IMAGE: &str = "/img/placeholder.png";

/// Path prefix of the local secondary-audio proxy route
pub const PROXY_PATH_PREFIX: &str = "/youtube-audio/";

/// Requested song count when the caller omits `count`
pub const DEFAULT_COUNT: usize = 10;

/// Largest honoured `count` (the catalog's maximum page size)
pub const MAX_COUNT: usize = 50;

/// Most distinct language tags served per request; later tags are ignored
pub const MAX_LANGUAGES: usize = 8;

// ========================================
// Song
// ========================================

/// A playable (or at least externally linkable) song candidate
///
/// Built once per request and never mutated in place; resolving a secondary
/// audio source produces a new value via [`Song::with_secondary_source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Unique within a single response, not globally stable
    pub id: String,
    pub name: String,
    pub artist: String,
    /// Preview URL or local proxy path; `None` means external links only
    pub audio: Option<String>,
    pub youtube_id: Option<String>,
    pub image: String,
    /// Caller-supplied language tag this song was gathered for
    pub language: String,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub spotify_url: Option<String>,
}

impl Song {
    /// Create a song with display defaults for absent upstream fields
    pub fn new(
        id: impl Into<String>,
        name: Option<String>,
        artist: Option<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            artist: artist
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            audio: None,
            youtube_id: None,
            image: PLACEHOLDER_IMAGE.to_string(),
            language: language.into(),
            duration_ms: 0,
            spotify_url: None,
        }
    }

    /// Attach a resolved secondary source, pointing `audio` at the local proxy
    ///
    /// An existing native preview is kept; the identifier is still recorded
    /// so the client can offer it as an external link.
    pub fn with_secondary_source(self, youtube_id: String) -> Self {
        let audio = self
            .audio
            .or_else(|| Some(proxy_path(&youtube_id)));
        Self {
            audio,
            youtube_id: Some(youtube_id),
            ..self
        }
    }

    /// True when the song can be played directly or opened externally
    pub fn is_reachable(&self) -> bool {
        self.audio.is_some() || self.youtube_id.is_some() || self.spotify_url.is_some()
    }

    /// Best external link for clients that cannot play `audio`
    pub fn external_link(&self) -> Option<String> {
        self.youtube_id
            .as_ref()
            .map(|id| format!("https://www.youtube.com/watch?v={}", id))
            .or_else(|| self.spotify_url.clone())
    }
}

/// Local proxy path streaming the given secondary-source identifier
pub fn proxy_path(youtube_id: &str) -> String {
    format!("{}{}", PROXY_PATH_PREFIX, youtube_id)
}

// ========================================
// Recommendation Request/Response
// ========================================

fn default_count() -> usize {
    DEFAULT_COUNT
}

fn default_languages() -> Vec<String> {
    vec!["english".to_string(), "tamil".to_string()]
}

/// Treat an explicit JSON `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_default_count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<usize>::deserialize(deserializer)?.unwrap_or(DEFAULT_COUNT))
}

/// Body of `POST /recommend`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendationRequest {
    /// Free-text mood description (required, non-blank)
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    /// Requested total number of songs
    #[serde(default = "default_count", deserialize_with = "null_as_default_count")]
    pub count: usize,
    /// Ordered language tags; order sets quota iteration and top-up language
    #[serde(default = "default_languages", deserialize_with = "null_as_default")]
    pub languages: Vec<String>,
}

impl Default for RecommendationRequest {
    fn default() -> Self {
        Self {
            message: String::new(),
            count: DEFAULT_COUNT,
            languages: default_languages(),
        }
    }
}

impl RecommendationRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Languages to serve, falling back to the defaults for an empty list
    ///
    /// Blank tags are dropped, repeats (case-insensitive) keep their first
    /// position, and at most [`MAX_LANGUAGES`] tags survive.
    pub fn effective_languages(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let languages: Vec<String> = self
            .languages
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty() && seen.insert(l.to_lowercase()))
            .take(MAX_LANGUAGES)
            .map(str::to_string)
            .collect();
        if languages.is_empty() {
            default_languages()
        } else {
            languages
        }
    }

    /// Languages named by a body that failed to parse as a request
    ///
    /// Reads the `languages` array leniently (non-string entries skipped) so
    /// a rejected request can still be answered in the caller's languages.
    pub fn languages_from_raw(body: &[u8]) -> Vec<String> {
        let languages = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                value.get("languages")?.as_array().map(|tags| {
                    tags.iter()
                        .filter_map(|tag| tag.as_str().map(str::to_string))
                        .collect::<Vec<String>>()
                })
            })
            .unwrap_or_default();
        Self {
            languages,
            ..Self::default()
        }
        .effective_languages()
    }

    /// Requested count capped at [`MAX_COUNT`]
    pub fn effective_count(&self) -> usize {
        self.count.min(MAX_COUNT)
    }

    /// True when the message carries no mood text
    pub fn is_blank(&self) -> bool {
        self.message.trim().is_empty()
    }
}

/// Where the songs of a successful response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Live catalog composition
    Live,
    /// Live composition yielded nothing; curated list substituted
    Fallback,
}

/// Successful `POST /recommend` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub emotion: String,
    pub source: ResultSource,
    pub songs: Vec<Song>,
}

/// Error body; recommendation errors still carry playable fallback songs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub songs: Option<Vec<Song>>,
}
