//! Recommendation pipeline services
//!
//! Bottom-up: [`AudioResolver`] feeds [`CatalogSearcher`], which together
//! with [`EmotionClassifier`] and the static fallback feeds
//! [`RecommendationComposer`].

pub mod audio_resolver;
pub mod catalog_searcher;
pub mod composer;
pub mod emotion_classifier;
pub mod fallback;

pub use audio_resolver::{is_valid_video_id, AudioResolver, Unresolved};
pub use catalog_searcher::CatalogSearcher;
pub use composer::{RecommendationComposer, EMPTY_MESSAGE_ERROR};
pub use emotion_classifier::{match_keywords, EmotionClassifier, DEFAULT_EMOTION};
pub use fallback::{fallback_songs, FALLBACK_CATALOG_VERSION};
