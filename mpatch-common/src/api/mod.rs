//! API types shared between the recommendation service and its clients
//!
//! Contains ONLY plain data types (serde), no HTTP framework dependencies.
//! The wire format matches what the browser player already consumes.

pub mod types;

pub use types::{
    proxy_path, ErrorResponse, RecommendationRequest, RecommendationResponse, ResultSource, Song,
    DEFAULT_COUNT, MAX_COUNT, MAX_LANGUAGES, PROXY_PATH_PREFIX,
};
