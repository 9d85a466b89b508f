//! Error types for mpatch-rec
//!
//! Two layers:
//! - [`UpstreamError`]: a collaborator call (sentiment, catalog, lookup,
//!   stream) failed. Always recovered inside the pipeline and logged.
//! - [`ApiError`]: what an HTTP handler returns. Recommendation errors carry
//!   fallback songs so the player always has something to offer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mpatch_common::api::{ErrorResponse, Song};
use thiserror::Error;

/// Failure of an external collaborator call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpstreamError {
    /// Collaborator has no credentials/endpoint configured
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Connection or transport failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Credentials rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Upstream quota exhausted (429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Any other non-success HTTP status
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl UpstreamError {
    /// Classify a reqwest transport error
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout(format!("{} request timed out: {}", service, err))
        } else if err.is_decode() {
            UpstreamError::Parse(format!("Failed to parse {} response: {}", service, err))
        } else {
            UpstreamError::Network(format!("{} request failed: {}", service, err))
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(service: &'static str, status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 => UpstreamError::Unauthorized(format!("{} rejected credentials ({})", service, status)),
            429 => UpstreamError::RateLimited(format!("{} rate limit exceeded", service)),
            code => UpstreamError::Status { service, status: code },
        }
    }

    /// True for failures worth one more attempt
    pub fn is_transient(&self) -> bool {
        match self {
            UpstreamError::Network(_) | UpstreamError::Timeout(_) | UpstreamError::RateLimited(_) => true,
            UpstreamError::Status { status, .. } => *status >= 500,
            UpstreamError::NotConfigured(_)
            | UpstreamError::Unauthorized(_)
            | UpstreamError::Parse(_) => false,
        }
    }
}

/// Recommendation request rejected before any upstream call
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    /// Static fallback for the requested languages
    pub fallback: Vec<Song>,
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid recommendation input (400), fallback songs attached
    #[error("Invalid request: {0}")]
    Validation(ValidationError),

    /// Malformed secondary-source identifier (400)
    #[error("Invalid media identifier: {0}")]
    InvalidMediaId(String),

    /// Upstream stream could not be fetched (502)
    #[error("Bad gateway: {0}")]
    BadGateway(String),

    /// Unexpected failure (500), fallback songs attached when available
    #[error("Internal server error: {message}")]
    Internal { message: String, songs: Option<Vec<Song>> },
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(err) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: err.message,
                    songs: Some(err.fallback),
                },
            ),
            ApiError::InvalidMediaId(_) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "Invalid ID".to_string(),
                    songs: None,
                },
            ),
            ApiError::BadGateway(_) => (
                StatusCode::BAD_GATEWAY,
                ErrorResponse {
                    error: "Failed to fetch YouTube audio".to_string(),
                    songs: None,
                },
            ),
            ApiError::Internal { songs, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: "Something went wrong".to_string(),
                    songs,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
