//! Secondary audio proxy
//!
//! GET /youtube-audio/:id streams a resolved secondary source back to the
//! player. The identifier is validated before anything leaves the process
//! and bytes are passed through untouched.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::{
    error::{ApiError, ApiResult},
    services::is_valid_video_id,
    AppState,
};

/// Content type used when upstream does not report an audio type
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// GET /youtube-audio/:id
pub async fn stream_secondary_source(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> ApiResult<Response> {
    if !is_valid_video_id(&video_id) {
        return Err(ApiError::InvalidMediaId(video_id));
    }

    let source = state.audio_source.as_ref().ok_or_else(|| {
        tracing::warn!(video_id = %video_id, "Audio stream source not configured");
        ApiError::BadGateway("audio stream source not configured".to_string())
    })?;

    let stream = source.open_stream(&video_id).await.map_err(|e| {
        tracing::warn!(video_id = %video_id, error = %e, "Failed to open secondary audio stream");
        ApiError::BadGateway(e.to_string())
    })?;

    let content_type = stream
        .content_type
        .filter(|ct| ct.starts_with("audio/"))
        .unwrap_or_else(|| DEFAULT_AUDIO_CONTENT_TYPE.to_string());

    tracing::debug!(video_id = %video_id, content_type = %content_type, "Streaming secondary audio");

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, "inline".to_string()),
        ],
        Body::from_stream(stream.body),
    )
        .into_response())
}

/// Build audio proxy routes
pub fn audio_proxy_routes() -> Router<AppState> {
    Router::new().route("/youtube-audio/:id", get(stream_secondary_source))
}
