//! Recommendation endpoint
//!
//! POST /recommend

use axum::{body::Bytes, extract::State, routing::post, Json, Router};
use mpatch_common::api::{RecommendationRequest, RecommendationResponse};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult, ValidationError},
    services::EMPTY_MESSAGE_ERROR,
    AppState,
};

/// POST /recommend
///
/// Always answers with songs: 200 with live or fallback songs, 400 with
/// fallback songs for a missing mood or unreadable body, 500 with fallback
/// songs if composition itself blew up.
pub async fn recommend(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<RecommendationResponse>> {
    let request = match serde_json::from_slice::<RecommendationRequest>(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed recommendation body");
            let languages = RecommendationRequest::languages_from_raw(&body);
            return Err(ValidationError {
                message: EMPTY_MESSAGE_ERROR.to_string(),
                fallback: state.composer.fallback_for(&languages),
            }
            .into());
        }
    };

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("recommend", request_id = %request_id);
    let languages = request.effective_languages();

    // Runs detached so a panic in the pipeline becomes a 500, not a dropped connection
    let composer = state.composer.clone();
    let outcome = tokio::spawn(async move { composer.compose(&request).await }.instrument(span)).await;

    match outcome {
        Ok(Ok(response)) => Ok(Json(response)),
        Ok(Err(validation)) => Err(validation.into()),
        Err(join_error) => {
            tracing::error!(request_id = %request_id, error = %join_error, "Recommendation task failed");
            Err(ApiError::Internal {
                message: join_error.to_string(),
                songs: Some(state.composer.fallback_for(&languages)),
            })
        }
    }
}

/// Build recommendation routes
pub fn recommend_routes() -> Router<AppState> {
    Router::new().route("/recommend", post(recommend))
}
