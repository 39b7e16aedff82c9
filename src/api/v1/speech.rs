//! Batch and timestamped synthesis endpoints

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::api::middleware::Authenticated;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, TimestampsResponse};
use crate::domain::SpeakFrame;
use crate::infrastructure::routing::{RouteOptions, SynthesisOutput};

/// POST /v1/audio/speech
pub async fn create_speech(
    State(state): State<AppState>,
    Authenticated(admission): Authenticated,
    Json(body): Json<SpeakFrame>,
) -> Result<Response, ApiError> {
    let request = body.into_request()?;

    info!(
        key_id = %admission.key_id(),
        engine = ?request.engine(),
        characters = request.character_count(),
        "Processing speech request"
    );

    let routed = state
        .router
        .route(admission.key_id(), request, RouteOptions::batch())
        .await?;

    let SynthesisOutput::Audio(audio) = routed.output else {
        return Err(ApiError::internal("Engine returned no audio"));
    };

    Ok((
        [
            (header::CONTENT_TYPE, routed.format.content_type()),
            (header::HeaderName::from_static("x-engine"), routed.engine.as_str()),
            (header::HeaderName::from_static("x-audio-format"), routed.format.as_str()),
        ],
        audio,
    )
        .into_response())
}

/// POST /v1/audio/speech/timestamps
pub async fn create_speech_with_timestamps(
    State(state): State<AppState>,
    Authenticated(admission): Authenticated,
    Json(body): Json<SpeakFrame>,
) -> Result<Json<TimestampsResponse>, ApiError> {
    let request = body.into_request()?;

    info!(
        key_id = %admission.key_id(),
        engine = ?request.engine(),
        "Processing timestamped speech request"
    );

    let routed = state
        .router
        .route(admission.key_id(), request, RouteOptions::with_timestamps())
        .await?;

    let SynthesisOutput::Timestamped(result) = routed.output else {
        return Err(ApiError::internal("Engine returned no timestamps"));
    };

    Ok(Json(TimestampsResponse::new(routed.engine, result)))
}
