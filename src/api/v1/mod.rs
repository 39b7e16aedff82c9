//! Public v1 API

pub mod engines;
pub mod speech;
pub mod stream;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/audio/speech", post(speech::create_speech))
        .route(
            "/audio/speech/timestamps",
            post(speech::create_speech_with_timestamps),
        )
        .route("/audio/stream", get(stream::stream_speech))
        .route("/engines", get(engines::list_engines))
        .route("/engines/{engine_id}/voices", get(engines::list_voices))
}
