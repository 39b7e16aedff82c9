//! Admin API: key management, usage reporting, engine lifecycle

pub mod api_keys;
pub mod engines;
pub mod usage;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route(
            "/api-keys/{key_id}",
            get(api_keys::get_api_key).delete(api_keys::delete_api_key),
        )
        .route("/api-keys/{key_id}/revoke", post(api_keys::revoke_api_key))
        .route(
            "/usage",
            get(usage::list_usage).delete(usage::clear_usage),
        )
        .route("/usage/stats", get(usage::usage_stats))
        .route("/engines/{engine_id}/dispose", post(engines::dispose_engine))
}
