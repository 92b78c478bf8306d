//! Router configuration for the topic sync API.

use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::auth::require_jwt;
use crate::handlers::{health, sync_users};
use crate::state::AppState;

/// Create the service router.
///
/// Provides:
/// - PUT /v4/topics/syncUsers - Sync topic allow-lists with the roster (bearer token)
/// - GET /health - Liveness probe
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v4/topics/syncUsers", put(sync_users))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_jwt));

    Router::new()
        .route("/health", get(health))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
