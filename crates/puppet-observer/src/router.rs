//! Axum router construction for the observer API.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// See [`handlers`] for the endpoint table. CORS allows any origin so a
/// dashboard can be served from elsewhere.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::get_status))
        // Agents
        .route("/api/agents", get(handlers::list_agents))
        .route("/api/agents/{id}", get(handlers::get_agent))
        .route("/api/agents/{id}/state", get(handlers::get_agent_state))
        .route("/api/agents/{id}/posts", post(handlers::create_post))
        .route("/api/agents/{id}/stop", post(handlers::stop_agent))
        .route("/api/agents/{id}/start", post(handlers::start_agent))
        // Events
        .route("/api/events", post(handlers::dispatch_event))
        // Driver loop
        .route("/api/engine/pause", post(handlers::pause))
        .route("/api/engine/resume", post(handlers::resume))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
