//! HTTP server module

mod api;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::ws::ws_handler;

pub use api::{FriendsResponse, HealthResponse, MAX_USERNAME_LEN, UsernameQuery, validate_username};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/user-validation", get(api::user_validation))
        .route("/registered-user", get(ws_handler))
        .route("/existing-friends", get(api::existing_friends))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
