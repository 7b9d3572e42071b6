//! REST API handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppState, ServerError};

/// Longest username accepted
pub const MAX_USERNAME_LEN: usize = 64;

/// `?username=` query shared by every endpoint
#[derive(Debug, Default, Deserialize)]
pub struct UsernameQuery {
    pub username: Option<String>,
}

impl UsernameQuery {
    /// Extract and validate the username
    pub fn require(self) -> Result<String, ServerError> {
        let username = self.username.unwrap_or_default();
        validate_username(&username)?;
        Ok(username)
    }
}

/// Check that a username is acceptable before it reaches the relay
pub fn validate_username(username: &str) -> Result<(), ServerError> {
    if username.trim().is_empty() {
        return Err(ServerError::BadRequest("Username is required".to_string()));
    }
    if username.chars().count() > MAX_USERNAME_LEN {
        return Err(ServerError::BadRequest(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if username.chars().any(char::is_control) {
        return Err(ServerError::BadRequest(
            "Username must not contain control characters".to_string(),
        ));
    }
    Ok(())
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Status of the server
    pub status: String,
    /// Server version
    pub version: String,
    /// Seconds since server started
    pub uptime_seconds: i64,
    /// Number of connected users
    pub online_users: usize,
}

/// Health check endpoint
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let online_users = state.relay.presence().online_count().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        online_users,
    })
}

/// GET /user-validation - Is this username free?
///
/// 200 when available, 302 when someone is connected under it.
pub async fn user_validation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<StatusCode, ServerError> {
    let username = query.require()?;
    info!("Validating username: {}", username);

    if state.relay.presence().is_registered(&username).await {
        info!("{} is already used", username);
        return Ok(StatusCode::FOUND);
    }

    info!("Accepted: {}", username);
    Ok(StatusCode::OK)
}

/// Response for GET /existing-friends
#[derive(Debug, Serialize, Deserialize)]
pub struct FriendsResponse {
    /// Usernames currently online, excluding the requester
    pub friends: Vec<String>,
}

/// GET /existing-friends - Who can the requester message right now
pub async fn existing_friends(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<FriendsResponse>, ServerError> {
    let username = query.require()?;
    info!("{} looking for friends", username);

    let presence = state.relay.presence();
    if !presence.is_registered(&username).await {
        return Err(ServerError::Forbidden(username));
    }

    Ok(Json(FriendsResponse {
        friends: presence.online_peers(&username).await,
    }))
}
