//! LiveKit join-token endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use livekit_api::access_token::{AccessToken, VideoGrants};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::state::AppState;

/// Query parameters for the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenQuery {
    /// Media room to join
    pub room: String,
    /// Identity of the joining participant
    pub identity: String,
}

/// Response body: the media server URL plus a signed join token.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub url: String,
    pub token: String,
}

/// Mint a short-lived LiveKit access token for `identity` to join `room`.
///
/// The token grants join, publish, and subscribe on that room only.
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TokenQuery>,
) -> AppResult<Json<TokenResponse>> {
    if query.room.trim().is_empty() {
        return Err(AppError::InvalidRequest("room must not be empty".into()));
    }
    if query.identity.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "identity must not be empty".into(),
        ));
    }

    let config = &state.config;
    let (Some(url), Some(api_key), Some(api_secret)) = (
        config.livekit_url.as_ref(),
        config.livekit_api_key.as_ref(),
        config.livekit_api_secret.as_ref(),
    ) else {
        return Err(AppError::Unavailable(
            "LiveKit credentials are not configured".into(),
        ));
    };

    let token = AccessToken::with_api_key(api_key, api_secret)
        .with_identity(&query.identity)
        .with_name(&query.identity)
        .with_grants(VideoGrants {
            room_join: true,
            room: query.room.clone(),
            can_publish: true,
            can_subscribe: true,
            ..Default::default()
        })
        .to_jwt()
        .map_err(|e| AppError::Token(e.to_string()))?;

    info!(room = %query.room, identity = %query.identity, "Issued LiveKit token");

    Ok(Json(TokenResponse {
        url: url.clone(),
        token,
    }))
}
