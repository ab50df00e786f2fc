//! REST route configuration.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, token};
use crate::state::AppState;
use std::sync::Arc;

/// Create the REST router.
///
/// # Endpoints
///
/// - `GET /` - health check
/// - `GET /token?room=...&identity=...` - mint a LiveKit join token
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::health_check))
        .route("/token", get(token::issue_token))
        .layer(TraceLayer::new_for_http())
}
