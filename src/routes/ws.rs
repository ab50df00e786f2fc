//! Chat WebSocket route configuration.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::chat::chat_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the chat relay router.
///
/// # Endpoint
///
/// `GET /ws/{channel_id}` - WebSocket upgrade joining the connection to the
/// named channel
///
/// # Protocol
///
/// After upgrade, every text frame from a client is treated as one user
/// message: other channel members receive it as `User: {text}`, then the
/// resolved assistant reply is sent to every member as a plain text frame.
pub fn create_chat_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ws/{channel_id}", get(chat_handler))
        .layer(TraceLayer::new_for_http())
}
