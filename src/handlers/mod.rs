//! HTTP and WebSocket request handlers
//!
//! This module organizes all handlers into logical groups:
//! - `chat` - Channel chat relay WebSocket
//! - `token` - LiveKit join-token endpoint

pub mod chat;
pub mod token;

use axum::Json;
use serde_json::{Value, json};

// Re-export commonly used handlers for convenient access
pub use chat::chat_handler;
pub use token::issue_token;

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
