//! Realtime generation-path abstractions.
//!
//! A realtime session is a short-lived conversational connection to a
//! low-latency generation backend. One session serves exactly one resolution
//! call: constructed, started, asked for a single reply, then stopped.
//!
//! The session surface is a trait so the resolver can be exercised against
//! mock backends; the production implementation lives in [`gemini`].

pub mod gemini;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::extract::SpeechHandle;

pub use gemini::{GeminiLiveSession, GeminiSessionFactory};

/// Errors that can occur during realtime operations.
#[derive(Debug, Error)]
pub enum RealtimeError {
    /// Connection to the backend failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Backend-reported error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Session lifecycle error
    #[error("Session error: {0}")]
    SessionError(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

/// Result type for realtime operations.
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Configuration for one realtime session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeSessionConfig {
    /// API key for authentication
    pub api_key: String,

    /// Model to use (e.g. "gemini-2.0-flash-exp")
    #[serde(default)]
    pub model: String,

    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f32>,

    /// System instructions for the assistant
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A started (or startable) realtime conversational session.
///
/// Methods take `&self`; implementations use interior mutability so the
/// session can be shared between the racing reply task and the cleanup path.
#[async_trait]
pub trait RealtimeSession: Send + Sync {
    /// Open the connection and complete session setup.
    async fn start(&self) -> RealtimeResult<()>;

    /// Submit one user turn and return a handle to the in-flight generation.
    async fn generate_reply(&self, instructions: &str) -> RealtimeResult<Box<dyn SpeechHandle>>;

    /// Tear the session down. Safe to call on a never-started session.
    async fn stop(&self) -> RealtimeResult<()>;
}

/// Factory for realtime sessions, the injection seam for the resolver.
pub trait SessionFactory: Send + Sync {
    /// Construct an unstarted session from configuration.
    fn create(&self, config: RealtimeSessionConfig) -> RealtimeResult<Box<dyn RealtimeSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RealtimeError::ConnectionFailed("refused".to_string());
        assert!(err.to_string().contains("Connection failed"));

        let err = RealtimeError::Timeout("setup".to_string());
        assert_eq!(err.to_string(), "Operation timed out: setup");
    }

    #[test]
    fn test_default_config() {
        let config = RealtimeSessionConfig::default();
        assert!(config.api_key.is_empty());
        assert!(config.temperature.is_none());
        assert!(config.instructions.is_none());
    }
}
