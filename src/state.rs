//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::{GeminiSessionFactory, GeminiTextClient, ResponseResolver};
use crate::core::resolver::PersonaConfig;
use crate::handlers::chat::ChannelRegistry;
use crate::prompt;

/// State shared by all handlers.
pub struct AppState {
    /// Server configuration loaded at startup
    pub config: Arc<ServerConfig>,
    /// Message-to-reply resolver shared by every channel
    pub resolver: Arc<ResponseResolver>,
    /// Per-channel connection membership
    pub channels: ChannelRegistry,
}

impl AppState {
    /// Wire the production resolver from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let persona = PersonaConfig {
            name: prompt::PERSONA_NAME.to_string(),
            instructions: prompt::combined_instructions(),
        };
        let resolver = ResponseResolver::new(
            Arc::new(GeminiSessionFactory),
            Arc::new(GeminiTextClient::new(
                &config.google_api_key,
                &config.text_model,
            )),
            persona,
            config.google_api_key.clone(),
            config.realtime_model.clone(),
        );

        Self {
            config: Arc::new(config),
            resolver: Arc::new(resolver),
            channels: ChannelRegistry::new(),
        }
    }
}
