//! Gemini Live WebSocket message types.
//!
//! All messages are JSON-encoded with camelCase wire names.
//!
//! Client messages (sent to server):
//! - `setup` - session configuration (model, generation config, system
//!   instruction); must be the first message on the socket
//! - `clientContent` - one or more conversation turns, with `turnComplete`
//!   marking the end of the user's turn
//!
//! Server messages (received from server):
//! - `setupComplete` - session ready
//! - `serverContent` - incremental model output (`modelTurn` parts) plus
//!   `turnComplete` / `generationComplete` completion flags

use serde::{Deserialize, Serialize};

// =============================================================================
// Shared content types
// =============================================================================

/// One conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    /// Turn role ("user" or "model")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content parts
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One part of a turn. Only text parts are used by this gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Content {
    /// A single-part user turn.
    pub fn user_text(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    /// A role-less single-part turn (system instruction shape).
    pub fn bare_text(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    /// Concatenated text of all parts.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }
}

// =============================================================================
// Client messages
// =============================================================================

/// Messages sent to the server. Exactly one field is set per message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientMessage {
    Setup(Setup),
    ClientContent(ClientContent),
}

/// Session setup, the mandatory first message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    /// Qualified model name ("models/...")
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

/// Generation parameters for the session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Requested output modalities. Text-only keeps transcripts reliable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_modalities: Option<Vec<String>>,
}

/// One or more client turns.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

// =============================================================================
// Server messages
// =============================================================================

/// Message received from the server. Fields are optional because the wire
/// sends one payload kind per frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    #[serde(default)]
    pub setup_complete: Option<SetupComplete>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
}

/// Setup acknowledgement payload (empty on the wire).
#[derive(Debug, Clone, Deserialize)]
pub struct SetupComplete {}

/// Incremental model output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<Content>,
    #[serde(default)]
    pub turn_complete: Option<bool>,
    #[serde(default)]
    pub generation_complete: Option<bool>,
    #[serde(default)]
    pub interrupted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_setup_serializes_camel_case() {
        let msg = ClientMessage::Setup(Setup {
            model: "models/gemini-2.0-flash-exp".to_string(),
            generation_config: Some(GenerationConfig {
                temperature: Some(0.8),
                response_modalities: Some(vec!["TEXT".to_string()]),
            }),
            system_instruction: Some(Content::bare_text("be brief")),
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["setup"]["model"], "models/gemini-2.0-flash-exp");
        assert_eq!(value["setup"]["generationConfig"]["temperature"], 0.8);
        assert_eq!(
            value["setup"]["generationConfig"]["responseModalities"][0],
            "TEXT"
        );
        assert_eq!(
            value["setup"]["systemInstruction"]["parts"][0]["text"],
            "be brief"
        );
    }

    #[test]
    fn test_client_content_serializes_turn_complete() {
        let msg = ClientMessage::ClientContent(ClientContent {
            turns: vec![Content::user_text("hello")],
            turn_complete: true,
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["clientContent"]["turnComplete"], true);
        assert_eq!(value["clientContent"]["turns"][0]["role"], "user");
    }

    #[test]
    fn test_server_message_setup_complete() {
        let msg: ServerMessage = serde_json::from_value(json!({ "setupComplete": {} })).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }

    #[test]
    fn test_server_message_model_turn() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "serverContent": {
                "modelTurn": { "role": "model", "parts": [{ "text": "Hi " }, { "text": "coach" }] },
                "turnComplete": true
            }
        }))
        .unwrap();
        let content = msg.server_content.unwrap();
        assert_eq!(content.turn_complete, Some(true));
        assert_eq!(content.model_turn.unwrap().joined_text(), "Hi coach");
    }

    #[test]
    fn test_server_message_ignores_unknown_fields() {
        let msg: ServerMessage = serde_json::from_value(json!({
            "usageMetadata": { "totalTokenCount": 12 }
        }))
        .unwrap();
        assert!(msg.setup_complete.is_none());
        assert!(msg.server_content.is_none());
    }
}
