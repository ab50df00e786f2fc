//! Gemini Live endpoint constants and helpers.

use std::time::Duration;

/// Production WebSocket endpoint for bidirectional content generation.
pub const GEMINI_LIVE_WS_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Bound on waiting for the server's `setupComplete` acknowledgement.
pub const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Qualify a bare model name with the `models/` prefix the wire expects.
pub fn qualified_model_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_model_name_adds_prefix() {
        assert_eq!(
            qualified_model_name("gemini-2.0-flash-exp"),
            "models/gemini-2.0-flash-exp"
        );
    }

    #[test]
    fn test_qualified_model_name_keeps_existing_prefix() {
        assert_eq!(
            qualified_model_name("models/gemini-2.0-flash-exp"),
            "models/gemini-2.0-flash-exp"
        );
    }
}
