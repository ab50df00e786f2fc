//! Gemini Live realtime session.
//!
//! WebSocket client for the generative-language `BidiGenerateContent`
//! endpoint, configured for text-only turns: the gateway relays text, so the
//! session omits audio modalities entirely and reads the model turn straight
//! off the wire.

mod client;
mod config;
mod messages;

pub use client::{GeminiLiveSession, GeminiSessionFactory, GeminiSpeechHandle};
pub use config::{GEMINI_LIVE_WS_URL, SETUP_TIMEOUT, qualified_model_name};
