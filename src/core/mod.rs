//! Core response-generation components.
//!
//! The pipeline, leaf-first:
//! - [`extract`] - pulls a plain-text answer out of an opaque generation
//!   handle of uncertain shape.
//! - [`text`] - one-shot stable text-generation path (reliability fallback).
//! - [`realtime`] - low-latency Gemini Live session (primary path).
//! - [`resolver`] - races both paths and decides the single reply string.
//!
//! The only operation consumed outside this module is
//! [`resolver::ResponseResolver::resolve`], which always returns a non-empty
//! string and never fails.

pub mod extract;
pub mod realtime;
pub mod resolver;
pub mod text;

pub use extract::{ChatItem, ChatItemsFn, SpeechHandle, finalize_and_extract};
pub use realtime::{
    GeminiLiveSession, GeminiSessionFactory, RealtimeError, RealtimeResult, RealtimeSession,
    RealtimeSessionConfig, SessionFactory,
};
pub use resolver::ResponseResolver;
pub use text::{GeminiTextClient, TextError, TextGenerator, TextResult};
