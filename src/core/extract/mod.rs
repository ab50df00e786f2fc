//! Best-effort text extraction from opaque generation handles.
//!
//! The realtime backend hands back a "speech handle" whose internal shape is
//! not guaranteed: depending on the SDK build it may expose a completion-wait
//! primitive, and its chat items may arrive as a precomputed list or as a
//! zero-argument producer. Individual items are just as varied - the text may
//! live in a `content` list, a direct `text`/`content` string, a `parts`
//! list, or nowhere at all.
//!
//! This module treats that ambiguity as a first-class modeling concern:
//! [`SpeechHandle`] is a narrow capability interface whose methods are probed
//! at runtime, [`ChatItem`] wraps raw JSON, and [`message_text`] is a pure
//! function running an ordered chain of shape-matching strategies.
//!
//! Extraction never fails loudly. Every error degrades to `None` and is
//! logged at debug level only.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Bound on the handle's completion-wait capability.
pub const DONE_WAIT_TIMEOUT: Duration = Duration::from_secs(10);
/// Bound on the handle's playout-wait capability.
pub const PLAYOUT_WAIT_TIMEOUT: Duration = Duration::from_secs(8);

/// Role tags recognized as assistant output, besides the persona name.
const ASSISTANT_ROLES: [&str; 3] = ["assistant", "ai", "agent"];

/// Boxed future returned by optional handle capabilities.
pub type CapabilityFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Zero-argument producer of chat items, for handle builds that expose the
/// collection as a callable rather than a list.
pub type ChatItemsFn = Arc<dyn Fn() -> Result<Vec<ChatItem>, ItemsError> + Send + Sync>;

/// Failure to materialize the chat-items collection. Never fatal.
#[derive(Debug, Clone, Error)]
#[error("chat items unavailable: {0}")]
pub struct ItemsError(pub String);

/// One turn in a handle's item collection, in whatever shape the backend
/// provided it. Kept as raw JSON so the extraction strategies can probe it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatItem(pub Value);

impl ChatItem {
    /// Role/speaker tag of this item, when one is present.
    pub fn role(&self) -> Option<&str> {
        self.0
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| self.0.get("speaker").and_then(Value::as_str))
    }
}

impl From<Value> for ChatItem {
    fn from(value: Value) -> Self {
        ChatItem(value)
    }
}

/// Narrow capability interface over an in-flight or completed model turn.
///
/// Every method is optional: `None` means the backend build does not expose
/// that capability, and the extractor continues without it.
pub trait SpeechHandle: Send + Sync {
    /// Completion-wait capability, when exposed.
    fn done(&self) -> Option<CapabilityFuture<'_>> {
        None
    }

    /// Playout-wait capability, when exposed.
    fn wait_for_playout(&self) -> Option<CapabilityFuture<'_>> {
        None
    }

    /// Chat items as a precomputed list, when exposed in that shape.
    fn chat_items(&self) -> Option<Vec<ChatItem>> {
        None
    }

    /// Chat items as a zero-argument producer, when exposed in that shape.
    fn chat_items_fn(&self) -> Option<ChatItemsFn> {
        None
    }
}

/// Wait for the handle to settle (best effort), then extract plain text from
/// its chat items.
///
/// `persona` is the assistant's persona name; items tagged with it count as
/// assistant output alongside the generic assistant roles.
pub async fn finalize_and_extract(handle: &dyn SpeechHandle, persona: &str) -> Option<String> {
    // Completion signals are best-effort: a slow or absent capability must
    // not block extraction.
    if let Some(fut) = handle.done() {
        let _ = tokio::time::timeout(DONE_WAIT_TIMEOUT, fut).await;
    }
    if let Some(fut) = handle.wait_for_playout() {
        let _ = tokio::time::timeout(PLAYOUT_WAIT_TIMEOUT, fut).await;
    }

    // List shape first, then the producer shape.
    let items = match handle.chat_items() {
        Some(items) => Some(items),
        None => match handle.chat_items_fn() {
            Some(produce) => match produce() {
                Ok(items) => Some(items),
                Err(e) => {
                    debug!("accessing chat items failed: {}", e);
                    None
                }
            },
            None => None,
        },
    };

    if let Some(items) = items
        && !items.is_empty()
        && let Some(text) = extract_from_items(&items, persona)
        && !text.trim().is_empty()
    {
        return Some(tidy(&text));
    }

    // One more attempt through the producer, if the handle exposes one.
    if let Some(produce) = handle.chat_items_fn()
        && let Ok(items) = produce()
        && !items.is_empty()
        && let Some(text) = extract_from_items(&items, persona)
        && !text.trim().is_empty()
    {
        return Some(tidy(&text));
    }

    None
}

/// From a list of chat items, prefer the last assistant-like item, else the
/// last item, and extract its text.
pub fn extract_from_items(items: &[ChatItem], persona: &str) -> Option<String> {
    if items.is_empty() {
        return None;
    }

    let persona = persona.to_lowercase();
    let mut last_assistant = None;
    for item in items {
        if let Some(role) = item.role() {
            let role = role.to_lowercase();
            if ASSISTANT_ROLES.contains(&role.as_str()) || role == persona {
                last_assistant = Some(item);
            }
        }
    }

    let target = last_assistant.unwrap_or_else(|| items.last().expect("items is non-empty"));
    message_text(target)
}

/// Extract plain text from one chat item.
///
/// Ordered strategies, each a fallback for the previous:
/// 1. `content` as a list of non-empty strings, concatenated.
/// 2. A direct string-valued `text` or `content` field.
/// 3. A `parts` list mixing strings and `{text|content}` maps, joined with a
///    single space.
/// 4. The item's generic readable form, rejected when it is only a
///    structural dump.
pub fn message_text(item: &ChatItem) -> Option<String> {
    if let Some(text) = content_chunks(&item.0) {
        return Some(text);
    }
    if let Some(text) = direct_string_field(&item.0) {
        return Some(text);
    }
    if let Some(text) = parts_fragments(&item.0) {
        return Some(text);
    }
    readable_fallback(&item.0)
}

/// Strategy 1: `content` as a list of non-empty strings.
fn content_chunks(value: &Value) -> Option<String> {
    let list = value.get("content")?.as_array()?;
    let chunks: Vec<&str> = list
        .iter()
        .filter_map(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .collect();
    if chunks.is_empty() {
        return None;
    }
    Some(tidy(&chunks.concat()))
}

/// Strategy 2: a direct string-valued `text` or `content` field.
fn direct_string_field(value: &Value) -> Option<String> {
    for field in ["text", "content"] {
        if let Some(s) = value.get(field).and_then(Value::as_str)
            && !s.trim().is_empty()
        {
            return Some(s.trim().to_string());
        }
    }
    None
}

/// Strategy 3: a `parts` list of strings and `{text|content}` maps.
fn parts_fragments(value: &Value) -> Option<String> {
    let parts = value.get("parts")?.as_array()?;
    let mut fragments = Vec::new();
    for part in parts {
        match part {
            Value::String(s) if !s.trim().is_empty() => fragments.push(s.trim().to_string()),
            Value::Object(map) => {
                let text = map
                    .get("text")
                    .and_then(Value::as_str)
                    .or_else(|| map.get("content").and_then(Value::as_str));
                if let Some(t) = text
                    && !t.trim().is_empty()
                {
                    fragments.push(t.trim().to_string());
                }
            }
            _ => {}
        }
    }
    if fragments.is_empty() {
        return None;
    }
    Some(tidy(&fragments.join(" ")))
}

/// Strategy 4: the item's generic readable form. A string (or scalar) item is
/// its own readable form; objects, arrays, and null only have a structural
/// dump and are rejected.
fn readable_fallback(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Trim surrounding whitespace and trailing newlines.
fn tidy(s: &str) -> String {
    s.trim().trim_end_matches('\n').trim_end().to_string()
}
