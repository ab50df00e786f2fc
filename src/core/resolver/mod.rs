//! Dual-path response resolution.
//!
//! [`ResponseResolver::resolve`] races the realtime path (low latency, less
//! reliable) against the stable text path, applies tiered timeouts and grace
//! periods, and decides the single reply string. It is the only operation the
//! relay consumes, and it upholds two invariants:
//!
//! - The returned string is never empty: every failure path terminates in a
//!   fixed placeholder or a formatted error string.
//! - No error ever propagates to the caller: a generation-backend hiccup must
//!   not be able to crash a channel connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error};

use crate::core::extract::finalize_and_extract;
use crate::core::realtime::{RealtimeSession, RealtimeSessionConfig, SessionFactory};
use crate::core::text::TextGenerator;

/// Ceiling on the realtime reply task.
pub const REALTIME_REPLY_TIMEOUT: Duration = Duration::from_secs(30);
/// Ceiling on the text reply task (and the last-resort fallback call).
pub const TEXT_REPLY_TIMEOUT: Duration = Duration::from_secs(20);
/// Extra wait granted to the not-yet-finished task after its sibling wins.
pub const GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Sampling temperature for the realtime session.
const REALTIME_TEMPERATURE: f32 = 0.8;

/// Reply when neither path produced text and nothing failed outright.
pub const NO_TEXT_REPLY: &str = "(No assistant text found)";
/// Reply when the realtime backend rejected us over quota/billing.
pub const QUOTA_REPLY: &str =
    "(Temporarily unavailable: model quota exceeded. Check plan/billing.)";
/// Reply when the realtime backend could not be reached.
pub const CONNECTIVITY_REPLY: &str =
    "(Service connection issue to Gemini Live. Please retry shortly.)";

/// Persona wiring for one resolver: instruction content plus the persona
/// name the extractor recognizes as an assistant role.
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub name: String,
    pub instructions: String,
}

/// Orchestrates one realtime session and one text request per message and
/// decides the reply.
pub struct ResponseResolver {
    sessions: Arc<dyn SessionFactory>,
    text: Arc<dyn TextGenerator>,
    persona: PersonaConfig,
    api_key: String,
    realtime_model: String,
}

impl ResponseResolver {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        text: Arc<dyn TextGenerator>,
        persona: PersonaConfig,
        api_key: impl Into<String>,
        realtime_model: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            text,
            persona,
            api_key: api_key.into(),
            realtime_model: realtime_model.into(),
        }
    }

    /// Resolve one message to a reply.
    ///
    /// Tries realtime first for latency but always provides a reliable text
    /// answer: the text path runs concurrently and wins ties, and a direct
    /// text call is the last resort when the session itself fails.
    pub async fn resolve(&self, message: &str) -> String {
        let instructions = self.persona.instructions.clone();

        let session = match self.sessions.create(RealtimeSessionConfig {
            api_key: self.api_key.clone(),
            model: self.realtime_model.clone(),
            temperature: Some(REALTIME_TEMPERATURE),
            instructions: Some(instructions.clone()),
        }) {
            Ok(session) => Arc::from(session),
            Err(e) => return self.recover(&e.to_string(), message, &instructions).await,
        };

        let reply = match self.race(&session, message, &instructions).await {
            Ok(reply) => reply,
            Err(e) => self.recover(&e, message, &instructions).await,
        };

        // Cleanup runs on every return path; stop failures never surface.
        if let Err(e) = session.stop().await {
            debug!("session stop failed: {}", e);
        }

        reply
    }

    /// Start the session and race both paths. `Err` carries the message of a
    /// session start failure; in-flight task failures degrade to empty
    /// branches instead.
    async fn race(
        &self,
        session: &Arc<dyn RealtimeSession>,
        message: &str,
        instructions: &str,
    ) -> Result<String, String> {
        session.start().await.map_err(|e| e.to_string())?;

        let mut rt_task = {
            let session = session.clone();
            let message = message.to_string();
            tokio::spawn(async move {
                timeout(REALTIME_REPLY_TIMEOUT, session.generate_reply(&message)).await
            })
        };
        let mut text_task = {
            let text = self.text.clone();
            let message = message.to_string();
            let instructions = instructions.to_string();
            tokio::spawn(async move {
                timeout(TEXT_REPLY_TIMEOUT, text.generate(&message, &instructions)).await
            })
        };

        // First across the line decides who gets a grace period.
        let (rt_first, text_first) = tokio::select! {
            first = &mut rt_task => (Some(first), None),
            first = &mut text_task => (None, Some(first)),
        };

        // Prefer direct text if it is ready; otherwise grant it the grace
        // period before giving up on that branch.
        let text_reply = match text_first {
            Some(outcome) => flatten_text(outcome),
            None => with_grace(&mut text_task, GRACE_PERIOD)
                .await
                .map(flatten_text)
                .unwrap_or_default(),
        };

        let realtime_text = match rt_first {
            Some(outcome) => self.extract_realtime(outcome).await,
            None => match with_grace(&mut rt_task, GRACE_PERIOD).await {
                Some(outcome) => self.extract_realtime(outcome).await,
                None => String::new(),
            },
        };

        // Decision rule: text path wins a tie, realtime covers the rest,
        // and the placeholder guarantees a non-empty reply.
        if !text_reply.is_empty() {
            return Ok(text_reply);
        }
        if !realtime_text.is_empty() {
            return Ok(realtime_text);
        }
        Ok(NO_TEXT_REPLY.to_string())
    }

    /// Resolve the realtime task outcome to extracted text, degrading every
    /// failure to empty.
    async fn extract_realtime(
        &self,
        outcome: Result<
            Result<crate::core::realtime::RealtimeResult<Box<dyn crate::core::extract::SpeechHandle>>, tokio::time::error::Elapsed>,
            tokio::task::JoinError,
        >,
    ) -> String {
        match outcome {
            Ok(Ok(Ok(handle))) => finalize_and_extract(handle.as_ref(), &self.persona.name)
                .await
                .unwrap_or_default(),
            Ok(Ok(Err(e))) => {
                debug!("realtime reply failed: {}", e);
                String::new()
            }
            Ok(Err(_)) => {
                debug!("realtime reply timed out");
                String::new()
            }
            Err(e) => {
                debug!("realtime task failed: {}", e);
                String::new()
            }
        }
    }

    /// Session construction/start failed: classify and fall back.
    async fn recover(&self, msg: &str, message: &str, instructions: &str) -> String {
        error!("Realtime error: {}", msg);

        if is_quota_or_connection_error(msg) {
            // Transient backend problem: one direct text call as a last resort.
            match timeout(TEXT_REPLY_TIMEOUT, self.text.generate(message, instructions)).await {
                Ok(Ok(fallback)) if !fallback.is_empty() => return fallback,
                Ok(Ok(_)) => {}
                Ok(Err(e)) => error!("Text fallback also failed: {}", e),
                Err(_) => error!("Text fallback timed out"),
            }

            let lowered = msg.to_lowercase();
            if lowered.contains("quota") || lowered.contains("billing") {
                return QUOTA_REPLY.to_string();
            }
            return CONNECTIVITY_REPLY.to_string();
        }

        format!("(Error: {msg})")
    }
}

/// Wait a little longer for a task that lost the race, then give up on it.
///
/// Returns `None` when the task does not finish within `extra` (the task is
/// aborted) or when it panicked.
async fn with_grace<T>(task: &mut JoinHandle<T>, extra: Duration) -> Option<JoinOutcome<T>> {
    match timeout(extra, &mut *task).await {
        Ok(joined) => Some(joined),
        Err(_) => {
            task.abort();
            None
        }
    }
}

type JoinOutcome<T> = Result<T, tokio::task::JoinError>;

/// Text task outcome to a reply string; every failure degrades to empty.
fn flatten_text(
    outcome: Result<
        Result<crate::core::text::TextResult<String>, tokio::time::error::Elapsed>,
        tokio::task::JoinError,
    >,
) -> String {
    match outcome {
        Ok(inner) => flatten_join(inner),
        Err(e) => {
            debug!("text task failed: {}", e);
            String::new()
        }
    }
}

fn flatten_join(
    outcome: Result<crate::core::text::TextResult<String>, tokio::time::error::Elapsed>,
) -> String {
    match outcome {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            debug!("text generation failed: {}", e);
            String::new()
        }
        Err(_) => {
            debug!("text generation timed out");
            String::new()
        }
    }
}

/// Classify a realtime failure message as quota/billing/connectivity.
///
/// `realtime` and `error` are checked jointly while the other markers match
/// individually; the joint check avoids misclassifying unrelated messages
/// that merely contain "error".
fn is_quota_or_connection_error(msg: &str) -> bool {
    let m = msg.to_lowercase();
    m.contains("quota")
        || m.contains("billing")
        || m.contains("failed to connect")
        || m.contains("connection")
        || (m.contains("realtime") && m.contains("error"))
}
