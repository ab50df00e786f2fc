//! Gemini Live session implementation.
//!
//! One WebSocket connection per session: `start` performs the setup
//! handshake and spawns the read loop, `generate_reply` submits a single
//! user turn and hands back a speech handle over the accumulating turn
//! state, `stop` tears the connection down.
//!
//! # Thread Safety
//!
//! All mutable state sits behind `Arc` so the session can be shared between
//! the racing reply task and the cleanup path; the `connected` flag is an
//! `AtomicBool` for lock-free checks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use super::config::{GEMINI_LIVE_WS_URL, SETUP_TIMEOUT, qualified_model_name};
use super::messages::{
    ClientContent, ClientMessage, Content, GenerationConfig, ServerMessage, Setup,
};
use crate::core::extract::{CapabilityFuture, ChatItem, ChatItemsFn, ItemsError, SpeechHandle};
use crate::core::realtime::{
    RealtimeError, RealtimeResult, RealtimeSession, RealtimeSessionConfig, SessionFactory,
};

/// Channel capacity for outbound WebSocket messages.
const WS_CHANNEL_CAPACITY: usize = 64;

/// Accumulating state of the current model turn, shared with speech handles.
struct TurnState {
    /// Completed conversation items, in arrival order.
    items: std::sync::RwLock<Vec<ChatItem>>,
    /// Text of the model turn currently streaming in.
    pending: std::sync::Mutex<String>,
    /// Turn-complete flag; handles wait on the paired receiver.
    done_tx: watch::Sender<bool>,
    done_rx: watch::Receiver<bool>,
}

impl TurnState {
    fn new() -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        Self {
            items: std::sync::RwLock::new(Vec::new()),
            pending: std::sync::Mutex::new(String::new()),
            done_tx,
            done_rx,
        }
    }

    fn push_item(&self, item: ChatItem) {
        if let Ok(mut items) = self.items.write() {
            items.push(item);
        }
    }

    /// Append streamed model text to the pending turn.
    fn append_model_text(&self, text: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_str(text);
        }
    }

    /// Close out the pending model turn. `done` marks the turn as complete
    /// for waiting handles.
    fn finalize(&self, done: bool) {
        let text = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => String::new(),
        };
        if !text.is_empty() {
            // Normalized to the assistant role so role-based extraction
            // applies; the wire reports "model".
            self.push_item(ChatItem(json!({ "role": "assistant", "content": [text] })));
        }
        if done {
            let _ = self.done_tx.send(true);
        }
    }

    fn begin_turn(&self) {
        let _ = self.done_tx.send(false);
    }
}

/// Speech handle over a Gemini Live turn.
///
/// Exposes the completion-wait capability plus chat items in producer form;
/// the list form is deliberately absent on this build.
pub struct GeminiSpeechHandle {
    turn: Arc<TurnState>,
}

impl SpeechHandle for GeminiSpeechHandle {
    fn done(&self) -> Option<CapabilityFuture<'_>> {
        let mut rx = self.turn.done_rx.clone();
        Some(Box::pin(async move {
            // Resolves when the turn completes or the session goes away.
            let _ = rx.wait_for(|complete| *complete).await;
        }))
    }

    fn chat_items_fn(&self) -> Option<ChatItemsFn> {
        let turn = self.turn.clone();
        Some(Arc::new(move || {
            turn.items
                .read()
                .map(|items| items.clone())
                .map_err(|e| ItemsError(e.to_string()))
        }))
    }
}

/// Gemini Live realtime session.
pub struct GeminiLiveSession {
    config: RealtimeSessionConfig,
    ws_url: String,
    connected: Arc<AtomicBool>,
    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientMessage>>>>,
    read_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    turn: Arc<TurnState>,
}

impl GeminiLiveSession {
    /// Create an unstarted session against the production endpoint.
    pub fn new(config: RealtimeSessionConfig) -> Self {
        Self::with_ws_url(config, GEMINI_LIVE_WS_URL)
    }

    /// Create an unstarted session against a custom endpoint (tests).
    pub fn with_ws_url(config: RealtimeSessionConfig, ws_url: impl Into<String>) -> Self {
        Self {
            config,
            ws_url: ws_url.into(),
            connected: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            read_handle: Arc::new(Mutex::new(None)),
            turn: Arc::new(TurnState::new()),
        }
    }

    fn build_setup(&self) -> Setup {
        Setup {
            model: qualified_model_name(&self.config.model),
            generation_config: Some(GenerationConfig {
                temperature: self.config.temperature,
                // Text-only: transcripts populate reliably without audio.
                response_modalities: Some(vec!["TEXT".to_string()]),
            }),
            system_instruction: self
                .config
                .instructions
                .as_deref()
                .map(Content::bare_text),
        }
    }

    async fn send_message(&self, msg: ClientMessage) -> RealtimeResult<()> {
        let guard = self.ws_sender.lock().await;
        let sender = guard
            .as_ref()
            .ok_or_else(|| RealtimeError::SessionError("session not started".to_string()))?;
        sender
            .send(msg)
            .await
            .map_err(|e| RealtimeError::WebSocketError(e.to_string()))
    }

    /// Dispatch one parsed server message to the turn state.
    fn handle_server_message(msg: ServerMessage, turn: &TurnState) {
        if let Some(content) = msg.server_content {
            if let Some(model_turn) = content.model_turn {
                turn.append_model_text(&model_turn.joined_text());
            }
            if content.interrupted == Some(true) {
                tracing::debug!("model turn interrupted");
            }
            let turn_done = content.turn_complete == Some(true);
            if turn_done || content.generation_complete == Some(true) {
                turn.finalize(turn_done);
            }
        }
    }
}

#[async_trait]
impl RealtimeSession for GeminiLiveSession {
    async fn start(&self) -> RealtimeResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let url = format!("{}?key={}", self.ws_url, self.config.api_key);
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Connected to Gemini Live");

        let (mut ws_sink, mut ws_read) = ws_stream.split();
        let (tx, mut rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock().await = Some(tx);

        let (setup_tx, setup_rx) = oneshot::channel::<()>();
        let mut setup_tx = Some(setup_tx);

        let turn = self.turn.clone();
        let connected = self.connected.clone();
        let ws_sender = self.ws_sender.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    outbound = rx.recv() => {
                        let Some(event) = outbound else {
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client message: {}", e);
                                continue;
                            }
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            break;
                        }
                    }

                    inbound = ws_read.next() => {
                        match inbound {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ServerMessage>(&text) {
                                    Ok(msg) => {
                                        if msg.setup_complete.is_some()
                                            && let Some(ack) = setup_tx.take()
                                        {
                                            let _ = ack.send(());
                                        }
                                        Self::handle_server_message(msg, &turn);
                                    }
                                    Err(e) => {
                                        tracing::warn!("Failed to parse server message: {}", e);
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("Gemini Live socket closed");
                                break;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            *ws_sender.lock().await = None;
            // Wake any handle still waiting on completion.
            turn.finalize(true);
        });
        *self.read_handle.lock().await = Some(handle);

        self.send_message(ClientMessage::Setup(self.build_setup()))
            .await?;

        // Session is unusable until the server acknowledges setup.
        match tokio::time::timeout(SETUP_TIMEOUT, setup_rx).await {
            Ok(Ok(())) => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(())
            }
            Ok(Err(_)) => Err(RealtimeError::ConnectionFailed(
                "connection closed before setup completed".to_string(),
            )),
            Err(_) => Err(RealtimeError::Timeout(
                "timed out waiting for setup acknowledgement".to_string(),
            )),
        }
    }

    async fn generate_reply(&self, instructions: &str) -> RealtimeResult<Box<dyn SpeechHandle>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(RealtimeError::SessionError(
                "session not started".to_string(),
            ));
        }

        self.turn.begin_turn();
        self.turn
            .push_item(ChatItem(json!({ "role": "user", "content": [instructions] })));

        self.send_message(ClientMessage::ClientContent(ClientContent {
            turns: vec![Content::user_text(instructions)],
            turn_complete: true,
        }))
        .await?;

        Ok(Box::new(GeminiSpeechHandle {
            turn: self.turn.clone(),
        }))
    }

    async fn stop(&self) -> RealtimeResult<()> {
        self.connected.store(false, Ordering::SeqCst);

        // Dropping the sender makes the read loop close the socket.
        *self.ws_sender.lock().await = None;

        if let Some(handle) = self.read_handle.lock().await.take() {
            handle.abort();
        }

        tracing::info!("Gemini Live session stopped");
        Ok(())
    }
}

/// Factory producing Gemini Live sessions.
pub struct GeminiSessionFactory;

impl SessionFactory for GeminiSessionFactory {
    fn create(&self, config: RealtimeSessionConfig) -> RealtimeResult<Box<dyn RealtimeSession>> {
        if config.api_key.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            return Err(RealtimeError::InvalidConfiguration(
                "model is required".to_string(),
            ));
        }
        Ok(Box::new(GeminiLiveSession::new(config)))
    }
}
