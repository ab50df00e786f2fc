//! Channel chat relay.
//!
//! Terminates per-channel WebSocket connections and fans text out to channel
//! members. Inbound user text is echoed to the other members, handed to the
//! resolver, and the resolved reply is broadcast to everyone in the channel
//! (including the sender).
//!
//! Each member owns an unbounded outbound queue drained by a dedicated writer
//! task, so a slow socket never blocks a broadcast. Membership lives in a
//! [`ChannelRegistry`] shared through [`AppState`]; the channel entry is
//! dropped when its last member leaves.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::AppState;

/// One connected channel member.
struct Member {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// Per-channel connection membership, keyed by channel id.
///
/// Each map entry is locked for the duration of an add, remove, or broadcast,
/// which serializes those operations per channel.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: DashMap<String, Vec<Member>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn join(&self, channel: &str, member: Member) {
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(member);
    }

    /// Remove one member; drop the channel entry when it empties.
    fn leave(&self, channel: &str, id: Uuid) {
        if let Some(mut members) = self.channels.get_mut(channel) {
            members.retain(|m| m.id != id);
            let empty = members.is_empty();
            drop(members);
            if empty {
                self.channels.remove_if(channel, |_, members| members.is_empty());
            }
        }
    }

    /// Queue `text` to every member of the channel.
    fn broadcast(&self, channel: &str, text: &str) {
        self.send_where(channel, text, |_| true);
    }

    /// Queue `text` to every member except `sender`.
    fn broadcast_except(&self, channel: &str, sender: Uuid, text: &str) {
        self.send_where(channel, text, |m| m.id != sender);
    }

    fn send_where(&self, channel: &str, text: &str, include: impl Fn(&Member) -> bool) {
        if let Some(members) = self.channels.get(channel) {
            for member in members.iter().filter(|m| include(m)) {
                // A closed queue means the member is mid-disconnect.
                if member.tx.send(text.to_string()).is_err() {
                    debug!(member = %member.id, "Dropping message for disconnecting member");
                }
            }
        }
    }

    pub fn member_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, |m| m.len())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

/// Chat WebSocket handler.
///
/// Upgrades the HTTP connection and joins the member to `channel_id`.
pub async fn chat_handler(
    ws: WebSocketUpgrade,
    Path(channel_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!(channel = %channel_id, "Chat WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state, channel_id))
}

async fn handle_chat_socket(socket: WebSocket, state: Arc<AppState>, channel_id: String) {
    let member_id = Uuid::new_v4();
    info!(channel = %channel_id, member = %member_id, "Chat connection established");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    state.channels.join(&channel_id, Member { id: member_id, tx });

    // Writer task drains the member's outbound queue.
    let writer_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                state
                    .channels
                    .broadcast_except(&channel_id, member_id, &format!("User: {text}"));

                let reply = state.resolver.resolve(&text).await;
                state.channels.broadcast(&channel_id, &reply);
            }
            Ok(Message::Close(_)) => break,
            // Pings are answered by axum; other frame kinds carry no text.
            Ok(_) => {}
            Err(e) => {
                debug!(channel = %channel_id, member = %member_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    state.channels.leave(&channel_id, member_id);
    writer_task.abort();
    info!(channel = %channel_id, member = %member_id, "Chat connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member() -> (Member, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Member { id: Uuid::new_v4(), tx }, rx)
    }

    #[test]
    fn test_broadcast_reaches_all_members() {
        let registry = ChannelRegistry::new();
        let (a, mut a_rx) = member();
        let (b, mut b_rx) = member();
        registry.join("general", a);
        registry.join("general", b);

        registry.broadcast("general", "hello");

        assert_eq!(a_rx.try_recv().unwrap(), "hello");
        assert_eq!(b_rx.try_recv().unwrap(), "hello");
    }

    #[test]
    fn test_broadcast_except_skips_sender() {
        let registry = ChannelRegistry::new();
        let (a, mut a_rx) = member();
        let (b, mut b_rx) = member();
        let sender_id = a.id;
        registry.join("general", a);
        registry.join("general", b);

        registry.broadcast_except("general", sender_id, "User: hi");

        assert!(a_rx.try_recv().is_err());
        assert_eq!(b_rx.try_recv().unwrap(), "User: hi");
    }

    #[test]
    fn test_broadcast_is_scoped_to_channel() {
        let registry = ChannelRegistry::new();
        let (a, mut a_rx) = member();
        let (b, mut b_rx) = member();
        registry.join("alpha", a);
        registry.join("beta", b);

        registry.broadcast("alpha", "only alpha");

        assert_eq!(a_rx.try_recv().unwrap(), "only alpha");
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn test_leave_drops_empty_channel() {
        let registry = ChannelRegistry::new();
        let (a, _a_rx) = member();
        let (b, _b_rx) = member();
        let a_id = a.id;
        let b_id = b.id;
        registry.join("general", a);
        registry.join("general", b);
        assert_eq!(registry.member_count("general"), 2);

        registry.leave("general", a_id);
        assert_eq!(registry.member_count("general"), 1);
        assert_eq!(registry.channel_count(), 1);

        registry.leave("general", b_id);
        assert_eq!(registry.member_count("general"), 0);
        assert_eq!(registry.channel_count(), 0);
    }

    #[test]
    fn test_broadcast_survives_closed_member_queue() {
        let registry = ChannelRegistry::new();
        let (a, a_rx) = member();
        let (b, mut b_rx) = member();
        registry.join("general", a);
        registry.join("general", b);

        drop(a_rx);
        registry.broadcast("general", "still delivered");

        assert_eq!(b_rx.try_recv().unwrap(), "still delivered");
    }
}
