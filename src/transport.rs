//! Abstract delivery surface (spec GLOSSARY: Transport).
//!
//! The Dispatcher knows nothing about sockets. It asks a `Transport` to
//! publish a destination (a STOMP-style topic such as
//! `/topic/market/AAPL`) or to deliver directly to one session's private
//! queue. `InMemoryTransport` is the only implementation: an in-process
//! registry from destination to the set of subscribed sessions, and from
//! session to its outbound channel.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::trace;

use crate::models::Envelope;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Delivers `envelope` to every session currently subscribed to
    /// `destination`. A destination with no subscribers is a silent no-op.
    async fn publish(&self, destination: &str, envelope: &Envelope);

    /// Delivers `envelope` to exactly one session's private queue,
    /// regardless of topic subscriptions. A no-op if the session is gone.
    async fn send_to_session(&self, session_id: &str, envelope: &Envelope);
}

/// One registered connection's outbound half.
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<Envelope>,
}

pub struct InMemoryTransport {
    sessions: DashMap<String, SessionHandle>,
    topics: DashMap<String, HashSet<String>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            topics: DashMap::new(),
        }
    }

    /// Registers a session and returns the receiving half of its outbound
    /// queue, to be drained by the connection's write loop.
    pub fn register_session(&self, session_id: &str) -> mpsc::UnboundedReceiver<Envelope> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions
            .insert(session_id.to_string(), SessionHandle { sender: tx });
        rx
    }

    /// Drops the session's outbound queue and scrubs it out of every topic.
    pub fn remove_session(&self, session_id: &str) {
        self.sessions.remove(session_id);
        for mut entry in self.topics.iter_mut() {
            entry.value_mut().remove(session_id);
        }
    }

    /// Transport-level `SUBSCRIBE /topic/...` — independent of the
    /// business-level Subscription Index.
    pub fn subscribe_topic(&self, session_id: &str, destination: &str) {
        self.topics
            .entry(destination.to_string())
            .or_default()
            .insert(session_id.to_string());
    }

    pub fn unsubscribe_topic(&self, session_id: &str, destination: &str) {
        if let Some(mut set) = self.topics.get_mut(destination) {
            set.remove(session_id);
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn publish(&self, destination: &str, envelope: &Envelope) {
        let Some(subscribers) = self.topics.get(destination) else {
            trace!(destination, "no transport subscribers, skipping publish");
            return;
        };
        for session_id in subscribers.iter() {
            if let Some(handle) = self.sessions.get(session_id) {
                let _ = handle.sender.send(envelope.clone());
            }
        }
    }

    async fn send_to_session(&self, session_id: &str, envelope: &Envelope) {
        if let Some(handle) = self.sessions.get(session_id) {
            let _ = handle.sender.send(envelope.clone());
        }
    }
}

pub type SharedTransport = Arc<dyn Transport>;
