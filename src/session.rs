//! Session Lifecycle (C6).
//!
//! Translates connect/disconnect/subscribe/unsubscribe events from the
//! Transport into Subscription Index mutations, per the subscribe-action
//! protocol on `/app/market/subscribe`.

use std::sync::Arc;

use tracing::warn;

use crate::catalog::{canonicalize, Catalog};
use crate::dispatcher::Dispatcher;
use crate::models::SubscribeActionRequest;
use crate::subscription::SubscriptionIndex;

pub struct SessionLifecycle {
    catalog: Arc<Catalog>,
    index: Arc<SubscriptionIndex>,
    dispatcher: Arc<Dispatcher>,
}

impl SessionLifecycle {
    pub fn new(catalog: Arc<Catalog>, index: Arc<SubscriptionIndex>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            catalog,
            index,
            dispatcher,
        }
    }

    /// No Index state is created until the first subscribe action.
    pub fn on_connect(&self, _session_id: &str) {}

    /// Transport-level `SUBSCRIBE /topic/...`: purely a liveness touch, not
    /// a business subscription. Topic membership itself is the Transport's
    /// own concern.
    pub fn on_topic_subscribe(&self, session_id: &str) {
        self.index.touch(session_id);
    }

    pub async fn on_disconnect(&self, session_id: &str) {
        self.index.remove(session_id);
    }

    /// Handles one `/app/market/subscribe` payload end to end, including
    /// every reply the protocol requires.
    pub async fn handle_subscribe_action(&self, session_id: &str, request: SubscribeActionRequest) {
        if request.symbols.is_empty() {
            self.dispatcher
                .send_error(session_id, "No symbols provided for subscription")
                .await;
            return;
        }

        let user_id = request.user_id.unwrap_or_else(|| "anonymous".to_string());
        let requested: Vec<String> = request.symbols.iter().map(|s| canonicalize(s)).collect();

        let filtered: Vec<String> = requested
            .into_iter()
            .filter(|symbol| {
                let known = self.catalog.has(symbol);
                if !known {
                    warn!(session_id, symbol, "dropping unknown symbol from subscribe request");
                }
                known
            })
            .collect();

        let action = request
            .action
            .unwrap_or_else(|| "subscribe".to_string())
            .to_ascii_lowercase();

        // "unsubscribe" is special-cased against an all-unknown filtered set:
        // per the documented source behavior, that reads as "unsubscribe from
        // everything" rather than the generic "no symbols available" error
        // every other action gets.
        if action == "unsubscribe" && filtered.is_empty() {
            self.index.remove(session_id);
            self.dispatcher
                .send_success(session_id, &["all".to_string()])
                .await;
            return;
        }

        if filtered.is_empty() {
            self.dispatcher
                .send_error(session_id, "None of the requested symbols are available")
                .await;
            return;
        }

        match action.as_str() {
            "subscribe" => {
                self.index.subscribe(session_id, &user_id, &filtered);
                self.dispatcher.send_success(session_id, &filtered).await;
            }
            "add" => {
                self.index.add_symbols(session_id, &filtered);
                self.dispatcher.send_success(session_id, &filtered).await;
            }
            "remove" => {
                self.index.remove_symbols(session_id, &filtered);
                self.dispatcher.send_success(session_id, &filtered).await;
            }
            "unsubscribe" => {
                self.index.remove_symbols(session_id, &filtered);
                self.dispatcher.send_success(session_id, &filtered).await;
            }
            other => {
                self.dispatcher
                    .send_error(session_id, format!("Unknown action: {other}"))
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::InMemoryTransport;

    fn seeded_catalog() -> Arc<Catalog> {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            r#"[{"id":1,"symbol":"AAPL","name":"Apple","lastPrice":"150.00","bid":"149.95","ask":"150.05","volume":1000}]"#,
        )
        .unwrap();
        Arc::new(Catalog::load_seed(tmp.path()).unwrap())
    }

    fn lifecycle() -> (SessionLifecycle, Arc<SubscriptionIndex>, Arc<InMemoryTransport>) {
        let catalog = seeded_catalog();
        let index = Arc::new(SubscriptionIndex::new());
        let transport = Arc::new(InMemoryTransport::new());
        let dispatcher = Arc::new(Dispatcher::new(transport.clone(), index.clone()));
        (SessionLifecycle::new(catalog, index.clone(), dispatcher), index, transport)
    }

    fn request(action: &str, symbols: &[&str]) -> SubscribeActionRequest {
        SubscribeActionRequest {
            action: Some(action.to_string()),
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn subscribe_to_known_symbol_succeeds() {
        let (lifecycle, index, transport) = lifecycle();
        let mut rx = transport.register_session("s1");
        lifecycle
            .handle_subscribe_action("s1", request("subscribe", &["aapl"]))
            .await;
        assert!(index.get("s1").unwrap().subscribed_symbols.contains("AAPL"));
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.kind, "subscription_success");
    }

    #[tokio::test]
    async fn subscribe_to_unknown_symbol_errors_and_creates_no_subscription() {
        let (lifecycle, index, transport) = lifecycle();
        let mut rx = transport.register_session("s1");
        lifecycle
            .handle_subscribe_action("s1", request("subscribe", &["ZZZZ"]))
            .await;
        assert!(index.get("s1").is_none());
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.kind, "subscription_error");
        assert_eq!(
            envelope.message.as_deref(),
            Some("None of the requested symbols are available")
        );
    }

    #[tokio::test]
    async fn empty_symbols_errors_immediately() {
        let (lifecycle, _index, transport) = lifecycle();
        let mut rx = transport.register_session("s1");
        lifecycle
            .handle_subscribe_action("s1", request("subscribe", &[]))
            .await;
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.message.as_deref(), Some("No symbols provided for subscription"));
    }

    #[tokio::test]
    async fn unknown_action_errors_without_mutating_index() {
        let (lifecycle, index, transport) = lifecycle();
        let mut rx = transport.register_session("s1");
        lifecycle
            .handle_subscribe_action("s1", request("frobnicate", &["aapl"]))
            .await;
        assert!(index.get("s1").is_none());
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.kind, "subscription_error");
        assert_eq!(envelope.message.as_deref(), Some("Unknown action: frobnicate"));
    }

    #[tokio::test]
    async fn unsubscribe_with_only_unknown_symbols_drops_whole_subscription() {
        let (lifecycle, index, transport) = lifecycle();
        index.subscribe("s1", "anonymous", &["AAPL".to_string()]);
        let mut rx = transport.register_session("s1");
        lifecycle
            .handle_subscribe_action("s1", request("unsubscribe", &["ZZZZ"]))
            .await;
        assert!(index.get("s1").is_none());
        let envelope = rx.try_recv().unwrap();
        assert_eq!(envelope.kind, "subscription_success");
    }

    #[tokio::test]
    async fn disconnect_removes_subscription() {
        let (lifecycle, index, _transport) = lifecycle();
        index.subscribe("s1", "anonymous", &["AAPL".to_string()]);
        lifecycle.on_disconnect("s1").await;
        assert!(index.get("s1").is_none());
    }
}
