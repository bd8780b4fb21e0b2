//! Fan-out Dispatcher (C5).
//!
//! Given one tick's Snapshot, builds per-symbol and bulk message envelopes
//! and hands them to the Transport. Never enumerates sessions itself — the
//! Subscription Index only gates whether a per-symbol publish is worth
//! making at all; the Transport owns the actual destination -> session
//! routing.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::models::{Envelope, MarketDataRecord, Snapshot};
use crate::subscription::SubscriptionIndex;
use crate::transport::SharedTransport;

const TOPIC_ALL: &str = "/topic/market/all";
const QUEUE_SUBSCRIPTION: &str = "/queue/subscription";

fn topic_for(symbol: &str) -> String {
    format!("/topic/market/{symbol}")
}

pub struct Dispatcher {
    transport: SharedTransport,
    index: Arc<SubscriptionIndex>,
}

impl Dispatcher {
    pub fn new(transport: SharedTransport, index: Arc<SubscriptionIndex>) -> Self {
        Self { transport, index }
    }

    /// Publishes one `market_data` envelope per symbol that has at least
    /// one subscriber, then always publishes one `bulk_market_data`
    /// envelope to `/topic/market/all`. Every envelope in this call shares
    /// `snapshot.timestamp`.
    pub async fn dispatch_tick(&self, snapshot: &Snapshot) {
        let mut records: HashMap<String, MarketDataRecord> =
            HashMap::with_capacity(snapshot.quotes.len());

        for (symbol, quote) in &snapshot.quotes {
            let record = MarketDataRecord::from_quote(quote, &snapshot.timestamp);
            records.insert(symbol.clone(), record);
        }

        for (symbol, record) in &records {
            if self.index.subscribers_of(symbol).is_empty() {
                continue;
            }
            let envelope = Envelope::market_data(record, &snapshot.timestamp);
            self.transport.publish(&topic_for(symbol), &envelope).await;
        }

        let bulk = Envelope::bulk_market_data(&records, &snapshot.timestamp);
        self.transport.publish(TOPIC_ALL, &bulk).await;
    }

    pub async fn send_success(&self, session_id: &str, symbols: &[String]) {
        let message = format!("Subscribed to {} symbol(s)", symbols.len());
        let envelope = Envelope::subscription_success(message);
        self.transport
            .send_to_session(session_id, &envelope)
            .await;
    }

    pub async fn send_error(&self, session_id: &str, reason: impl Into<String> + std::fmt::Debug) {
        warn!(session_id, reason = ?reason, "subscription action failed");
        let envelope = Envelope::subscription_error(reason);
        self.transport
            .send_to_session(session_id, &envelope)
            .await;
    }
}
