//! Shared wire types for the market-data fan-out service.
//!
//! `Quote` is the internal representation owned by the Catalog; the other
//! types here are the envelopes and records that actually go over the wire,
//! kept distinct so that catalog mutation and wire formatting never share a
//! type by accident.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Formats a timestamp the way the rest of this service expects on the
/// wire: local date-time, millisecond precision, no timezone suffix.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

/// The unit of market state owned by the Catalog. Mutated only by the tick
/// engine; every other component only ever sees a cloned copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub last_price: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub volume: u64,
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// `ask - bid`, or zero if either side is absent.
    pub fn spread(&self) -> Decimal {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => ask - bid,
            _ => Decimal::ZERO,
        }
    }

    /// `(bid + ask) / 2`, falling back to `last_price`, then zero.
    pub fn mid_price(&self) -> Decimal {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => (bid + ask) / Decimal::TWO,
            _ => self.last_price,
        }
    }

    pub fn to_json(&self) -> QuoteJson {
        QuoteJson {
            id: self.id,
            symbol: self.symbol.clone(),
            name: self.name.clone(),
            last_price: self.last_price,
            bid: self.bid,
            ask: self.ask,
            volume: self.volume,
            timestamp: format_timestamp(self.timestamp),
        }
    }
}

/// The REST/WS wire shape of a quote: `id, symbol, name, lastPrice, bid,
/// ask, volume, timestamp` per the external interface table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteJson {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub last_price: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub volume: u64,
    pub timestamp: String,
}

/// Per-symbol record published on `/topic/market/<SYMBOL>` and embedded in
/// the bulk update. Carries the derived fields and a literal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataRecord {
    pub symbol: String,
    pub name: String,
    pub last_price: Decimal,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
    pub spread: Decimal,
    pub mid_price: Decimal,
    pub volume: u64,
    pub timestamp: String,
    pub status: String,
}

impl MarketDataRecord {
    pub fn from_quote(quote: &Quote, tick_timestamp: &str) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            last_price: quote.last_price,
            bid: quote.bid,
            ask: quote.ask,
            spread: quote.spread(),
            mid_price: quote.mid_price(),
            volume: quote.volume,
            timestamp: tick_timestamp.to_string(),
            status: "live".to_string(),
        }
    }
}

/// Minimal record backing `/internal/stock/*` lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLookupRecord {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub current_price: Decimal,
}

impl From<&Quote> for StockLookupRecord {
    fn from(quote: &Quote) -> Self {
        Self {
            id: quote.id,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            current_price: quote.last_price,
        }
    }
}

/// Response shape for `GET /api/v1/market/symbols`.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolsResponse {
    pub symbols: Vec<String>,
    pub count: usize,
}

/// Real-time envelope. `type` discriminates the four kinds this service
/// ever emits; `data` is deliberately untyped JSON since market_data and
/// bulk_market_data carry different shapes.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub timestamp: String,
}

impl Envelope {
    pub fn market_data(record: &MarketDataRecord, tick_timestamp: &str) -> Self {
        Self {
            kind: "market_data".to_string(),
            message: None,
            data: serde_json::to_value(record).ok(),
            timestamp: tick_timestamp.to_string(),
        }
    }

    pub fn bulk_market_data(
        records: &std::collections::HashMap<String, MarketDataRecord>,
        tick_timestamp: &str,
    ) -> Self {
        Self {
            kind: "bulk_market_data".to_string(),
            message: Some(format!(
                "Bulk market data update - {} symbols",
                records.len()
            )),
            data: serde_json::to_value(records).ok(),
            timestamp: tick_timestamp.to_string(),
        }
    }

    pub fn subscription_success(message: String) -> Self {
        Self {
            kind: "subscription_success".to_string(),
            message: Some(message),
            data: None,
            timestamp: format_timestamp(Utc::now()),
        }
    }

    pub fn subscription_error(reason: impl Into<String>) -> Self {
        Self {
            kind: "subscription_error".to_string(),
            message: Some(reason.into()),
            data: None,
            timestamp: format_timestamp(Utc::now()),
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Application-level send payload at `/app/market/subscribe`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeActionRequest {
    pub action: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// One immutable map of all symbols to their current quote at one tick,
/// plus the tick's shared timestamp. Constructed by the tick engine,
/// consumed by the fan-out dispatcher, then discarded.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub quotes: std::collections::HashMap<String, Quote>,
    pub timestamp: String,
}
