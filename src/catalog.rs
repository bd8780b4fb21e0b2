//! Instrument Catalog (C1).
//!
//! Owns the mutable quote table keyed by canonical symbol. Loaded once at
//! startup from a seed file; mutated afterwards only by the tick engine.

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::Quote;

/// On-disk seed shape, kept distinct from `Quote` so a malformed seed entry
/// can be logged and skipped without touching the runtime type.
#[derive(Debug, Deserialize)]
struct SeedInstrument {
    id: i64,
    symbol: String,
    name: String,
    #[serde(rename = "lastPrice")]
    last_price: Decimal,
    bid: Option<Decimal>,
    ask: Option<Decimal>,
    #[serde(default)]
    volume: u64,
}

pub fn canonicalize(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// Concurrent quote table. Readers always see a fully-formed `Quote` for
/// a given symbol, never a torn record, because every write replaces the
/// whole entry while holding the table's write lock.
pub struct Catalog {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self {
            quotes: RwLock::new(HashMap::new()),
        }
    }

    /// Loads the seed catalog from a JSON array file. A missing or
    /// unreadable file is fatal at startup; individual malformed entries
    /// are logged and skipped.
    pub fn load_seed(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read seed catalog {}: {e}", path.display()))?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("seed catalog {} is not a JSON array: {e}", path.display()))?;

        let catalog = Self::empty();
        {
            let mut quotes = catalog.quotes.write();
            for (index, entry) in entries.into_iter().enumerate() {
                match serde_json::from_value::<SeedInstrument>(entry) {
                    Ok(seed) => {
                        let symbol = canonicalize(&seed.symbol);
                        let quote = Quote {
                            id: seed.id,
                            symbol: symbol.clone(),
                            name: seed.name,
                            last_price: seed.last_price,
                            bid: seed.bid,
                            ask: seed.ask,
                            volume: seed.volume,
                            timestamp: Utc::now(),
                        };
                        quotes.insert(symbol, quote);
                    }
                    Err(e) => {
                        warn!(index, error = %e, "skipping malformed seed entry");
                    }
                }
            }
            debug!(count = quotes.len(), "catalog seeded");
        }
        Ok(catalog)
    }

    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.quotes.read().get(&canonicalize(symbol)).cloned()
    }

    /// Linear scan — acceptable, the catalog is at most a few hundred
    /// entries.
    pub fn get_by_id(&self, id: i64) -> Option<Quote> {
        self.quotes.read().values().find(|q| q.id == id).cloned()
    }

    pub fn has(&self, symbol: &str) -> bool {
        self.quotes.read().contains_key(&canonicalize(symbol))
    }

    /// A copy of the full symbol -> quote map; callers never observe a
    /// mutation in progress.
    pub fn snapshot(&self) -> HashMap<String, Quote> {
        self.quotes.read().clone()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.quotes.read().keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.read().is_empty()
    }

    /// Invoked only by the tick engine: applies `f` to the current quote
    /// for `symbol` and stores the result. No-op if the symbol is unknown.
    pub fn mutate(&self, symbol: &str, f: impl FnOnce(&Quote) -> Quote) {
        let mut quotes = self.quotes.write();
        if let Some(entry) = quotes.get_mut(symbol) {
            let next = f(entry);
            *entry = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_seed(json: &str) -> tempfile::NamedTempFile {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn load_seed_canonicalizes_symbols() {
        let file = write_seed(
            r#"[{"id":1,"symbol":"aapl","name":"Apple","lastPrice":"150.00","bid":"149.95","ask":"150.05","volume":1000}]"#,
        );
        let catalog = Catalog::load_seed(file.path()).unwrap();
        assert!(catalog.has("aapl"));
        assert!(catalog.has("AAPL"));
        assert_eq!(catalog.get("aapl").unwrap().symbol, "AAPL");
    }

    #[test]
    fn load_seed_skips_malformed_entries() {
        let file = write_seed(
            r#"[{"id":1,"symbol":"AAPL","name":"Apple","lastPrice":"150.00","volume":1000}, {"not":"a quote"}]"#,
        );
        let catalog = Catalog::load_seed(file.path()).unwrap();
        assert_eq!(catalog.symbols().len(), 1);
    }

    #[test]
    fn get_by_id_scans_entries() {
        let file = write_seed(
            r#"[{"id":7,"symbol":"MSFT","name":"Microsoft","lastPrice":"300.00","volume":500}]"#,
        );
        let catalog = Catalog::load_seed(file.path()).unwrap();
        assert_eq!(catalog.get_by_id(7).unwrap().symbol, "MSFT");
        assert!(catalog.get_by_id(99).is_none());
    }

    #[test]
    fn mutate_is_noop_for_unknown_symbol() {
        let catalog = Catalog::empty();
        catalog.mutate("ZZZZ", |q| q.clone());
        assert!(catalog.get("ZZZZ").is_none());
    }
}
