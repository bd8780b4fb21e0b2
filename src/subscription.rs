//! Subscription Index (C3).
//!
//! A concurrent bidirectional session <-> symbol mapping, safe under
//! concurrent mutation from inbound messages, scheduled ticks, and
//! disconnection events, with liveness-based expiry.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};

use crate::catalog::canonicalize;

/// Liveness window: a subscription is valid only while `active` and its
/// `last_activity` is strictly after `now - 5 minutes`.
pub const LIVENESS_WINDOW_MINUTES: i64 = 5;

/// A session's interest set and liveness metadata.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub session_id: String,
    pub user_id: String,
    pub subscribed_symbols: HashSet<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub active: bool,
}

impl Subscription {
    pub fn is_valid_at(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.active && now.signed_duration_since(self.last_activity) < window
    }
}

/// Owns `bySession` and `bySymbol`. Every mutating operation is serialized
/// by `write_lock` so the two tables stay mutually consistent for a given
/// session; each table is additionally an `RwLock` so concurrent readers
/// never block each other or a reader-only caller like `subscribers_of`.
pub struct SubscriptionIndex {
    by_session: RwLock<HashMap<String, Subscription>>,
    by_symbol: RwLock<HashMap<String, HashSet<String>>>,
    write_lock: Mutex<()>,
    liveness_window: Duration,
}

impl SubscriptionIndex {
    pub fn new() -> Self {
        Self::with_timeout_minutes(LIVENESS_WINDOW_MINUTES)
    }

    /// Builds an index whose liveness window is `market.subscription.timeout-min`
    /// instead of the 5-minute default, per configuration.
    pub fn with_timeout_minutes(minutes: i64) -> Self {
        Self {
            by_session: RwLock::new(HashMap::new()),
            by_symbol: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
            liveness_window: Duration::minutes(minutes),
        }
    }

    fn canonicalize_set(symbols: &[String]) -> HashSet<String> {
        symbols.iter().map(|s| canonicalize(s)).collect()
    }

    fn add_to_reverse(&self, session_id: &str, symbol: &str) {
        self.by_symbol
            .write()
            .entry(symbol.to_string())
            .or_default()
            .insert(session_id.to_string());
    }

    fn remove_from_reverse(&self, session_id: &str, symbol: &str) {
        if let Some(set) = self.by_symbol.write().get_mut(symbol) {
            set.remove(session_id);
        }
    }

    /// Creates the subscription if none exists, otherwise replaces the
    /// symbol set wholesale. A no-op if `symbols` is empty.
    pub fn subscribe(&self, session_id: &str, user_id: &str, symbols: &[String]) {
        let symbols = Self::canonicalize_set(symbols);
        if symbols.is_empty() {
            return;
        }
        let _guard = self.write_lock.lock();
        let now = Utc::now();

        let previous = self
            .by_session
            .read()
            .get(session_id)
            .map(|s| s.subscribed_symbols.clone());

        if let Some(previous) = &previous {
            for symbol in previous.difference(&symbols) {
                self.remove_from_reverse(session_id, symbol);
            }
            for symbol in symbols.difference(previous) {
                self.add_to_reverse(session_id, symbol);
            }
        } else {
            for symbol in &symbols {
                self.add_to_reverse(session_id, symbol);
            }
        }

        self.by_session
            .write()
            .entry(session_id.to_string())
            .and_modify(|sub| {
                sub.subscribed_symbols = symbols.clone();
                sub.last_activity = now;
                sub.active = true;
            })
            .or_insert_with(|| Subscription {
                session_id: session_id.to_string(),
                user_id: user_id.to_string(),
                subscribed_symbols: symbols.clone(),
                created_at: now,
                last_activity: now,
                active: true,
            });
    }

    /// Only if the subscription exists and is active: union `symbols` into
    /// the set and the reverse map.
    pub fn add_symbols(&self, session_id: &str, symbols: &[String]) {
        let symbols = Self::canonicalize_set(symbols);
        if symbols.is_empty() {
            return;
        }
        let _guard = self.write_lock.lock();
        if !self
            .by_session
            .read()
            .get(session_id)
            .map(|sub| sub.active)
            .unwrap_or(false)
        {
            return;
        }
        for symbol in &symbols {
            self.add_to_reverse(session_id, symbol);
        }
        if let Some(sub) = self.by_session.write().get_mut(session_id) {
            sub.subscribed_symbols.extend(symbols);
            sub.last_activity = Utc::now();
        }
    }

    /// Only if the subscription exists and is active: difference `symbols`
    /// from the set and the reverse map.
    pub fn remove_symbols(&self, session_id: &str, symbols: &[String]) {
        let symbols = Self::canonicalize_set(symbols);
        if symbols.is_empty() {
            return;
        }
        let _guard = self.write_lock.lock();
        if !self
            .by_session
            .read()
            .get(session_id)
            .map(|sub| sub.active)
            .unwrap_or(false)
        {
            return;
        }
        for symbol in &symbols {
            self.remove_from_reverse(session_id, symbol);
        }
        if let Some(sub) = self.by_session.write().get_mut(session_id) {
            for symbol in &symbols {
                sub.subscribed_symbols.remove(symbol);
            }
            sub.last_activity = Utc::now();
        }
    }

    /// Drops the subscription entirely and scrubs the session out of every
    /// reverse entry it held. Idempotent.
    pub fn remove(&self, session_id: &str) {
        let _guard = self.write_lock.lock();
        if let Some(sub) = self.by_session.write().remove(session_id) {
            for symbol in &sub.subscribed_symbols {
                self.remove_from_reverse(session_id, symbol);
            }
        }
    }

    /// Marks the subscription inactive and purges reverse entries, but
    /// keeps the record so a later `subscribe` on the same session id
    /// starts fresh rather than merging with stale state.
    pub fn deactivate(&self, session_id: &str) {
        let _guard = self.write_lock.lock();
        let held_symbols = {
            let Some(sub) = self.by_session.write().get_mut(session_id) else {
                return;
            };
            sub.active = false;
            sub.subscribed_symbols.clone()
        };
        for symbol in held_symbols {
            self.remove_from_reverse(session_id, &symbol);
        }
    }

    pub fn subscribers_of(&self, symbol: &str) -> HashSet<String> {
        self.by_symbol
            .read()
            .get(&canonicalize(symbol))
            .cloned()
            .unwrap_or_default()
    }

    /// Refreshes `last_activity` if the session exists, regardless of
    /// current active state.
    pub fn touch(&self, session_id: &str) {
        if let Some(sub) = self.by_session.write().get_mut(session_id) {
            sub.last_activity = Utc::now();
        }
    }

    pub fn get(&self, session_id: &str) -> Option<Subscription> {
        self.by_session.read().get(session_id).cloned()
    }

    pub fn active_count(&self) -> usize {
        let now = Utc::now();
        self.by_session
            .read()
            .values()
            .filter(|sub| sub.is_valid_at(now, self.liveness_window))
            .count()
    }

    /// Removes every subscription that has fallen out of the liveness
    /// window. Idempotent against a stable clock.
    pub fn sweep_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = self
            .by_session
            .read()
            .iter()
            .filter(|(_, sub)| !sub.is_valid_at(now, self.liveness_window))
            .map(|(session_id, _)| session_id.clone())
            .collect();
        for session_id in expired {
            self.remove(&session_id);
        }
    }
}

impl Default for SubscriptionIndex {
    fn default() -> Self {
        Self::new()
    }
}
