//! Tick Engine (C4).
//!
//! A single logical clock driving two periodic tasks: the broadcast tick
//! (advances every instrument and fans out a snapshot) and the expiry sweep
//! (drops stale subscriptions). Each task is serial with respect to itself
//! — a slow tick delays the next one rather than overlapping it — but the
//! two tasks run concurrently with each other since they touch disjoint
//! state.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt;
use rand::thread_rng;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::catalog::Catalog;
use crate::dispatcher::Dispatcher;
use crate::models::{format_timestamp, Quote, Snapshot};
use crate::simulator::PriceSimulator;
use crate::subscription::SubscriptionIndex;

pub struct TickEngine {
    catalog: Arc<Catalog>,
    index: Arc<SubscriptionIndex>,
    dispatcher: Arc<Dispatcher>,
    simulator: PriceSimulator,
    tick_period: Duration,
    sweep_period: Duration,
}

impl TickEngine {
    pub fn new(
        catalog: Arc<Catalog>,
        index: Arc<SubscriptionIndex>,
        dispatcher: Arc<Dispatcher>,
        volatility: f64,
        tick_period: Duration,
        sweep_period: Duration,
    ) -> Self {
        Self {
            catalog,
            index,
            dispatcher,
            simulator: PriceSimulator::new(volatility),
            tick_period,
            sweep_period,
        }
    }

    /// Spawns the broadcast-tick and expiry-sweep loops. Each is driven by
    /// its own `tokio::time::interval` with `MissedTickBehavior::Delay`: the
    /// initial delay equals the period (the first tick fires one period in,
    /// not immediately), and an overrunning run never accumulates a burst of
    /// catch-up ticks — the next one fires immediately after completion
    /// instead of waiting out a fresh full period, per spec.
    pub fn spawn(self: Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let tick_handle = {
            let engine = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(engine.tick_period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    run_guarded("broadcast tick", engine.run_broadcast_tick()).await;
                }
            })
        };

        let sweep_handle = {
            let engine = self.clone();
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(engine.sweep_period);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    run_guarded("expiry sweep", engine.run_expiry_sweep()).await;
                }
            })
        };

        (tick_handle, sweep_handle)
    }

    /// Runs one broadcast tick synchronously, outside the scheduler loop.
    /// Exposed so integration tests can drive a deterministic tick instead
    /// of waiting out the real period.
    pub async fn tick_once(&self) {
        self.run_broadcast_tick().await;
    }

    async fn run_broadcast_tick(&self) {
        let before = self.catalog.snapshot();
        if before.is_empty() {
            debug!("catalog empty, skipping tick");
            return;
        }

        let tick_timestamp = format_timestamp(Utc::now());
        let mut rng = thread_rng();
        let mut updated: std::collections::HashMap<String, Quote> =
            std::collections::HashMap::with_capacity(before.len());

        for (symbol, quote) in &before {
            let next = self.simulator.next(quote, &mut rng);
            self.catalog.mutate(symbol, |_| next.clone());
            updated.insert(symbol.clone(), next);
        }

        let snapshot = Snapshot {
            quotes: updated,
            timestamp: tick_timestamp,
        };

        self.dispatcher.dispatch_tick(&snapshot).await;
    }

    async fn run_expiry_sweep(&self) {
        self.index.sweep_expired();
    }
}

/// Runs `fut`, catching a panic so the scheduler can keep firing
/// subsequent ticks instead of dying with the task.
async fn run_guarded<F>(label: &str, fut: F)
where
    F: std::future::Future<Output = ()>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(()) => {}
        Err(_) => error!(task = label, "tick callback panicked; scheduler continues"),
    }
}
