//! Market-data fan-out service.
//!
//! Wires the tick engine, subscription index, and fan-out dispatcher (the
//! hard concurrency core) behind an axum HTTP/WS server. `main.rs` is a
//! thin binary entry point; everything else lives here so it can be
//! exercised directly from integration tests without spawning a process.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod middleware;
pub mod models;
pub mod session;
pub mod simulator;
pub mod subscription;
pub mod tick;
pub mod transport;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::JwtHandler;
use crate::catalog::Catalog;
use crate::config::Settings;
use crate::dispatcher::Dispatcher;
use crate::session::SessionLifecycle;
use crate::subscription::SubscriptionIndex;
use crate::tick::TickEngine;
use crate::transport::InMemoryTransport;

/// Shared application state handed to every axum handler. Cloning is cheap
/// — every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub index: Arc<SubscriptionIndex>,
    pub dispatcher: Arc<Dispatcher>,
    pub lifecycle: Arc<SessionLifecycle>,
    pub transport: Arc<InMemoryTransport>,
    pub jwt_handler: Arc<JwtHandler>,
}

/// Loads configuration, seeds the catalog, wires C1–C6 together, starts
/// the tick engine, and serves the HTTP/WS router until the process exits.
pub async fn run(manifest_dir: &std::path::Path) -> Result<()> {
    let settings = Settings::load(manifest_dir).context("failed to load configuration")?;

    let catalog = Arc::new(
        Catalog::load_seed(&settings.seed_path)
            .with_context(|| format!("failed to load seed catalog {}", settings.seed_path.display()))?,
    );
    info!(symbols = catalog.symbols().len(), "catalog seeded");

    let index = Arc::new(SubscriptionIndex::with_timeout_minutes(
        settings.subscription_timeout_min,
    ));
    let transport = Arc::new(InMemoryTransport::new());
    let dispatcher = Arc::new(Dispatcher::new(transport.clone(), index.clone()));
    let lifecycle = Arc::new(SessionLifecycle::new(catalog.clone(), index.clone(), dispatcher.clone()));
    let jwt_handler = Arc::new(JwtHandler::new(settings.jwt_secret.clone()));

    let state = AppState {
        catalog: catalog.clone(),
        index: index.clone(),
        dispatcher: dispatcher.clone(),
        lifecycle,
        transport: transport.clone(),
        jwt_handler,
    };

    let tick_engine = Arc::new(TickEngine::new(
        catalog,
        index,
        dispatcher,
        settings.volatility,
        settings.tick_period,
        settings.sweep_period,
    ));
    let (_tick_handle, _sweep_handle) = tick_engine.spawn();

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "market-fanout listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

/// Builds the router without binding or serving — split out so tests can
/// drive the REST surface in-process via `tower::ServiceExt::oneshot`.
pub fn build_router(state: AppState) -> Router {
    let rate_limiter = crate::middleware::RateLimitLayer::new(crate::middleware::RateLimitConfig::default());

    let rest_routes = Router::new()
        .route("/api/v1/market/data", get(api::market::get_all_quotes))
        .route("/api/v1/market/data/:symbol", get(api::market::get_quote))
        .route("/api/v1/market/symbols", get(api::market::get_symbols))
        .route("/internal/stock/:symbol", get(api::internal::get_stock_by_symbol))
        .route("/internal/stock/id/:id", get(api::internal::get_stock_by_id))
        .layer(axum::middleware::from_fn_with_state(
            rate_limiter,
            crate::middleware::rate_limit_middleware,
        ));

    Router::new()
        .merge(rest_routes)
        .route("/ws/market", get(ws::websocket_handler))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(
            crate::middleware::logging::request_logging_simple,
        ))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "market-fanout operational"
}

/// Test-only fixtures shared by the `api` handler unit tests.
#[cfg(test)]
pub mod test_support {
    use super::*;

    pub async fn test_app_state(seed: &[(&str, &str)]) -> AppState {
        use std::io::Write;

        let mut entries = Vec::with_capacity(seed.len());
        for (id, (symbol, last_price)) in seed.iter().enumerate() {
            entries.push(serde_json::json!({
                "id": id as i64 + 1,
                "symbol": symbol,
                "name": symbol,
                "lastPrice": last_price,
                "bid": last_price,
                "ask": last_price,
                "volume": 0,
            }));
        }
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&entries).unwrap().as_bytes())
            .unwrap();

        let catalog = Arc::new(Catalog::load_seed(file.path()).unwrap());
        let index = Arc::new(SubscriptionIndex::new());
        let transport = Arc::new(InMemoryTransport::new());
        let dispatcher = Arc::new(Dispatcher::new(transport.clone(), index.clone()));
        let lifecycle = Arc::new(SessionLifecycle::new(catalog.clone(), index.clone(), dispatcher.clone()));
        let jwt_handler = Arc::new(JwtHandler::new(b"test-secret".to_vec()));

        AppState {
            catalog,
            index,
            dispatcher,
            lifecycle,
            transport,
            jwt_handler,
        }
    }
}
