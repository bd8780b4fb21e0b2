//! market-fanout — market-data fan-out service entry point.
//!
//! Thin binary: loads the environment, initializes tracing, and hands off
//! to `market_fanout::run`. All wiring lives in the library so it can be
//! driven directly from integration tests.

use std::path::Path;

use anyhow::Result;
use dotenv::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    tracing::info!("market-fanout starting");

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    market_fanout::run(manifest_dir).await
}

fn load_env() {
    let _ = dotenv();
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    if manifest_dir.join(".env").exists() {
        let _ = dotenv::from_path(manifest_dir.join(".env"));
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_fanout=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
