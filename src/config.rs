//! Layered configuration: environment variables (optionally loaded from a
//! `.env` file) overlaid on the documented defaults, via the `config`
//! crate the same way the gateway services in this fleet do it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use base64::Engine;
use config::{Config as ConfigSource, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct RawSettings {
    #[serde(default = "default_simulation_volatility")]
    simulation_volatility: f64,
    #[serde(default = "default_tick_period_ms")]
    tick_period_ms: u64,
    #[serde(default = "default_subscription_timeout_min")]
    subscription_timeout_min: i64,
    #[serde(default = "default_sweep_period_sec")]
    sweep_period_sec: u64,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_seed_path")]
    seed_path: String,
    jwt_secret: String,
}

fn default_simulation_volatility() -> f64 {
    0.02
}
fn default_tick_period_ms() -> u64 {
    5000
}
fn default_subscription_timeout_min() -> i64 {
    5
}
fn default_sweep_period_sec() -> u64 {
    60
}
fn default_port() -> u16 {
    3000
}
fn default_seed_path() -> String {
    "seed/instruments.json".to_string()
}

/// Resolved runtime configuration for the fan-out service.
pub struct Settings {
    pub volatility: f64,
    pub tick_period: Duration,
    pub subscription_timeout_min: i64,
    pub sweep_period: Duration,
    pub port: u16,
    pub seed_path: PathBuf,
    pub jwt_secret: Vec<u8>,
}

impl Settings {
    /// Loads from (in ascending priority) `config/default.toml`, a
    /// `MARKET_`-prefixed environment block, and a standalone
    /// `JWT_SECRET` variable (kept out of the `market.*` namespace since
    /// it is base64 binary, not a plain scalar).
    pub fn load(manifest_dir: &Path) -> Result<Self> {
        let config_path = manifest_dir.join("config/default.toml");

        let mut builder = ConfigSource::builder()
            .set_default("simulation_volatility", default_simulation_volatility())?
            .set_default("tick_period_ms", default_tick_period_ms())?
            .set_default("subscription_timeout_min", default_subscription_timeout_min())?
            .set_default("sweep_period_sec", default_sweep_period_sec())?
            .set_default("port", default_port())?
            .set_default("seed_path", default_seed_path())?;

        if config_path.exists() {
            builder = builder.add_source(File::from(config_path));
        }

        builder = builder.add_source(Environment::with_prefix("MARKET").separator("_"));

        let jwt_secret_b64 = std::env::var("JWT_SECRET")
            .unwrap_or_else(|_| "ZGV2LXNlY3JldC1jaGFuZ2UtaW4tcHJvZHVjdGlvbg==".to_string());
        builder = builder.set_override("jwt_secret", jwt_secret_b64)?;

        let raw: RawSettings = builder.build()?.try_deserialize()?;

        let jwt_secret = base64::engine::general_purpose::STANDARD
            .decode(raw.jwt_secret.trim())
            .context("JWT_SECRET is not valid base64")?;

        let seed_path = {
            let p = PathBuf::from(&raw.seed_path);
            if p.is_absolute() {
                p
            } else {
                manifest_dir.join(p)
            }
        };

        Ok(Self {
            volatility: raw.simulation_volatility,
            tick_period: Duration::from_millis(raw.tick_period_ms),
            subscription_timeout_min: raw.subscription_timeout_min,
            sweep_period: Duration::from_secs(raw.sweep_period_sec),
            port: raw.port,
            seed_path,
            jwt_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env_or_file() {
        std::env::remove_var("JWT_SECRET");
        std::env::remove_var("MARKET_SIMULATION_VOLATILITY");
        let settings = Settings::load(Path::new("/nonexistent-manifest-dir")).unwrap();
        assert_eq!(settings.volatility, 0.02);
        assert_eq!(settings.tick_period, Duration::from_millis(5000));
        assert_eq!(settings.sweep_period, Duration::from_secs(60));
        assert_eq!(settings.port, 3000);
    }

    #[test]
    fn env_override_takes_precedence() {
        std::env::set_var("MARKET_SIMULATION_VOLATILITY", "0.05");
        let settings = Settings::load(Path::new("/nonexistent-manifest-dir")).unwrap();
        assert_eq!(settings.volatility, 0.05);
        std::env::remove_var("MARKET_SIMULATION_VOLATILITY");
    }
}
