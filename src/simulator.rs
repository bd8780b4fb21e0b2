//! Price Simulator (C2).
//!
//! A pure stateful transformer: given the current quote and an RNG, derives
//! the next quote. Accessed only from the tick engine's thread; the RNG
//! itself need not be thread-safe.

use chrono::Utc;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use rust_decimal::{Decimal, RoundingStrategy};

const HALF_SPREAD_BASIS: &str = "0.001";
const VOLUME_SCALE: f64 = 1000.0;
const PRICE_EPSILON: &str = "0.01";

pub struct PriceSimulator {
    volatility: f64,
    normal: Normal<f64>,
}

impl PriceSimulator {
    pub fn new(volatility: f64) -> Self {
        Self {
            volatility,
            normal: Normal::new(0.0, 1.0).expect("standard normal is always valid"),
        }
    }

    /// Advances one quote by one tick. Half-up rounding at 2 decimal
    /// places throughout; volume is clamped at zero; price is clamped to a
    /// small positive epsilon so volatility can never collapse it to zero
    /// or negative.
    pub fn next(&self, quote: &crate::models::Quote, rng: &mut impl Rng) -> crate::models::Quote {
        let delta = self.normal.sample(rng) * self.volatility;

        let mut last_price = round_half_up(quote.last_price * decimal_from_f64(1.0 + delta));
        let epsilon: Decimal = PRICE_EPSILON.parse().unwrap();
        if last_price <= Decimal::ZERO {
            last_price = epsilon;
        }

        let basis: Decimal = HALF_SPREAD_BASIS.parse().unwrap();
        let spread = round_half_up(last_price * basis);
        let half_spread = spread / Decimal::TWO;
        let bid = round_half_up(last_price - half_spread);
        let ask = round_half_up(last_price + half_spread);

        let volume_delta = (self.normal.sample(rng) * VOLUME_SCALE).round() as i64;
        let volume = (quote.volume as i64 + volume_delta).max(0) as u64;

        crate::models::Quote {
            id: quote.id,
            symbol: quote.symbol.clone(),
            name: quote.name.clone(),
            last_price,
            bid: Some(bid),
            ask: Some(ask),
            volume,
            timestamp: Utc::now(),
        }
    }
}

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::from_f64_retain(value).unwrap_or(Decimal::ONE)
}

fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
