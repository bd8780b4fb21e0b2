//! JWT token validation for `/ws/market` connect-time authentication.
//!
//! The service never issues tokens itself — no login endpoint exists in
//! this spec's scope — so only `validate_token` is load-bearing in
//! production. `generate_token` is kept for test fixtures and for any
//! internal service that mints tokens out of band.

use anyhow::{Context, Result};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use tracing::debug;

use crate::auth::models::Claims;

pub struct JwtHandler {
    secret: Vec<u8>,
    expiration_hours: i64,
}

impl JwtHandler {
    pub fn new(secret: Vec<u8>) -> Self {
        Self {
            secret,
            expiration_hours: 24,
        }
    }

    pub fn generate_token(&self, user_id: &str) -> Result<(String, usize)> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(chrono::Duration::hours(self.expiration_hours))
            .context("invalid timestamp")?
            .timestamp() as usize;
        let expires_in = (self.expiration_hours * 3600) as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration,
        };

        debug!(user_id, expires_in, "generating JWT");

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(&self.secret),
        )
        .context("failed to generate JWT")?;

        Ok((token, expires_in))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.secret),
            &Validation::default(),
        )
        .context("invalid or expired token")?;

        debug!(sub = %decoded.claims.sub, "validated JWT");
        Ok(decoded.claims)
    }
}
