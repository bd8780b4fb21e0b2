//! Bearer-token authentication for the `/ws/market` connect path.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::JwtHandler;
pub use middleware::authenticate;
