//! Authentication data structures.
//!
//! The spec treats authentication as an abstract collaborator: validate a
//! bearer token, produce a user identity. `Claims` is the entire surface
//! that survives that abstraction — no roles, no user records, no RBAC.

use serde::{Deserialize, Serialize};

/// JWT claims payload. `sub` becomes the session's resolved `userId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}
