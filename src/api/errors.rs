//! Lookup API error type.
//!
//! The REST error envelope `{status, errorCode, message, data}` exists for
//! `INVALID_ARGUMENT`/`ILLEGAL_STATE`/`INTERNAL_ERROR` failures, but every
//! handler on this router is a read-only GET with no request body to
//! validate and no state transition to conflict on, so none of those three
//! kinds has a reachable call site here. The Lookup API's own contract
//! (unknown symbol/id) is a bare 404.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub enum ApiError {
    NotFound,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}
