//! Connect-time authentication for `/ws/market`.
//!
//! Per spec, REST lookups are unauthenticated and only the WS upgrade
//! path validates a bearer token; there is no `Authorization`-gated
//! middleware layer on the router. `authenticate` is called directly by
//! the upgrade handler with whatever it already extracted from the
//! query string and headers.

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::auth::{jwt::JwtHandler, models::Claims};

/// Looks for a token in the query string first (`?token=...`, for
/// browser WebSocket clients that can't set headers), then falls back to
/// `Authorization: Bearer <token>`.
pub fn extract_token(query: Option<&str>, headers: &HeaderMap) -> Option<String> {
    let from_query = query.and_then(|q| {
        q.split('&')
            .find(|pair| pair.starts_with("token="))
            .and_then(|pair| pair.split('=').nth(1))
            .map(|t| t.to_string())
    });

    from_query.or_else(|| {
        headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|t| t.to_string())
    })
}

/// Validates the connect-time token and returns the resolved claims.
/// Rejects the connection before any session state is created.
pub fn authenticate(
    jwt_handler: &JwtHandler,
    query: Option<&str>,
    headers: &HeaderMap,
) -> Result<Claims, AuthError> {
    let token = extract_token(query, headers).ok_or(AuthError::MissingToken)?;
    jwt_handler
        .validate_token(&token)
        .map_err(|_| AuthError::InvalidToken)
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn handler() -> JwtHandler {
        JwtHandler::new(b"test-secret".to_vec())
    }

    #[test]
    fn extracts_token_from_query_before_header() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-header"));
        let token = extract_token(Some("token=from-query&other=1"), &headers);
        assert_eq!(token.as_deref(), Some("from-query"));
    }

    #[test]
    fn falls_back_to_header_when_query_absent() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer from-header"));
        let token = extract_token(None, &headers);
        assert_eq!(token.as_deref(), Some("from-header"));
    }

    #[test]
    fn missing_token_is_an_error() {
        let headers = HeaderMap::new();
        let result = authenticate(&handler(), None, &headers);
        assert!(matches!(result, Err(AuthError::MissingToken)));
    }

    #[test]
    fn valid_token_resolves_claims() {
        let h = handler();
        let (token, _) = h.generate_token("user-1").unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        let claims = authenticate(&h, None, &headers).unwrap();
        assert_eq!(claims.sub, "user-1");
    }

    #[test]
    fn invalid_token_is_rejected() {
        let headers = HeaderMap::new();
        let result = authenticate(&handler(), Some("token=garbage"), &headers);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
