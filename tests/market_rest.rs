//! Integration test for the REST surface, driven through the real
//! `axum::Router` via `tower::ServiceExt::oneshot` rather than a bound
//! socket.

use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use market_fanout::auth::JwtHandler;
use market_fanout::catalog::Catalog;
use market_fanout::dispatcher::Dispatcher;
use market_fanout::session::SessionLifecycle;
use market_fanout::subscription::SubscriptionIndex;
use market_fanout::transport::InMemoryTransport;
use market_fanout::{build_router, AppState};

fn state_with_seed() -> AppState {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"[{"id":1,"symbol":"AAPL","name":"Apple","lastPrice":"150.00","bid":"149.95","ask":"150.05","volume":1000}]"#,
    )
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

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `oneshot` bypasses `into_make_service_with_connect_info`, so the rate
/// limiter's `ConnectInfo` extractor needs the extension set by hand here.
fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 0))))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn get_symbols_lists_the_seeded_catalog() {
    let app = build_router(state_with_seed());
    let response = app
        .oneshot(get("/api/v1/market/symbols"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["count"], 1);
    assert_eq!(json["symbols"][0], "AAPL");
}

#[tokio::test]
async fn get_quote_is_case_insensitive() {
    let app = build_router(state_with_seed());
    let response = app
        .oneshot(get("/api/v1/market/data/aapl"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["symbol"], "AAPL");
}

#[tokio::test]
async fn get_quote_404s_on_unknown_symbol() {
    let app = build_router(state_with_seed());
    let response = app
        .oneshot(get("/api/v1/market/data/ZZZZ"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn internal_stock_lookup_by_id() {
    let app = build_router(state_with_seed());
    let response = app
        .oneshot(get("/internal/stock/id/1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["symbol"], "AAPL");
    assert_eq!(json["id"], 1);
}

#[tokio::test]
async fn health_check_responds_ok() {
    let app = build_router(state_with_seed());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
