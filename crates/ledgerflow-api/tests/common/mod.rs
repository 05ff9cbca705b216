//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use ledgerflow_core::store::EventStore;
use ledgerflow_event_store::{InMemoryEventStore, PgEventStore};
use ledgerflow_test_support::FixedClock;
use sqlx::PgPool;
use tower::ServiceExt;

use ledgerflow_api::state::AppState;

/// Build the full app router over `event_store` with a fixed clock. Uses the
/// same router as `main.rs`.
pub fn build_app_with(event_store: Arc<dyn EventStore>) -> Router {
    let clock = Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ));
    let app_state = AppState::new(event_store, clock).unwrap();
    ledgerflow_api::app(app_state)
}

/// Build the full app router over a fresh in-memory event store.
pub fn build_test_app() -> Router {
    build_app_with(Arc::new(InMemoryEventStore::new()))
}

/// Build the full app router over a real `PgEventStore`.
pub fn build_pg_test_app(pool: PgPool) -> Router {
    build_app_with(Arc::new(PgEventStore::new(pool)))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}
