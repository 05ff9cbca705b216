//! Health check endpoint.

use axum::extract::State;
use axum::{Json, Router, routing::get};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Accounts known to the projection, when it is readable.
    pub accounts: Option<usize>,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let accounts = state.projection.summaries().ok().map(|s| s.len());
    Json(HealthResponse {
        status: if accounts.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        accounts,
    })
}

/// Returns the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
