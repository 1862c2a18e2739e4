//! Metrics tracking middleware
//!
//! Counts requests per route and status and records their latency for the
//! `/metrics` endpoint.

use crate::state::AppState;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

/// Series for requests that matched no route
pub const UNMATCHED_ENDPOINT: &str = "unmatched";

/// Record count, status and latency of every request
///
/// Requests are keyed by their route template (`/api/posts/:id`), so the
/// number of series is bounded by the router.
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ENDPOINT.to_string());

    let response = next.run(request).await;

    let latency_us = start.elapsed().as_micros() as u64;
    state
        .record_request(endpoint, response.status().as_u16(), latency_us)
        .await;

    response
}
