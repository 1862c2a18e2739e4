//! Health check and metrics handlers

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    pub store: bool,
}

/// Readiness probe - checks the store
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = match state.users.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "store ping failed");
            false
        }
    };

    let response = ReadinessResponse {
        ready: store,
        checks: ReadinessChecks { store },
    };

    if store {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus-compatible metrics endpoint
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let output = render_metrics(&state).await;

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

async fn render_metrics(state: &AppState) -> String {
    let mut output = String::new();

    output.push_str("# HELP authgate_uptime_seconds Time since server start\n");
    output.push_str("# TYPE authgate_uptime_seconds gauge\n");
    output.push_str(&format!("authgate_uptime_seconds {}\n\n", state.uptime_secs()));

    output.push_str("# HELP authgate_requests_total Total number of HTTP requests\n");
    output.push_str("# TYPE authgate_requests_total counter\n");
    output.push_str(&format!(
        "authgate_requests_total {}\n\n",
        state.get_request_count()
    ));

    output.push_str("# HELP authgate_build_info Build information\n");
    output.push_str("# TYPE authgate_build_info gauge\n");
    output.push_str(&format!(
        "authgate_build_info{{version=\"{}\"}} 1\n\n",
        env!("CARGO_PKG_VERSION")
    ));

    let metrics = state.metrics.read().await;
    let mut endpoints: Vec<_> = metrics.iter().collect();
    endpoints.sort_by(|a, b| a.0.cmp(b.0));

    output.push_str("# HELP authgate_http_requests_total HTTP requests by endpoint and status\n");
    output.push_str("# TYPE authgate_http_requests_total counter\n");
    for (endpoint, endpoint_metrics) in &endpoints {
        let mut statuses: Vec<_> = endpoint_metrics.status_counts.iter().collect();
        statuses.sort();
        for (status, count) in statuses {
            output.push_str(&format!(
                "authgate_http_requests_total{{endpoint=\"{endpoint}\",status=\"{status}\"}} {count}\n"
            ));
        }
    }
    output.push('\n');

    output.push_str("# HELP authgate_http_request_duration_seconds HTTP request latency\n");
    output.push_str("# TYPE authgate_http_request_duration_seconds histogram\n");
    for (endpoint, endpoint_metrics) in &endpoints {
        if endpoint_metrics.latency_count == 0 {
            continue;
        }

        let buckets = &endpoint_metrics.latency_buckets;
        let mut cumulative = 0u64;
        for (le, count) in [
            ("0.01", buckets.under_10ms),
            ("0.05", buckets.ms_10_50),
            ("0.1", buckets.ms_50_100),
            ("0.5", buckets.ms_100_500),
            ("1.0", buckets.ms_500_1000),
            ("+Inf", buckets.over_1s),
        ] {
            cumulative += count;
            output.push_str(&format!(
                "authgate_http_request_duration_seconds_bucket{{endpoint=\"{endpoint}\",le=\"{le}\"}} {cumulative}\n"
            ));
        }

        output.push_str(&format!(
            "authgate_http_request_duration_seconds_sum{{endpoint=\"{endpoint}\"}} {:.6}\n",
            endpoint_metrics.total_latency_us as f64 / 1_000_000.0
        ));
        output.push_str(&format!(
            "authgate_http_request_duration_seconds_count{{endpoint=\"{endpoint}\"}} {}\n",
            endpoint_metrics.latency_count
        ));
    }

    output
}
