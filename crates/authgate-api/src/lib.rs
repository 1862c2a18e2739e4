//! authgate API - token-based authentication server
//!
//! Users register and log in under `/api/user`, receiving a short-lived
//! access token and a refresh token. Routes under `/api/posts` sit behind
//! the request gate and require a live access token in the `auth-token`
//! header.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

use crate::auth::{AUTH_TOKEN_HEADER, REFRESH_TOKEN_HEADER};
use crate::state::AppState;
use authgate_core::ServerConfig;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware as axum_middleware,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// OpenAPI document for every public route
#[derive(OpenApi)]
#[openapi(
    info(title = "authgate", description = "Token-based authentication API"),
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::refresh_handler,
        handlers::auth::logout_handler,
        handlers::posts::list_posts,
        handlers::posts::get_post,
    ),
    components(schemas(
        auth::RegisterRequest,
        auth::LoginRequest,
        auth::RegisterResponse,
        auth::TokenPair,
        auth::RefreshResponse,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::posts::Post,
        handlers::posts::PostsResponse,
        error::ApiError,
    )),
    tags(
        (name = "user", description = "Registration, login and token lifecycle"),
        (name = "posts", description = "Protected sample resource"),
        (name = "health", description = "Liveness and readiness probes"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    let router = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::prometheus_metrics))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api", routes::api_routes(state.clone()))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(axum_middleware::from_fn(
            middleware::security_headers_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// CORS layer for the configured origins, `None` when no origin is configured
fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return None;
    }

    let token_headers = [
        HeaderName::from_static(AUTH_TOKEN_HEADER),
        HeaderName::from_static(REFRESH_TOKEN_HEADER),
    ];

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([
                header::CONTENT_TYPE,
                token_headers[0].clone(),
                token_headers[1].clone(),
            ])
            .expose_headers(token_headers),
    )
}

/// State over an in-memory store with cheap password hashing
#[cfg(any(test, feature = "test-utils"))]
pub fn test_state(mut config: authgate_core::AppConfig) -> Arc<AppState> {
    config.auth.password_memory_kib = 4096;
    config.auth.password_iterations = 1;
    config.auth.password_parallelism = 1;

    let store = Arc::new(authgate_store::MemoryStore::new());
    Arc::new(AppState::new(config, store.clone(), store))
}

/// Router over [`test_state`] with the default configuration
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    create_router(test_state(authgate_core::AppConfig::default()))
}
