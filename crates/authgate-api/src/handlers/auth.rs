//! User endpoints: register, login, token refresh and logout

use crate::auth::{
    LoginRequest, RefreshResponse, RegisterRequest, RegisterResponse, TokenPair,
    AUTH_TOKEN_HEADER, REFRESH_TOKEN_HEADER,
};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

fn refresh_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// Register a new user account
#[utoipa::path(
    post,
    path = "/api/user/register",
    tag = "user",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = RegisterResponse),
        (status = 400, description = "Invalid input or email already exists", body = crate::error::ApiError),
        (status = 500, description = "Store failure", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<RegisterResponse>, AppError> {
    let Json(request) = payload?;
    let user = state.auth.register(request).await?;

    Ok(Json(RegisterResponse { user }))
}

/// Login with email and password
///
/// The tokens are returned in the body and mirrored in the `auth-token`
/// and `refresh-token` response headers.
#[utoipa::path(
    post,
    path = "/api/user/login",
    tag = "user",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 400, description = "Invalid input or wrong password", body = crate::error::ApiError),
        (status = 404, description = "Unknown user", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let pair = state.auth.login(request).await?;

    Ok((
        [
            (AUTH_TOKEN_HEADER, pair.access_token.clone()),
            (REFRESH_TOKEN_HEADER, pair.refresh_token.clone()),
        ],
        Json(pair),
    ))
}

/// Exchange the `refresh-token` header for a new access token
#[utoipa::path(
    post,
    path = "/api/user/token",
    tag = "user",
    params(
        ("refresh-token" = String, Header, description = "Refresh token issued at login")
    ),
    responses(
        (status = 201, description = "New access token", body = RefreshResponse),
        (status = 400, description = "Token identity mismatch", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid refresh token", body = crate::error::ApiError),
        (status = 404, description = "Refresh token not found", body = crate::error::ApiError),
        (status = 500, description = "Store failure", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let access_token = state.auth.refresh(refresh_token(&headers)).await?;

    Ok((StatusCode::CREATED, Json(RefreshResponse { access_token })))
}

/// Revoke every token of the `refresh-token` header's owner
#[utoipa::path(
    post,
    path = "/api/user/logout",
    tag = "user",
    params(
        ("refresh-token" = String, Header, description = "Refresh token issued at login")
    ),
    responses(
        (status = 200, description = "Logged out", body = String),
        (status = 401, description = "Missing or invalid refresh token", body = crate::error::ApiError),
        (status = 404, description = "Nothing to revoke", body = crate::error::ApiError),
        (status = 500, description = "Store failure", body = crate::error::ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(refresh_token(&headers)).await?;

    Ok((StatusCode::OK, "Logged out successfully!"))
}
