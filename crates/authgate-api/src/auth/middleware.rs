/// Request gate for protected routes
///
/// Reads the access token from the `auth-token` header, verifies it against
/// the token store and adds the caller to the request extensions.
use super::jwt::JwtError;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// Header carrying the access token
pub const AUTH_TOKEN_HEADER: &str = "auth-token";

/// Header carrying the refresh token
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Authenticated caller, extracted in handlers with `Extension<AuthenticatedUser>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Authentication middleware that requires a live access token
///
/// * header absent: 401 `ACCESS_DENIED`
/// * token fails verification: `INVALID_TOKEN`, 401 when expired, 400 otherwise
/// * token verifies but has no store record: 401 `NOT_RECOGNIZED`
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use authgate_api::auth::middleware::auth_middleware;
///
/// let app = Router::new()
///     .route("/api/posts", get(list_posts))
///     .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
///     .with_state(state);
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTH_TOKEN_HEADER)
        .ok_or(AppError::AccessDenied)?
        .to_str()
        .map_err(|_| AppError::InvalidToken(JwtError::InvalidToken))?;

    let user_id = match state.auth.tokens().verify_access_token(token).await {
        Ok(user_id) => user_id,
        Err(AppError::InvalidSignature(e)) => {
            warn!(reason = %e, "rejected auth-token");
            return Err(AppError::InvalidToken(e));
        }
        Err(e) => return Err(e),
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_state;
    use authgate_core::AppConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn whoami(Extension(user): Extension<AuthenticatedUser>) -> String {
        user.user_id
    }

    fn app(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn request(token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/whoami");
        if let Some(token) = token {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_is_denied() {
        let state = test_state(AppConfig::default());
        let response = app(state).oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_garbage_token_is_bad_request() {
        let state = test_state(AppConfig::default());
        let response = app(state).oneshot(request(Some("not-a-jwt"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_live_token_reaches_handler() {
        let state = test_state(AppConfig::default());
        let token = state.auth.tokens().issue_access_token("u1").await.unwrap();

        let response = app(state).oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"u1");
    }

    #[tokio::test]
    async fn test_unstored_token_is_not_recognized() {
        let state = test_state(AppConfig::default());
        let token = crate::auth::jwt::generate_access_token(
            state.auth.tokens().jwt_config(),
            "u1",
        )
        .unwrap();

        let response = app(state).oneshot(request(Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
