//! API route definitions

use crate::auth::middleware::auth_middleware;
use crate::handlers::{auth, posts};
use crate::state::AppState;
use axum::{middleware, routing::get, routing::post, Router};
use std::sync::Arc;

/// Routes under `/api`
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes; refresh and logout authenticate with the refresh-token header
    let user_routes = Router::new()
        .route("/register", post(auth::register_handler))
        .route("/login", post(auth::login_handler))
        .route("/token", post(auth::refresh_handler))
        .route("/logout", post(auth::logout_handler));

    // Protected routes (live access token required)
    let post_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/:id", get(posts::get_post))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .nest("/user", user_routes)
        .nest("/posts", post_routes)
}
