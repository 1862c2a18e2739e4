//! Protected sample resource
//!
//! Posts are static; the routes exist to exercise the request gate.

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use axum::{extract::Path, Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A post
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: u32,
    pub title: String,
    pub description: String,
}

/// Posts visible to the caller
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostsResponse {
    /// Id of the authenticated caller
    pub user: String,
    pub posts: Vec<Post>,
}

fn sample_posts() -> Vec<Post> {
    vec![
        Post {
            id: 1,
            title: "First post".to_string(),
            description: "Only visible with a live access token".to_string(),
        },
        Post {
            id: 2,
            title: "Second post".to_string(),
            description: "Access tokens expire quickly; refresh to keep reading".to_string(),
        },
    ]
}

/// List posts
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(
        ("auth-token" = String, Header, description = "Access token issued at login or refresh")
    ),
    responses(
        (status = 200, description = "Posts", body = PostsResponse),
        (status = 400, description = "Malformed access token", body = crate::error::ApiError),
        (status = 401, description = "Missing, expired or revoked access token", body = crate::error::ApiError),
    )
)]
pub async fn list_posts(Extension(user): Extension<AuthenticatedUser>) -> Json<PostsResponse> {
    Json(PostsResponse {
        user: user.user_id,
        posts: sample_posts(),
    })
}

/// Get a post by id
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(
        ("id" = u32, Path, description = "Post id"),
        ("auth-token" = String, Header, description = "Access token issued at login or refresh")
    ),
    responses(
        (status = 200, description = "Post", body = Post),
        (status = 401, description = "Missing, expired or revoked access token", body = crate::error::ApiError),
        (status = 404, description = "Unknown post", body = crate::error::ApiError),
    )
)]
pub async fn get_post(
    Extension(_user): Extension<AuthenticatedUser>,
    Path(id): Path<u32>,
) -> Result<Json<Post>, AppError> {
    sample_posts()
        .into_iter()
        .find(|post| post.id == id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Post {id} not found")))
}
