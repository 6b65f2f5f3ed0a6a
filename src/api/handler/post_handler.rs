use crate::api::model::common::PaginationQuery;
use crate::api::model::post::{
    CommentPage, CommentRequest, CommentResponse, PatchPostRequest, PostPage, PostRequest,
    PostResponse, SearchQuery, StatusResponse,
};
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::middleware::auth::AuthContext;
use crate::service::post_service;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;

// `{key}` is a slug for CRUD routes and a numeric id for like/share/comments.
pub fn post_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_posts_handler).post(create_post_handler))
        .route("/search", get(search_posts_handler))
        .route("/user/{username}", get(user_posts_handler))
        .route(
            "/{key}",
            get(get_post_handler)
                .put(update_post_handler)
                .patch(patch_post_handler)
                .delete(delete_post_handler),
        )
        .route("/{key}/like", post(like_post_handler))
        .route("/{key}/share", post(share_post_handler))
        .route(
            "/{key}/comments",
            get(list_comments_handler).post(create_comment_handler),
        )
}

/// List posts
#[utoipa::path(
    get,
    path = "/api/posts/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(PaginationQuery),
    responses(
        (status = 200, description = "Page of posts, newest first", body = PostPage),
        (status = 401, description = "Unauthorized error", body = ApiError),
        (status = 404, description = "Invalid page", body = ApiError),
    )
)]
pub async fn list_posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaginationQuery>,
) -> Result<Response, AppError> {
    post_service::list_posts(state, query).await
}

/// Create a post
#[utoipa::path(
    post,
    path = "/api/posts/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    request_body = PostRequest,
    responses(
        (status = 201, description = "Post created", body = PostResponse),
        (status = 401, description = "Unauthorized error", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn create_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<PostRequest>,
) -> Result<Response, AppError> {
    post_service::create_post(state, auth, request).await
}

/// Get a post by slug
#[utoipa::path(
    get,
    path = "/api/posts/{slug}/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Post", body = PostResponse),
        (status = 404, description = "No such post", body = ApiError),
    )
)]
pub async fn get_post_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    post_service::get_post(state, slug).await
}

/// Replace a post
#[utoipa::path(
    put,
    path = "/api/posts/{slug}/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 403, description = "Not the author", body = ApiError),
        (status = 404, description = "No such post", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn update_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(slug): Path<String>,
    Json(request): Json<PostRequest>,
) -> Result<Response, AppError> {
    post_service::update_post(state, auth, slug, request).await
}

/// Partially update a post
#[utoipa::path(
    patch,
    path = "/api/posts/{slug}/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    request_body = PatchPostRequest,
    responses(
        (status = 200, description = "Updated post", body = PostResponse),
        (status = 403, description = "Not the author", body = ApiError),
        (status = 404, description = "No such post", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn patch_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(slug): Path<String>,
    Json(request): Json<PatchPostRequest>,
) -> Result<Response, AppError> {
    post_service::patch_post(state, auth, slug, request).await
}

/// Delete a post
#[utoipa::path(
    delete,
    path = "/api/posts/{slug}/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 403, description = "Not the author", body = ApiError),
        (status = 404, description = "No such post", body = ApiError),
    )
)]
pub async fn delete_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    post_service::delete_post(state, auth, slug).await
}

/// Like a post
///
/// Liking twice is a no-op.
#[utoipa::path(
    post,
    path = "/api/posts/{id}/like/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Liked", body = StatusResponse),
        (status = 404, description = "No such post", body = ApiError),
    )
)]
pub async fn like_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    post_service::like_post(state, auth, key).await
}

/// Share a post
#[utoipa::path(
    post,
    path = "/api/posts/{id}/share/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Shared", body = StatusResponse),
        (status = 404, description = "No such post", body = ApiError),
    )
)]
pub async fn share_post_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    post_service::share_post(state, auth, key).await
}

/// List comments of a post
#[utoipa::path(
    get,
    path = "/api/posts/{id}/comments/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Post id"), PaginationQuery),
    responses(
        (status = 200, description = "Page of comments, newest first", body = CommentPage),
        (status = 404, description = "Invalid page", body = ApiError),
    )
)]
pub async fn list_comments_handler(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Response, AppError> {
    post_service::list_comments(state, key, query).await
}

/// Comment on a post
#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Post id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = CommentResponse),
        (status = 404, description = "No such post", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn create_comment_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(key): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<Response, AppError> {
    post_service::create_comment(state, auth, key, request).await
}

/// Search posts
#[utoipa::path(
    get,
    path = "/api/posts/search/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching posts, newest first", body = PostPage),
        (status = 404, description = "Invalid page", body = ApiError),
    )
)]
pub async fn search_posts_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    post_service::search_posts(state, query).await
}

/// Posts by one author
#[utoipa::path(
    get,
    path = "/api/posts/user/{username}/",
    tag = "Posts",
    security(("bearer_auth" = [])),
    params(("username" = String, Path, description = "Author username"), PaginationQuery),
    responses(
        (status = 200, description = "Page of the author's posts", body = PostPage),
        (status = 404, description = "No such user, or invalid page", body = ApiError),
    )
)]
pub async fn user_posts_handler(
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Response, AppError> {
    post_service::user_posts(state, username, query).await
}
