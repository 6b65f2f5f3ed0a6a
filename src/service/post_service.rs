use crate::api::model::common::{PageWindow, PaginationQuery};
use crate::api::model::post::{
    CommentPage, CommentRequest, CommentResponse, PatchPostRequest, PostPage, PostRequest,
    PostResponse, SearchQuery, StatusResponse,
};
use crate::config::app_config::AppState;
use crate::db::entity::post::{Post, PostWithStats};
use crate::db::repo::{post_repository, users_repository};
use crate::error::error_model::{internal_error, AppError, ErrorType};
use crate::middleware::auth::AuthContext;
use crate::util::slug;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info, warn};
use validator::Validate;

const SLUG_INSERT_ATTEMPTS: usize = 3;

fn post_not_found() -> AppError {
    AppError::new(ErrorType::NotFound, "No Post matches the given query.")
}

// Blank images clear the field.
fn normalize_image(image: Option<String>) -> Option<String> {
    image.filter(|image| !image.trim().is_empty())
}

/// Post ids arrive as path text; anything that is not a number cannot name a post.
fn parse_post_id(key: &str) -> Result<i64, AppError> {
    key.parse::<i64>().map_err(|_| post_not_found())
}

async fn existing_post_by_id(pool: &SqlitePool, key: &str) -> Result<Post, AppError> {
    let post_id = parse_post_id(key)?;
    post_repository::get_post_by_id(pool, post_id)
        .await
        .map_err(internal_error("Error reading post"))?
        .ok_or_else(post_not_found)
}

async fn post_with_stats(pool: &SqlitePool, slug: &str) -> Result<PostWithStats, AppError> {
    post_repository::get_post_by_slug(pool, slug)
        .await
        .map_err(internal_error("Error reading post"))?
        .ok_or_else(post_not_found)
}

/// Loads the post and checks the caller wrote it.
async fn owned_post(
    pool: &SqlitePool,
    slug: &str,
    auth: &AuthContext,
) -> Result<PostWithStats, AppError> {
    let post = post_with_stats(pool, slug).await?;
    if post.author_id != auth.user_id {
        warn!(
            "User {} tried to modify post {} of user {}",
            auth.user_id, post.id, post.author_id
        );
        return Err(AppError::new(
            ErrorType::Forbidden,
            "You can only edit your own posts",
        ));
    }
    Ok(post)
}

async fn unique_slug(pool: &SqlitePool, base: &str) -> Result<String, AppError> {
    let mut attempt = 0;
    loop {
        let candidate = slug::candidate(base, attempt);
        if !post_repository::slug_exists(pool, &candidate)
            .await
            .map_err(internal_error("Error checking slug"))?
        {
            return Ok(candidate);
        }
        attempt += 1;
    }
}

fn paged_posts(
    window: PageWindow,
    posts: Result<Vec<PostWithStats>, sqlx::Error>,
) -> Result<Response, AppError> {
    let posts = posts.map_err(internal_error("Error listing posts"))?;
    Ok((StatusCode::OK, Json(PostPage::new(window, posts))).into_response())
}

/// All posts, newest first.
#[tracing::instrument(
    skip(state),
    fields(service.name = "post_service", service.operation = "list_posts")
)]
pub async fn list_posts(
    state: Arc<AppState>,
    query: PaginationQuery,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let count = post_repository::count_posts(pool)
        .await
        .map_err(internal_error("Error counting posts"))?;
    let window = PageWindow::resolve(query.page, query.page_size, count)?;
    let posts = post_repository::list_posts(pool, window.limit(), window.offset()).await;
    paged_posts(window, posts)
}

/// Creates a post owned by the caller, with a slug derived from the title.
#[tracing::instrument(
    skip(state, auth, request),
    fields(service.name = "post_service", service.operation = "create_post", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn create_post(
    state: Arc<AppState>,
    auth: AuthContext,
    request: PostRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "PostRequest"))?;

    let pool = &state.db_pool;
    let base = slug::base_slug(&request.title, &request.content);
    let image = normalize_image(request.image);

    let mut created = None;
    for _ in 0..SLUG_INSERT_ATTEMPTS {
        let slug = unique_slug(pool, &base).await?;
        match post_repository::create_post(
            pool,
            auth.user_id,
            &request.title,
            &request.content,
            image.as_deref(),
            &slug,
        )
        .await
        {
            Ok(post) => {
                created = Some(post);
                break;
            }
            // Another request took the slug between the check and the insert.
            Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
                warn!("Slug {} was taken concurrently, retrying", slug);
            }
            Err(e) => {
                error!("Error creating post: {:?}", e);
                return Err(AppError::internal());
            }
        }
    }
    let post = created.ok_or_else(AppError::internal)?;
    info!("User {} created post {}", auth.user_id, post.id);

    let post = post_with_stats(pool, &post.slug).await?;
    Ok((StatusCode::CREATED, Json(PostResponse::from(post))).into_response())
}

pub async fn get_post(state: Arc<AppState>, slug: String) -> Result<Response, AppError> {
    let post = post_with_stats(&state.db_pool, &slug).await?;
    Ok((StatusCode::OK, Json(PostResponse::from(post))).into_response())
}

/// Replaces title and content (and image when given). The slug stays as created.
#[tracing::instrument(
    skip(state, auth, request),
    fields(service.name = "post_service", service.operation = "update_post", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn update_post(
    state: Arc<AppState>,
    auth: AuthContext,
    slug: String,
    request: PostRequest,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let post = owned_post(pool, &slug, &auth).await?;
    request
        .validate()
        .map_err(|e| AppError::validation(e, "PostRequest"))?;

    let image = match request.image {
        Some(image) => normalize_image(Some(image)),
        None => post.image.clone(),
    };
    post_repository::update_post(pool, post.id, &request.title, &request.content, image.as_deref())
        .await
        .map_err(internal_error("Error updating post"))?;

    get_post(state.clone(), slug).await
}

#[tracing::instrument(
    skip(state, auth, request),
    fields(service.name = "post_service", service.operation = "patch_post", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn patch_post(
    state: Arc<AppState>,
    auth: AuthContext,
    slug: String,
    request: PatchPostRequest,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let post = owned_post(pool, &slug, &auth).await?;
    request
        .validate()
        .map_err(|e| AppError::validation(e, "PatchPostRequest"))?;

    let title = request.title.unwrap_or(post.title);
    let content = request.content.unwrap_or(post.content);
    let image = match request.image {
        Some(image) => normalize_image(Some(image)),
        None => post.image,
    };
    post_repository::update_post(pool, post.id, &title, &content, image.as_deref())
        .await
        .map_err(internal_error("Error updating post"))?;

    get_post(state.clone(), slug).await
}

#[tracing::instrument(
    skip(state, auth),
    fields(service.name = "post_service", service.operation = "delete_post", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn delete_post(
    state: Arc<AppState>,
    auth: AuthContext,
    slug: String,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let post = owned_post(pool, &slug, &auth).await?;
    post_repository::delete_post(pool, post.id)
        .await
        .map_err(internal_error("Error deleting post"))?;
    info!("User {} deleted post {}", auth.user_id, post.id);
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Idempotent: a second like by the same user changes nothing.
pub async fn like_post(
    state: Arc<AppState>,
    auth: AuthContext,
    key: String,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let post = existing_post_by_id(pool, &key).await?;
    post_repository::add_like(pool, auth.user_id, post.id)
        .await
        .map_err(internal_error("Error liking post"))?;
    Ok(status_response("liked"))
}

pub async fn share_post(
    state: Arc<AppState>,
    auth: AuthContext,
    key: String,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let post = existing_post_by_id(pool, &key).await?;
    post_repository::add_share(pool, auth.user_id, post.id)
        .await
        .map_err(internal_error("Error sharing post"))?;
    Ok(status_response("shared"))
}

/// Comments of a post, newest first. An unknown post simply has no comments.
pub async fn list_comments(
    state: Arc<AppState>,
    key: String,
    query: PaginationQuery,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let post_id = parse_post_id(&key)?;
    let count = post_repository::count_comments(pool, post_id)
        .await
        .map_err(internal_error("Error counting comments"))?;
    let window = PageWindow::resolve(query.page, query.page_size, count)?;
    let comments = post_repository::list_comments(pool, post_id, window.limit(), window.offset())
        .await
        .map_err(internal_error("Error listing comments"))?;
    Ok((StatusCode::OK, Json(CommentPage::new(window, comments))).into_response())
}

#[tracing::instrument(
    skip(state, auth, request),
    fields(service.name = "post_service", service.operation = "create_comment", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn create_comment(
    state: Arc<AppState>,
    auth: AuthContext,
    key: String,
    request: CommentRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "CommentRequest"))?;
    let pool = &state.db_pool;
    let post = existing_post_by_id(pool, &key).await?;
    let comment = post_repository::create_comment(pool, auth.user_id, post.id, &request.text)
        .await
        .map_err(internal_error("Error creating comment"))?;
    Ok((StatusCode::CREATED, Json(CommentResponse::from(comment))).into_response())
}

/// Case-insensitive match on title or content. No query lists everything.
#[tracing::instrument(
    skip(state, query),
    fields(service.name = "post_service", service.operation = "search_posts")
)]
pub async fn search_posts(state: Arc<AppState>, query: SearchQuery) -> Result<Response, AppError> {
    let paging = query.pagination();
    let term = query.q.as_deref().map(str::trim).unwrap_or_default();
    if term.is_empty() {
        return list_posts(state, paging).await;
    }

    let pool = &state.db_pool;
    let count = post_repository::count_search_posts(pool, term)
        .await
        .map_err(internal_error("Error counting search results"))?;
    let window = PageWindow::resolve(paging.page, paging.page_size, count)?;
    let posts = post_repository::search_posts(pool, term, window.limit(), window.offset()).await;
    paged_posts(window, posts)
}

pub async fn user_posts(
    state: Arc<AppState>,
    username: String,
    query: PaginationQuery,
) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let author = users_repository::get_user_by_username(pool, &username)
        .await
        .map_err(internal_error("Error reading user"))?
        .ok_or_else(|| AppError::new(ErrorType::NotFound, "User not found."))?;

    let count = post_repository::count_posts_by_author(pool, author.id)
        .await
        .map_err(internal_error("Error counting posts"))?;
    let window = PageWindow::resolve(query.page, query.page_size, count)?;
    let posts =
        post_repository::list_posts_by_author(pool, author.id, window.limit(), window.offset())
            .await;
    paged_posts(window, posts)
}

fn status_response(status: &str) -> Response {
    (
        StatusCode::OK,
        Json(StatusResponse {
            status: status.to_string(),
        }),
    )
        .into_response()
}
