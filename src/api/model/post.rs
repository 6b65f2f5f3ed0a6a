use crate::api::model::common::{PageWindow, PaginationQuery};
use crate::db::entity::post::{CommentWithUser, PostWithStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank").with_message("This field may not be blank.".into()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PostRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Ensure this field has no more than 200 characters.")
    )]
    #[schema(example = "My first post")]
    pub title: String,
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Hello, world!")]
    pub content: String,
    #[schema(example = "https://res.cloudinary.com/demo/image/upload/sample.jpg")]
    pub image: Option<String>,
}

/// Partial post update; absent fields are left alone.
#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PatchPostRequest {
    #[validate(
        custom(function = "validate_not_blank"),
        length(max = 200, message = "Ensure this field has no more than 200 characters.")
    )]
    pub title: Option<String>,
    #[validate(custom(function = "validate_not_blank"))]
    pub content: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostResponse {
    pub id: i64,
    #[schema(example = "my-first-post")]
    pub slug: String,
    /// Author username
    #[schema(example = "jdoe")]
    pub author: String,
    pub author_email: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
}

impl From<PostWithStats> for PostResponse {
    fn from(post: PostWithStats) -> Self {
        PostResponse {
            id: post.id,
            slug: post.slug,
            author: post.author_username,
            author_email: post.author_email,
            title: post.title,
            content: post.content,
            image: post.image,
            created_at: post.created_at,
            updated_at: post.updated_at,
            likes_count: post.likes_count,
            comments_count: post.comments_count,
            shares_count: post.shares_count,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CommentRequest {
    #[validate(custom(function = "validate_not_blank"))]
    #[schema(example = "Nice post!")]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentResponse {
    pub id: i64,
    /// Commenter username
    pub user: String,
    pub user_email: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentWithUser> for CommentResponse {
    fn from(comment: CommentWithUser) -> Self {
        CommentResponse {
            id: comment.id,
            user: comment.username,
            user_email: comment.user_email,
            text: comment.text,
            created_at: comment.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    #[schema(example = "liked")]
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PostPage {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub results: Vec<PostResponse>,
}

impl PostPage {
    pub fn new(window: PageWindow, posts: Vec<PostWithStats>) -> Self {
        PostPage {
            count: window.count,
            page: window.page,
            page_size: window.page_size,
            total_pages: window.total_pages,
            results: posts.into_iter().map(PostResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CommentPage {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
    pub results: Vec<CommentResponse>,
}

impl CommentPage {
    pub fn new(window: PageWindow, comments: Vec<CommentWithUser>) -> Self {
        CommentPage {
            count: window.count,
            page: window.page,
            page_size: window.page_size,
            total_pages: window.total_pages,
            results: comments.into_iter().map(CommentResponse::from).collect(),
        }
    }
}

/// Search query. Kept flat so numeric paging params parse from the query string.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Text to look for in titles and content
    pub q: Option<String>,
    #[param(default = 1)]
    pub page: Option<i64>,
    #[param(default = 10)]
    pub page_size: Option<i64>,
}

impl SearchQuery {
    pub fn pagination(&self) -> PaginationQuery {
        let defaults = PaginationQuery::default();
        PaginationQuery {
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        }
    }
}
