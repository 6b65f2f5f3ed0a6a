use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Post joined with its author and interaction counts.
#[derive(Debug, Clone, FromRow)]
pub struct PostWithStats {
    pub id: i64,
    pub author_id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author_username: String,
    pub author_email: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentWithUser {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub username: String,
    pub user_email: String,
}
