use crate::db::entity::post::{CommentWithUser, Post, PostWithStats};
use chrono::Utc;
use sqlx::{Error, SqlitePool};

// Post columns joined with the author and interaction counters.
const POST_WITH_STATS: &str = "SELECT p.id, p.author_id, p.slug, p.title, p.content, p.image, \
     p.created_at, p.updated_at, u.username AS author_username, u.email AS author_email, \
     (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count, \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comments_count, \
     (SELECT COUNT(*) FROM shares s WHERE s.post_id = p.id) AS shares_count \
     FROM posts p JOIN users u ON u.id = p.author_id";

const NEWEST_FIRST: &str = "ORDER BY p.created_at DESC, p.id DESC";

const POST_COLUMNS: &str = "id, author_id, title, content, image, slug, created_at, updated_at";

const COMMENT_WITH_USER: &str = "SELECT c.id, c.post_id, c.user_id, c.text, c.created_at, \
     u.username, u.email AS user_email FROM comments c JOIN users u ON u.id = c.user_id";

/// Escapes `%`, `_` and `\` so user input is matched literally inside a `LIKE` pattern.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "posts")
)]
pub async fn list_posts(
    pool: &SqlitePool,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostWithStats>, Error> {
    let query = format!("{POST_WITH_STATS} {NEWEST_FIRST} LIMIT ? OFFSET ?");
    sqlx::query_as::<_, PostWithStats>(&query)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_posts(pool: &SqlitePool) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
}

/// Case-insensitive substring search over title and content.
///
/// SQLite's `LIKE` folds ASCII case only, which matches how slugs and most titles are written.
#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "posts")
)]
pub async fn search_posts(
    pool: &SqlitePool,
    term: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostWithStats>, Error> {
    let query = format!(
        "{POST_WITH_STATS} WHERE p.title LIKE ?1 ESCAPE '\\' OR p.content LIKE ?1 ESCAPE '\\' \
         {NEWEST_FIRST} LIMIT ?2 OFFSET ?3"
    );
    sqlx::query_as::<_, PostWithStats>(&query)
        .bind(like_pattern(term))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_search_posts(pool: &SqlitePool, term: &str) -> Result<i64, Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM posts WHERE title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\'",
    )
    .bind(like_pattern(term))
    .fetch_one(pool)
    .await
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "posts")
)]
pub async fn list_posts_by_author(
    pool: &SqlitePool,
    author_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<PostWithStats>, Error> {
    let query = format!("{POST_WITH_STATS} WHERE p.author_id = ? {NEWEST_FIRST} LIMIT ? OFFSET ?");
    sqlx::query_as::<_, PostWithStats>(&query)
        .bind(author_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_posts_by_author(pool: &SqlitePool, author_id: i64) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = ?")
        .bind(author_id)
        .fetch_one(pool)
        .await
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "posts")
)]
pub async fn get_post_by_slug(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<PostWithStats>, Error> {
    let query = format!("{POST_WITH_STATS} WHERE p.slug = ?");
    sqlx::query_as::<_, PostWithStats>(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await
}

pub async fn get_post_by_id(pool: &SqlitePool, post_id: i64) -> Result<Option<Post>, Error> {
    let query = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
    sqlx::query_as::<_, Post>(&query)
        .bind(post_id)
        .fetch_optional(pool)
        .await
}

pub async fn slug_exists(pool: &SqlitePool, slug: &str) -> Result<bool, Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Inserts a post with an already unique slug.
///
/// # Errors
///
/// Returns an error if the insert fails, including a unique violation on `slug` when a
/// concurrent request claimed it first.
#[tracing::instrument(
    skip(pool, title, content, image),
    fields(db.system = "sqlite", db.operation = "INSERT", db.table = "posts")
)]
pub async fn create_post(
    pool: &SqlitePool,
    author_id: i64,
    title: &str,
    content: &str,
    image: Option<&str>,
    slug: &str,
) -> Result<Post, Error> {
    let now = Utc::now();
    let query = format!(
        "INSERT INTO posts (author_id, title, content, image, slug, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING {POST_COLUMNS}"
    );
    sqlx::query_as::<_, Post>(&query)
        .bind(author_id)
        .bind(title)
        .bind(content)
        .bind(image)
        .bind(slug)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
}

/// Overwrites the editable fields of a post. The slug never changes.
#[tracing::instrument(
    skip(pool, title, content, image),
    fields(db.system = "sqlite", db.operation = "UPDATE", db.table = "posts")
)]
pub async fn update_post(
    pool: &SqlitePool,
    post_id: i64,
    title: &str,
    content: &str,
    image: Option<&str>,
) -> Result<Post, Error> {
    let query = format!(
        "UPDATE posts SET title = ?, content = ?, image = ?, updated_at = ? WHERE id = ? \
         RETURNING {POST_COLUMNS}"
    );
    sqlx::query_as::<_, Post>(&query)
        .bind(title)
        .bind(content)
        .bind(image)
        .bind(Utc::now())
        .bind(post_id)
        .fetch_one(pool)
        .await
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "DELETE", db.table = "posts")
)]
pub async fn delete_post(pool: &SqlitePool, post_id: i64) -> Result<(), Error> {
    sqlx::query("DELETE FROM posts WHERE id = ?")
        .bind(post_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Records a like. Liking the same post twice is a no-op; returns whether a row was added.
pub async fn add_like(pool: &SqlitePool, user_id: i64, post_id: i64) -> Result<bool, Error> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO likes (user_id, post_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn add_share(pool: &SqlitePool, user_id: i64, post_id: i64) -> Result<(), Error> {
    sqlx::query("INSERT INTO shares (user_id, post_id, created_at) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(post_id)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "comments")
)]
pub async fn list_comments(
    pool: &SqlitePool,
    post_id: i64,
    limit: i64,
    offset: i64,
) -> Result<Vec<CommentWithUser>, Error> {
    let query = format!(
        "{COMMENT_WITH_USER} WHERE c.post_id = ? ORDER BY c.created_at DESC, c.id DESC LIMIT ? OFFSET ?"
    );
    sqlx::query_as::<_, CommentWithUser>(&query)
        .bind(post_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count_comments(pool: &SqlitePool, post_id: i64) -> Result<i64, Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
        .bind(post_id)
        .fetch_one(pool)
        .await
}

#[tracing::instrument(
    skip(pool, text),
    fields(db.system = "sqlite", db.operation = "INSERT", db.table = "comments")
)]
pub async fn create_comment(
    pool: &SqlitePool,
    user_id: i64,
    post_id: i64,
    text: &str,
) -> Result<CommentWithUser, Error> {
    let comment_id: i64 = sqlx::query_scalar(
        "INSERT INTO comments (user_id, post_id, text, created_at) VALUES (?, ?, ?, ?) RETURNING id",
    )
    .bind(user_id)
    .bind(post_id)
    .bind(text)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    let query = format!("{COMMENT_WITH_USER} WHERE c.id = ?");
    sqlx::query_as::<_, CommentWithUser>(&query)
        .bind(comment_id)
        .fetch_one(pool)
        .await
}
