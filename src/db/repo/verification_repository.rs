use crate::db::entity::auth::EmailVerificationToken;
use chrono::{DateTime, Utc};
use sqlx::{Error, SqlitePool};

const TOKEN_COLUMNS: &str = "id, user_id, token, created_at, expires_at, is_used";

#[tracing::instrument(
    skip(pool, token),
    fields(db.system = "sqlite", db.operation = "INSERT", db.table = "email_verification_tokens")
)]
pub async fn create_token(
    pool: &SqlitePool,
    user_id: i64,
    token: &str,
    expires_at: DateTime<Utc>,
) -> Result<EmailVerificationToken, Error> {
    let query = format!(
        "INSERT INTO email_verification_tokens (user_id, token, created_at, expires_at) \
         VALUES (?, ?, ?, ?) RETURNING {TOKEN_COLUMNS}"
    );
    sqlx::query_as::<_, EmailVerificationToken>(&query)
        .bind(user_id)
        .bind(token)
        .bind(Utc::now())
        .bind(expires_at)
        .fetch_one(pool)
        .await
}

/// Latest token of the user that has not been consumed yet.
pub async fn get_unused_token_for_user(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<EmailVerificationToken>, Error> {
    let query = format!(
        "SELECT {TOKEN_COLUMNS} FROM email_verification_tokens \
         WHERE user_id = ? AND is_used = 0 ORDER BY id DESC LIMIT 1"
    );
    sqlx::query_as::<_, EmailVerificationToken>(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_unused_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<EmailVerificationToken>, Error> {
    let query =
        format!("SELECT {TOKEN_COLUMNS} FROM email_verification_tokens WHERE token = ? AND is_used = 0");
    sqlx::query_as::<_, EmailVerificationToken>(&query)
        .bind(token)
        .fetch_optional(pool)
        .await
}

pub async fn get_token(
    pool: &SqlitePool,
    token: &str,
) -> Result<Option<EmailVerificationToken>, Error> {
    let query = format!("SELECT {TOKEN_COLUMNS} FROM email_verification_tokens WHERE token = ?");
    sqlx::query_as::<_, EmailVerificationToken>(&query)
        .bind(token)
        .fetch_optional(pool)
        .await
}

pub async fn mark_token_used(pool: &SqlitePool, token_id: i64) -> Result<(), Error> {
    sqlx::query("UPDATE email_verification_tokens SET is_used = 1 WHERE id = ?")
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_token(pool: &SqlitePool, token_id: i64) -> Result<(), Error> {
    sqlx::query("DELETE FROM email_verification_tokens WHERE id = ?")
        .bind(token_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "DELETE", db.table = "email_verification_tokens")
)]
pub async fn delete_unused_tokens_for_user(pool: &SqlitePool, user_id: i64) -> Result<u64, Error> {
    let result =
        sqlx::query("DELETE FROM email_verification_tokens WHERE user_id = ? AND is_used = 0")
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}
