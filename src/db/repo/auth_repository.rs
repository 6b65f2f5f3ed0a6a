use crate::db::entity::auth::RefreshTokens;
use chrono::{DateTime, Utc};
use sqlx::{Error, SqlitePool};

/// Records a newly issued refresh token so it can later be checked and revoked.
///
/// # Errors
///
/// Returns an error if the insert fails (for example on a duplicate `jti`).
#[tracing::instrument(
    skip(pool, jti),
    fields(db.system = "sqlite", db.operation = "INSERT", db.table = "refresh_tokens")
)]
pub async fn add_refresh_token(
    pool: &SqlitePool,
    user_id: i64,
    jti: &str,
    expires_at: DateTime<Utc>,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO refresh_tokens (user_id, jti, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(jti)
    .bind(Utc::now())
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

#[tracing::instrument(
    skip(pool, jti),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "refresh_tokens")
)]
pub async fn get_refresh_token_by_jti(
    pool: &SqlitePool,
    jti: &str,
) -> Result<Option<RefreshTokens>, Error> {
    sqlx::query_as::<_, RefreshTokens>(
        "SELECT id, user_id, jti, created_at, expires_at, revoked_at FROM refresh_tokens WHERE jti = ?",
    )
    .bind(jti)
    .fetch_optional(pool)
    .await
}

/// Revokes a single refresh token. Returns false when no active token matched.
#[tracing::instrument(
    skip(pool, jti),
    fields(db.system = "sqlite", db.operation = "UPDATE", db.table = "refresh_tokens")
)]
pub async fn revoke_refresh_token(pool: &SqlitePool, jti: &str) -> Result<bool, Error> {
    let result =
        sqlx::query("UPDATE refresh_tokens SET revoked_at = ? WHERE jti = ? AND revoked_at IS NULL")
            .bind(Utc::now())
            .bind(jti)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Drops refresh token rows that expired before `now`.
pub async fn delete_expired_refresh_tokens(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<u64, Error> {
    let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < ?")
        .bind(now)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
