use crate::db::entity::user_login_credentials::UserLoginCredentials;
use chrono::Utc;
use sqlx::{Error, SqliteConnection, SqlitePool};

pub async fn create_user_login_credentials(
    conn: &mut SqliteConnection,
    user_id: i64,
    password_hash: &str,
    password_hmac: &[u8],
) -> Result<UserLoginCredentials, Error> {
    let now = Utc::now();
    sqlx::query_as::<_, UserLoginCredentials>(
        r#"
        INSERT INTO user_login_credentials (user_id, password_hash, password_hmac, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING id, user_id, password_hash, password_hmac, created_at, updated_at
        "#,
    )
    .bind(user_id)
    .bind(password_hash)
    .bind(password_hmac)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn get_user_login_credentials_by_user_id(
    pool: &SqlitePool,
    user_id: i64,
) -> Result<Option<UserLoginCredentials>, Error> {
    sqlx::query_as::<_, UserLoginCredentials>(
        r#"
        SELECT id, user_id, password_hash, password_hmac, created_at, updated_at
        FROM user_login_credentials
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}
