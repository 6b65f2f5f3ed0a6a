use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
#[allow(dead_code)]
pub struct UserLoginCredentials {
    pub id: i64,
    pub user_id: i64,
    pub password_hash: String,
    pub password_hmac: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
