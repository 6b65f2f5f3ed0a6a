use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Outstanding refresh token, tracked by its JWT id.
#[derive(Debug, FromRow)]
pub struct RefreshTokens {
    pub id: i64,
    pub user_id: i64,
    pub jti: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl RefreshTokens {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at > now
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct EmailVerificationToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
}

impl EmailVerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
