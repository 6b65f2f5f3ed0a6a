use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Users {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub google_id: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Users {
    /// "first last", or the username when both names are blank.
    pub fn display_name(&self) -> String {
        let full_name = format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string();
        if full_name.is_empty() {
            self.username.clone()
        } else {
            full_name
        }
    }
}

// Fields accepted when a new account row is inserted.
#[derive(Debug, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_email_verified: bool,
    pub google_id: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub image: Option<String>,
    pub bio: String,
}
