use crate::db::entity::user::{NewUser, UserProfile, Users};
use crate::db::repo::user_login_credentials_repository;
use chrono::Utc;
use sqlx::{Error, SqliteConnection, SqlitePool};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active, is_email_verified, \
     google_id, last_login, created_at, updated_at";

/// Creates a user together with its login credentials and an empty profile.
///
/// All three rows are written in one transaction, so a failure leaves no partial account
/// behind.
///
/// # Errors
///
/// Returns an `Error` if any insert fails, including unique violations on `username`,
/// `email` or `google_id`.
#[tracing::instrument(
    skip(pool, new_user, password_hash, password_hmac),
    fields(db.system = "sqlite", db.operation = "INSERT", db.table = "users")
)]
pub async fn create_account(
    pool: &SqlitePool,
    new_user: &NewUser,
    password_hash: &str,
    password_hmac: &[u8],
) -> Result<Users, Error> {
    let mut tx = pool.begin().await?;

    let user = create_user(&mut tx, new_user).await?;
    user_login_credentials_repository::create_user_login_credentials(
        &mut tx,
        user.id,
        password_hash,
        password_hmac,
    )
    .await?;
    create_profile(&mut tx, user.id).await?;

    tx.commit().await?;
    Ok(user)
}

/// Inserts a row into the `users` table and returns the stored record.
pub async fn create_user(conn: &mut SqliteConnection, new_user: &NewUser) -> Result<Users, Error> {
    let now = Utc::now();
    let query = format!(
        "INSERT INTO users (username, email, first_name, last_name, is_email_verified, google_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, Users>(&query)
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.is_email_verified)
        .bind(&new_user.google_id)
        .bind(now)
        .bind(now)
        .fetch_one(conn)
        .await
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "users")
)]
pub async fn get_user_by_id(pool: &SqlitePool, user_id: i64) -> Result<Option<Users>, Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
    sqlx::query_as::<_, Users>(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(
    skip(pool, email),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "users")
)]
pub async fn get_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Users>, Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
    sqlx::query_as::<_, Users>(&query)
        .bind(email)
        .fetch_optional(pool)
        .await
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "users")
)]
pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<Users>, Error> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?");
    sqlx::query_as::<_, Users>(&query)
        .bind(username)
        .fetch_optional(pool)
        .await
}

/// Returns true when another user (not `except_user_id`) already owns the username.
pub async fn username_taken(
    pool: &SqlitePool,
    username: &str,
    except_user_id: Option<i64>,
) -> Result<bool, Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE username = ? AND id <> COALESCE(?, -1)",
    )
    .bind(username)
    .bind(except_user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Returns true when another user (not `except_user_id`) already owns the email address.
pub async fn email_taken(
    pool: &SqlitePool,
    email: &str,
    except_user_id: Option<i64>,
) -> Result<bool, Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ? AND id <> COALESCE(?, -1)")
            .bind(email)
            .bind(except_user_id)
            .fetch_one(pool)
            .await?;
    Ok(count > 0)
}

#[tracing::instrument(
    skip(pool, email),
    fields(db.system = "sqlite", db.operation = "UPDATE", db.table = "users")
)]
pub async fn update_username_and_email(
    pool: &SqlitePool,
    user_id: i64,
    username: &str,
    email: &str,
) -> Result<Users, Error> {
    let query = format!(
        "UPDATE users SET username = ?, email = ?, updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, Users>(&query)
        .bind(username)
        .bind(email)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(pool)
        .await
}

#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "UPDATE", db.table = "users")
)]
pub async fn mark_email_verified(pool: &SqlitePool, user_id: i64) -> Result<(), Error> {
    sqlx::query("UPDATE users SET is_email_verified = 1, updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Links a Google account to an existing user, marks the email as verified and fills in
/// names that are still blank.
#[tracing::instrument(
    skip(pool, google_id),
    fields(db.system = "sqlite", db.operation = "UPDATE", db.table = "users")
)]
pub async fn link_google_account(
    pool: &SqlitePool,
    user_id: i64,
    google_id: &str,
    first_name: &str,
    last_name: &str,
) -> Result<Users, Error> {
    let query = format!(
        "UPDATE users SET google_id = ?, is_email_verified = 1, \
         first_name = CASE WHEN first_name = '' THEN ? ELSE first_name END, \
         last_name = CASE WHEN last_name = '' THEN ? ELSE last_name END, \
         updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, Users>(&query)
        .bind(google_id)
        .bind(first_name)
        .bind(last_name)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(pool)
        .await
}

pub async fn update_last_login(pool: &SqlitePool, user_id: i64) -> Result<(), Error> {
    sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

#[tracing::instrument(
    skip(conn),
    fields(db.system = "sqlite", db.operation = "INSERT", db.table = "user_profiles")
)]
pub async fn create_profile(conn: &mut SqliteConnection, user_id: i64) -> Result<UserProfile, Error> {
    sqlx::query_as::<_, UserProfile>(
        "INSERT INTO user_profiles (user_id) VALUES (?) RETURNING id, user_id, image, bio",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
}

/// Fetches the profile of a user, creating an empty one if the row is missing.
#[tracing::instrument(
    skip(pool),
    fields(db.system = "sqlite", db.operation = "SELECT", db.table = "user_profiles")
)]
pub async fn get_or_create_profile(pool: &SqlitePool, user_id: i64) -> Result<UserProfile, Error> {
    let profile = sqlx::query_as::<_, UserProfile>(
        "SELECT id, user_id, image, bio FROM user_profiles WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    match profile {
        Some(profile) => Ok(profile),
        None => create_profile(&mut *pool.acquire().await?, user_id).await,
    }
}

#[tracing::instrument(
    skip(pool, image, bio),
    fields(db.system = "sqlite", db.operation = "UPDATE", db.table = "user_profiles")
)]
pub async fn update_profile(
    pool: &SqlitePool,
    user_id: i64,
    image: Option<&str>,
    bio: &str,
) -> Result<UserProfile, Error> {
    sqlx::query_as::<_, UserProfile>(
        "UPDATE user_profiles SET image = ?, bio = ? WHERE user_id = ? RETURNING id, user_id, image, bio",
    )
    .bind(image)
    .bind(bio)
    .bind(user_id)
    .fetch_one(pool)
    .await
}
