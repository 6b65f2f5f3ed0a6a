use axum::http::{Method, StatusCode};
use fifth_social::db::repo::{auth_repository, users_repository};
use serde_json::json;

mod common {
    pub use crate::helpers::*;
}

#[tokio::test]
async fn test_register_sends_verification_email() {
    let app = common::setup_test_app().await;
    let username = common::get_test_username();
    let email = format!("{}@Example.COM", username);

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": username, "email": email, "password": common::TEST_PASSWORD})),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], format!("{}@example.com", username));

    let sent = app.emails.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Verify Your Email Address");
    let token = common::verification_token(&app, &format!("{}@example.com", username)).await;
    assert!(sent[0].text.contains(&format!("/verify-email?token={token}")));

    let user = users_repository::get_user_by_username(&app.state.db_pool, &username)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_email_verified);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_invalid_input() {
    let app = common::setup_test_app().await;
    let (username, email) = common::register_user(&app).await;

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": username, "email": "other@example.com", "password": common::TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["debugMessage"], "A user with that username already exists.");

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": "someone_else", "email": email, "password": common::TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": "bad name!", "email": "not-an-email", "password": "short"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["subErrors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_login_requires_verified_email() {
    let app = common::setup_test_app().await;
    let (_, email) = common::register_user(&app).await;

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/login/",
        Some(json!({"email": email, "password": common::TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["debugMessage"]
        .as_str()
        .unwrap()
        .starts_with("Please verify your email"));
}

#[tokio::test]
async fn test_verify_email_then_login() {
    let app = common::setup_test_app().await;
    let (username, email) = common::register_user(&app).await;
    let token = common::verification_token(&app, &email).await;

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/verify-email/",
        Some(json!({"token": token})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email verified successfully! You can now log in.");

    // A consumed token on a verified account is not an error.
    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/verify-email/",
        Some(json!({"token": token})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = common::login(&app, &email).await;
    assert!(body["access"].as_str().is_some());
    assert!(body["refresh"].as_str().is_some());
    assert_eq!(body["user"]["username"], username);
    assert_eq!(body["user"]["is_email_verified"], true);

    // Username works as the identifier too.
    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/login/",
        Some(json!({"username": username, "password": common::TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_verify_email_rejects_unknown_and_malformed_tokens() {
    let app = common::setup_test_app().await;

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/verify-email/",
        Some(json!({"token": "not-a-uuid"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/verify-email/",
        Some(json!({"token": uuid::Uuid::new_v4().to_string()})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_resend_verification() {
    let app = common::setup_test_app().await;
    let (_, email) = common::register_user(&app).await;
    let first = common::verification_token(&app, &email).await;

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/resend-verification/",
        Some(json!({"email": email})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.emails.sent().await.len(), 2);
    assert_ne!(common::verification_token(&app, &email).await, first);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/resend-verification/",
        Some(json!({"email": "nobody@example.com"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_registration_survives_email_failure() {
    let app = common::setup_test_app().await;
    app.emails.set_failing(true).await;

    let (_, email) = common::register_user(&app).await;

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/resend-verification/",
        Some(json!({"email": email})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = common::setup_test_app().await;
    let (username, _, _) = common::create_verified_user(&app).await;

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/login/",
        Some(json!({"username": username, "password": "WrongPassword!"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/login/",
        Some(json!({"email": "ghost@example.com", "password": "WrongPassword!"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/login/",
        Some(json!({"email": "ghost@example.com"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let app = common::setup_test_app().await;
    let (_, access, refresh) = common::create_verified_user(&app).await;

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/token/refresh/",
        Some(json!({"refresh": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].as_str().is_some());

    // An access token is not a refresh token.
    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/token/refresh/",
        Some(json!({"refresh": access})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/logout/",
        Some(json!({"refresh": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Logout successful");

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/token/refresh/",
        Some(json!({"refresh": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/logout/",
        Some(json!({"refresh": refresh})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_refresh_tokens_are_purged() {
    let app = common::setup_test_app().await;
    common::create_verified_user(&app).await;

    let far_future = chrono::Utc::now() + chrono::Duration::days(365);
    let removed = auth_repository::delete_expired_refresh_tokens(&app.state.db_pool, far_future)
        .await
        .unwrap();
    assert_eq!(removed, 1);
}

#[tokio::test]
async fn test_profile_requires_authentication() {
    let app = common::setup_test_app().await;

    let (status, _) =
        common::call(&app, Method::GET, "/api/account/profile/", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = common::call(
        &app,
        Method::GET,
        "/api/account/profile/",
        None,
        Some("not-a-jwt"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_get_and_update_profile() {
    let app = common::setup_test_app().await;
    let (username, access, refresh) = common::create_verified_user(&app).await;

    // Refresh tokens do not authenticate requests.
    let (status, _) =
        common::call(&app, Method::GET, "/api/account/profile/", None, Some(&refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        common::call(&app, Method::GET, "/api/account/profile/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], username);
    assert_eq!(body["profile"]["bio"], "");
    assert!(body["profile"]["image"].is_null());

    let (status, body) = common::call(
        &app,
        Method::PATCH,
        "/api/account/profile/",
        Some(json!({"profile": {"bio": "Hello there", "image": "https://cdn.example.com/me.png"}})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], username);
    assert_eq!(body["profile"]["bio"], "Hello there");
    assert_eq!(body["profile"]["image"], "https://cdn.example.com/me.png");

    let new_username = common::get_test_username();
    let (status, body) = common::call(
        &app,
        Method::PUT,
        "/api/account/profile/",
        Some(json!({"username": new_username, "profile": {"image": ""}})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], new_username);
    assert_eq!(body["profile"]["bio"], "Hello there");
    assert!(body["profile"]["image"].is_null());

    let (status, _) = common::call(
        &app,
        Method::PATCH,
        "/api/account/profile/",
        Some(json!({"profile": {"image": "ftp://nope"}})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_profile_rejects_taken_username() {
    let app = common::setup_test_app().await;
    let (taken, _, _) = common::create_verified_user(&app).await;
    let (_, access, _) = common::create_verified_user(&app).await;

    let (status, _) = common::call(
        &app,
        Method::PATCH,
        "/api/account/profile/",
        Some(json!({"username": taken})),
        Some(&access),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_google_sign_in_creates_then_links() {
    let app = common::setup_test_app_with_google(common::google_identity("grace@example.com")).await;

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/auth/google/",
        Some(json!({"token": "forged"})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["debugMessage"]
        .as_str()
        .unwrap()
        .starts_with("Invalid Google token"));

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/auth/google/",
        Some(json!({"token": common::GOOGLE_TEST_TOKEN})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "grace");
    assert_eq!(body["user"]["first_name"], "Grace");
    assert_eq!(body["user"]["is_email_verified"], true);

    // Signing in again reuses the same account.
    let (status, again) = common::call(
        &app,
        Method::POST,
        "/api/account/auth/google/",
        Some(json!({"token": common::GOOGLE_TEST_TOKEN})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["user"]["id"], body["user"]["id"]);
}

#[tokio::test]
async fn test_google_sign_in_links_existing_account() {
    let username = common::get_test_username();
    let email = format!("{}@example.com", username);
    let app = common::setup_test_app_with_google(common::google_identity(&email)).await;

    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": username, "email": email, "password": common::TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/auth/google/",
        Some(json!({"token": common::GOOGLE_TEST_TOKEN})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], username);
    assert_eq!(body["user"]["is_email_verified"], true);

    let user = users_repository::get_user_by_email(&app.state.db_pool, &email)
        .await
        .unwrap()
        .unwrap();
    assert!(user.google_id.is_some());
}

#[tokio::test]
async fn test_google_usernames_get_numeric_suffix() {
    let app = common::setup_test_app_with_google(common::google_identity("grace@example.com")).await;

    // Someone already owns the plain username.
    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": "grace", "email": "grace.other@example.com", "password": common::TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/auth/google/",
        Some(json!({"token": common::GOOGLE_TEST_TOKEN})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "grace1");
}

#[tokio::test]
async fn test_verify_email_with_expired_token() {
    let app = common::setup_test_app().await;
    let (_, email) = common::register_user(&app).await;
    let token = common::verification_token(&app, &email).await;

    sqlx::query("UPDATE email_verification_tokens SET expires_at = ? WHERE token = ?")
        .bind(chrono::Utc::now() - chrono::Duration::hours(1))
        .bind(&token)
        .execute(&app.state.db_pool)
        .await
        .unwrap();

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/verify-email/",
        Some(json!({"token": token})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["debugMessage"],
        "Verification token has expired. Please request a new one."
    );

    let user = users_repository::get_user_by_email(&app.state.db_pool, &email)
        .await
        .unwrap()
        .unwrap();
    assert!(!user.is_email_verified);
}

#[tokio::test]
async fn test_resend_verification_for_verified_account() {
    let app = common::setup_test_app().await;
    let (username, _, _) = common::create_verified_user(&app).await;
    let email = format!("{}@example.com", username);
    let sent_before = app.emails.sent().await.len();

    let (status, body) = common::call(
        &app,
        Method::POST,
        "/api/account/resend-verification/",
        Some(json!({"email": email})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email is already verified. You can log in now.");
    assert_eq!(app.emails.sent().await.len(), sent_before);
}

#[tokio::test]
async fn test_access_token_of_inactive_user_is_rejected() {
    let app = common::setup_test_app().await;
    let (username, access, _) = common::create_verified_user(&app).await;

    sqlx::query("UPDATE users SET is_active = 0 WHERE username = ?")
        .bind(&username)
        .execute(&app.state.db_pool)
        .await
        .unwrap();

    let (status, body) =
        common::call(&app, Method::GET, "/api/account/profile/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["debugMessage"], "User is inactive");
}

#[tokio::test]
async fn test_access_token_of_deleted_user_is_rejected() {
    let app = common::setup_test_app().await;
    let (username, access, _) = common::create_verified_user(&app).await;

    sqlx::query("DELETE FROM users WHERE username = ?")
        .bind(&username)
        .execute(&app.state.db_pool)
        .await
        .unwrap();

    let (status, body) =
        common::call(&app, Method::GET, "/api/account/profile/", None, Some(&access)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["debugMessage"], "User not found");
}

#[tokio::test]
async fn test_access_token_cannot_refresh_or_logout() {
    let app = common::setup_test_app().await;
    let (_, access, _) = common::create_verified_user(&app).await;

    for uri in ["/api/account/token/refresh/", "/api/account/logout/"] {
        let (status, body) = common::call(
            &app,
            Method::POST,
            uri,
            Some(json!({"refresh": access})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["debugMessage"], "Token is invalid or expired");
    }
}

#[tokio::test]
async fn test_failed_registration_leaves_no_partial_account() {
    let app = common::setup_test_app().await;
    sqlx::query("DROP TABLE user_profiles")
        .execute(&app.state.db_pool)
        .await
        .unwrap();

    let register = json!({
        "username": "orphan",
        "email": "orphan@example.com",
        "password": common::TEST_PASSWORD
    });
    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(register.clone()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = 'orphan'")
        .fetch_one(&app.state.db_pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
    let (credentials,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_login_credentials")
        .fetch_one(&app.state.db_pool)
        .await
        .unwrap();
    assert_eq!(credentials, 0);

    // The username is still free, so a retry fails the same way rather than as a duplicate.
    let (status, _) = common::call(
        &app,
        Method::POST,
        "/api/account/register/",
        Some(register),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
