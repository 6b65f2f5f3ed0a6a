use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use bytes::{Bytes, BytesMut};
use fifth_social::api::routes::build_app;
use fifth_social::config::settings::Settings;
use fifth_social::db::pool;
use fifth_social::db::repo::{users_repository, verification_repository};
use fifth_social::service::email::MemoryEmailSender;
use fifth_social::service::google::{GoogleAuthError, GoogleIdentity, GoogleTokenVerifier};
use fifth_social::AppState;
use http_body_util::BodyExt;
use nanoid::nanoid;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::normalize_path::NormalizePath;

pub const TEST_PASSWORD: &str = "SecurePassword123!";
pub const GOOGLE_TEST_TOKEN: &str = "google-test-token";

/// Accepts only `GOOGLE_TEST_TOKEN` and answers with a fixed identity.
pub struct StubGoogleVerifier {
    pub identity: GoogleIdentity,
}

#[async_trait]
impl GoogleTokenVerifier for StubGoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        if id_token == GOOGLE_TEST_TOKEN {
            Ok(self.identity.clone())
        } else {
            Err(GoogleAuthError::InvalidToken {
                message: "Wrong number of segments".to_string(),
            })
        }
    }
}

pub fn google_identity(email: &str) -> GoogleIdentity {
    GoogleIdentity {
        google_id: format!("google-{}", nanoid!(8)),
        email: email.to_string(),
        given_name: "Grace".to_string(),
        family_name: "Hopper".to_string(),
        email_verified: true,
    }
}

pub struct TestApp {
    pub app: NormalizePath<Router>,
    pub state: Arc<AppState>,
    pub emails: MemoryEmailSender,
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_google(google_identity("grace@example.com")).await
}

pub async fn setup_test_app_with_google(identity: GoogleIdentity) -> TestApp {
    // Development profile defaults, no environment involved.
    let settings = Settings::from_lookup(|key| match key {
        "SECRET_KEY" => Some("test-secret-key".to_string()),
        "HMAC_SECRET" => Some("test-hmac-secret".to_string()),
        _ => None,
    })
    .expect("test settings");

    let db_pool = pool::connect_in_memory()
        .await
        .expect("in-memory database");
    pool::run_migrations(&db_pool).await.expect("migrations");

    let emails = MemoryEmailSender::new();
    let state = Arc::new(
        AppState::new(
            db_pool,
            settings,
            Arc::new(emails.clone()),
            Arc::new(StubGoogleVerifier { identity }),
        )
        .expect("app state"),
    );

    TestApp {
        app: build_app(state.clone()),
        state,
        emails,
    }
}

// Helper to make API requests in tests
pub async fn make_request(
    app: &TestApp,
    method: Method,
    uri: &str,
    json_body: Option<Value>,
    access_token: Option<&str>,
) -> Response {
    let mut request_builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = access_token {
        request_builder = request_builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match json_body {
        Some(body) => request_builder.body(Body::from(body.to_string())).unwrap(),
        None => request_builder.body(Body::empty()).unwrap(),
    };

    app.app.clone().oneshot(request).await.unwrap()
}

// Helper function to convert axum response body to bytes
pub async fn body_to_bytes(body: Body) -> Bytes {
    let mut body = body;
    let mut bytes = BytesMut::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.unwrap();
        if let Some(data) = frame.data_ref() {
            bytes.extend_from_slice(data);
        }
    }
    bytes.freeze()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = body_to_bytes(response.into_body()).await;
    serde_json::from_slice(&bytes).unwrap()
}

/// Sends the request and returns status and JSON body (`Null` for empty bodies).
pub async fn call(
    app: &TestApp,
    method: Method,
    uri: &str,
    json_body: Option<Value>,
    access_token: Option<&str>,
) -> (StatusCode, Value) {
    let response = make_request(app, method, uri, json_body, access_token).await;
    let status = response.status();
    let bytes = body_to_bytes(response.into_body()).await;
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    (status, serde_json::from_slice(&bytes).unwrap())
}

// Helper to get a unique test username
pub fn get_test_username() -> String {
    format!("user_{}", nanoid!(8))
}

/// Registers through the API and returns the username and email.
pub async fn register_user(app: &TestApp) -> (String, String) {
    let username = get_test_username();
    let email = format!("{}@example.com", username);
    let (status, _) = call(
        app,
        Method::POST,
        "/api/account/register/",
        Some(json!({"username": username, "email": email, "password": TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (username, email)
}

/// Latest unused verification token of the account, read straight from the database.
pub async fn verification_token(app: &TestApp, email: &str) -> String {
    let user = users_repository::get_user_by_email(&app.state.db_pool, email)
        .await
        .unwrap()
        .expect("registered user");
    verification_repository::get_unused_token_for_user(&app.state.db_pool, user.id)
        .await
        .unwrap()
        .expect("verification token")
        .token
}

pub async fn login(app: &TestApp, email: &str) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/account/login/",
        Some(json!({"email": email, "password": TEST_PASSWORD})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body
}

/// Registers, verifies and logs in a fresh user. Returns (username, access token, refresh token).
pub async fn create_verified_user(app: &TestApp) -> (String, String, String) {
    let (username, email) = register_user(app).await;
    let token = verification_token(app, &email).await;
    let (status, _) = call(
        app,
        Method::POST,
        "/api/account/verify-email/",
        Some(json!({"token": token})),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let body = login(app, &email).await;
    (
        username,
        body["access"].as_str().unwrap().to_string(),
        body["refresh"].as_str().unwrap().to_string(),
    )
}
