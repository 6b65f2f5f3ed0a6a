use crate::api::model::account::{
    GoogleAuthRequest, LoginRequest, LoginResponse, ProfileResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, RegisterResponse, ResendVerificationRequest,
    UpdateProfileRequest, VerifyEmailRequest,
};
use crate::api::model::common::MessageResponse;
use crate::config::app_config::AppState;
use crate::error::error_model::{ApiError, AppError};
use crate::middleware::auth::AuthContext;
use crate::service::{auth_service, user_service};
use axum::extract::State;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use std::sync::Arc;

/// Account routes that do not need a token.
pub fn public_account_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/verify-email", post(verify_email_handler))
        .route("/resend-verification", post(resend_verification_handler))
        .route("/login", post(login_handler))
        .route("/token/refresh", post(refresh_token_handler))
        .route("/logout", post(logout_handler))
        .route("/auth/google", post(google_auth_handler))
}

/// Account routes behind `require_auth`.
pub fn protected_account_routes() -> Router<Arc<AppState>> {
    Router::new().route(
        "/profile",
        get(get_profile_handler)
            .put(update_profile_handler)
            .patch(update_profile_handler),
    )
}

/// Register a new account
///
/// Creates an unverified account and emails a verification link.
#[utoipa::path(
    post,
    path = "/api/account/register/",
    tag = "Account",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Username or email already taken", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    auth_service::register(state, request).await
}

/// Verify email address
#[utoipa::path(
    post,
    path = "/api/account/verify-email/",
    tag = "Account",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified, or already verified", body = MessageResponse),
        (status = 400, description = "Token invalid or expired", body = ApiError),
        (status = 422, description = "Token is not a UUID", body = ApiError),
    )
)]
pub async fn verify_email_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Response, AppError> {
    auth_service::verify_email(state, request).await
}

/// Resend the verification email
#[utoipa::path(
    post,
    path = "/api/account/resend-verification/",
    tag = "Account",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Email sent, or already verified", body = MessageResponse),
        (status = 404, description = "No account with this email", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
        (status = 500, description = "Email could not be sent", body = ApiError),
    )
)]
pub async fn resend_verification_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResendVerificationRequest>,
) -> Result<Response, AppError> {
    auth_service::resend_verification(state, request).await
}

/// Log in
///
/// Authenticate with email (or username) and password.
#[utoipa::path(
    post,
    path = "/api/account/login/",
    tag = "Account",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = ApiError),
        (status = 401, description = "Invalid credentials or unverified email", body = ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    auth_service::login(state, request).await
}

/// Refresh the access token
#[utoipa::path(
    post,
    path = "/api/account/token/refresh/",
    tag = "Account",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn refresh_token_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Response, AppError> {
    auth_service::refresh(state, request).await
}

/// Log out
///
/// Revokes the given refresh token.
#[utoipa::path(
    post,
    path = "/api/account/logout/",
    tag = "Account",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Refresh token invalid, expired or revoked", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RefreshRequest>,
) -> Result<Response, AppError> {
    auth_service::logout(state, request).await
}

/// Sign in with Google
#[utoipa::path(
    post,
    path = "/api/account/auth/google/",
    tag = "Account",
    request_body = GoogleAuthRequest,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 400, description = "Google token rejected", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn google_auth_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GoogleAuthRequest>,
) -> Result<Response, AppError> {
    auth_service::google_auth(state, request).await
}

/// Get own profile
#[utoipa::path(
    get,
    path = "/api/account/profile/",
    tag = "Account",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current profile", body = ProfileResponse),
        (status = 401, description = "Unauthorized error", body = ApiError),
    )
)]
pub async fn get_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Response, AppError> {
    user_service::get_profile(state, auth).await
}

/// Update own profile
///
/// PUT and PATCH both apply only the fields present in the body.
#[utoipa::path(
    patch,
    path = "/api/account/profile/",
    tag = "Account",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ProfileResponse),
        (status = 400, description = "Username or email already taken", body = ApiError),
        (status = 401, description = "Unauthorized error", body = ApiError),
        (status = 422, description = "Unprocessable request", body = ApiError),
    )
)]
pub async fn update_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Response, AppError> {
    user_service::update_profile(state, auth, request).await
}
