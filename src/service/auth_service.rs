use crate::api::model::account::{
    GoogleAuthRequest, LoginRequest, LoginResponse, LoginUser, RefreshRequest, RefreshResponse,
    RegisterRequest, RegisterResponse, ResendVerificationRequest, VerifyEmailRequest,
};
use crate::api::model::common::MessageResponse;
use crate::config::app_config::AppState;
use crate::db::entity::user::{NewUser, Users};
use crate::db::repo::{user_login_credentials_repository, users_repository, verification_repository};
use crate::error::error_model::{internal_error, AppError, ErrorType};
use crate::service::google::GoogleAuthError;
use crate::service::{email, token_service};
use crate::util::crypto_helper;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;
use validator::Validate;

const VERIFICATION_TOKEN_LIFETIME_HOURS: i64 = 24;
const GOOGLE_PASSWORD_LENGTH: usize = 12;

const INVALID_CREDENTIALS: &str = "Invalid email or password";
const ALREADY_VERIFIED_LOGIN: &str = "Email is already verified! You can now log in.";

/// Lower-cases the domain part of an address, leaving the local part untouched.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

/// Sends (or re-sends) the verification link for `user`.
///
/// An unused token that has not expired is reused; an expired one is replaced.
#[tracing::instrument(skip(state, user), fields(user.id = user.id))]
pub async fn send_verification_email(state: &AppState, user: &Users) -> Result<(), AppError> {
    let pool = &state.db_pool;
    let now = Utc::now();

    let existing = verification_repository::get_unused_token_for_user(pool, user.id)
        .await
        .map_err(internal_error("Error reading verification token"))?;

    let token = match existing {
        Some(token) if !token.is_expired(now) => token,
        stale => {
            if let Some(token) = stale {
                verification_repository::delete_token(pool, token.id)
                    .await
                    .map_err(internal_error("Error deleting expired verification token"))?;
            }
            verification_repository::create_token(
                pool,
                user.id,
                &Uuid::new_v4().to_string(),
                now + Duration::hours(VERIFICATION_TOKEN_LIFETIME_HOURS),
            )
            .await
            .map_err(internal_error("Error creating verification token"))?
        }
    };

    let verification_url = format!(
        "{}/verify-email?token={}",
        state.settings.frontend_url, token.token
    );
    let message = email::verification_email(&user.email, &user.username, &verification_url);

    state.email_sender.send(&message).await.map_err(|e| {
        error!("Error sending verification email: {}", e);
        AppError::new(
            ErrorType::InternalServerError,
            "Failed to send verification email. Please try again later.",
        )
    })
}

/// Creates an unverified account with its credentials and empty profile, then emails the
/// verification link. A failed send is logged and does not fail the registration.
#[tracing::instrument(
    skip(state, request),
    fields(service.name = "auth_service", service.operation = "register")
)]
pub async fn register(
    state: Arc<AppState>,
    request: RegisterRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "RegisterRequest"))?;

    let pool = &state.db_pool;
    let email = normalize_email(&request.email);

    if users_repository::username_taken(pool, &request.username, None)
        .await
        .map_err(internal_error("Error checking username"))?
    {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "A user with that username already exists.",
        ));
    }
    if users_repository::email_taken(pool, &email, None)
        .await
        .map_err(internal_error("Error checking email"))?
    {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "user with this email already exists.",
        ));
    }

    let (password_hash, password_hmac) =
        crypto_helper::hash_password_sign_with_hmac(&state.settings.hmac_secret, &request.password)
            .map_err(internal_error("Error hashing password"))?;

    let user = users_repository::create_account(
        pool,
        &NewUser {
            username: request.username.clone(),
            email,
            ..Default::default()
        },
        &password_hash,
        &password_hmac,
    )
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db_err) if db_err.is_unique_violation() => AppError::new(
            ErrorType::BadRequest,
            "A user with that username or email already exists.",
        ),
        _ => {
            error!("Error creating user: {:?}", e);
            AppError::internal()
        }
    })?;

    if let Err(e) = send_verification_email(&state, &user).await {
        warn!(
            "Verification email for user {} not sent: {}",
            user.id, e.error_message
        );
    }
    info!("Registered user {}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration successful! Please check your email to verify your account."
                .to_string(),
            email: user.email,
        }),
    )
        .into_response())
}

#[tracing::instrument(
    skip(state, request),
    fields(service.name = "auth_service", service.operation = "verify_email")
)]
pub async fn verify_email(
    state: Arc<AppState>,
    request: VerifyEmailRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "VerifyEmailRequest"))?;

    let pool = &state.db_pool;
    // Canonical hyphenated lower-case form, as stored.
    let token_value = Uuid::parse_str(&request.token)
        .map(|uuid| uuid.to_string())
        .unwrap_or(request.token);

    let token = verification_repository::get_unused_token(pool, &token_value)
        .await
        .map_err(internal_error("Error reading verification token"))?;

    let Some(token) = token else {
        let used = verification_repository::get_token(pool, &token_value)
            .await
            .map_err(internal_error("Error reading verification token"))?;
        if let Some(used) = used {
            let owner = users_repository::get_user_by_id(pool, used.user_id)
                .await
                .map_err(internal_error("Error reading user"))?;
            if owner.is_some_and(|user| user.is_email_verified) {
                return Ok(message(StatusCode::OK, ALREADY_VERIFIED_LOGIN));
            }
        }
        return Err(AppError::new(
            ErrorType::BadRequest,
            "Invalid or expired verification token. Please request a new verification email.",
        ));
    };

    if token.is_expired(Utc::now()) {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "Verification token has expired. Please request a new one.",
        ));
    }

    let user = users_repository::get_user_by_id(pool, token.user_id)
        .await
        .map_err(internal_error("Error reading user"))?
        .ok_or_else(|| {
            AppError::new(
                ErrorType::BadRequest,
                "Invalid or expired verification token. Please request a new verification email.",
            )
        })?;

    if user.is_email_verified {
        verification_repository::mark_token_used(pool, token.id)
            .await
            .map_err(internal_error("Error updating verification token"))?;
        return Ok(message(StatusCode::OK, ALREADY_VERIFIED_LOGIN));
    }

    users_repository::mark_email_verified(pool, user.id)
        .await
        .map_err(internal_error("Error verifying user"))?;
    verification_repository::mark_token_used(pool, token.id)
        .await
        .map_err(internal_error("Error updating verification token"))?;
    info!("Verified email of user {}", user.id);

    Ok(message(
        StatusCode::OK,
        "Email verified successfully! You can now log in.",
    ))
}

#[tracing::instrument(
    skip(state, request),
    fields(service.name = "auth_service", service.operation = "resend_verification")
)]
pub async fn resend_verification(
    state: Arc<AppState>,
    request: ResendVerificationRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "ResendVerificationRequest"))?;

    let pool = &state.db_pool;
    let user = users_repository::get_user_by_email(pool, &normalize_email(&request.email))
        .await
        .map_err(internal_error("Error reading user"))?
        .ok_or_else(|| {
            AppError::new(ErrorType::NotFound, "User with this email does not exist.")
        })?;

    if user.is_email_verified {
        return Ok(message(
            StatusCode::OK,
            "Email is already verified. You can log in now.",
        ));
    }

    verification_repository::delete_unused_tokens_for_user(pool, user.id)
        .await
        .map_err(internal_error("Error clearing verification tokens"))?;
    send_verification_email(&state, &user).await?;

    Ok(message(
        StatusCode::OK,
        "Verification email sent successfully. Please check your inbox.",
    ))
}

/// Authenticates by email (or username) and password and issues a token pair.
#[tracing::instrument(
    skip(state, request),
    fields(service.name = "auth_service", service.operation = "login")
)]
pub async fn login(state: Arc<AppState>, request: LoginRequest) -> Result<Response, AppError> {
    let identifier = request
        .email
        .filter(|value| !value.trim().is_empty())
        .or(request.username.filter(|value| !value.trim().is_empty()));
    let password = request.password.filter(|value| !value.is_empty());
    let (Some(identifier), Some(password)) = (identifier, password) else {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "Email and password are required",
        ));
    };

    let pool = &state.db_pool;
    let identifier = identifier.trim();
    let mut user = users_repository::get_user_by_email(pool, &normalize_email(identifier))
        .await
        .map_err(internal_error("Error reading user"))?;
    if user.is_none() {
        user = users_repository::get_user_by_username(pool, identifier)
            .await
            .map_err(internal_error("Error reading user"))?;
    }

    let Some(user) = user else {
        crypto_helper::run_fake_password_hash_check(&state.dummy_hashed_password);
        return Err(AppError::new(ErrorType::UnauthorizedError, INVALID_CREDENTIALS));
    };

    if !user.is_email_verified {
        return Err(AppError::new(
            ErrorType::UnauthorizedError,
            "Please verify your email before logging in. Check your inbox for a verification link.",
        ));
    }

    let credentials =
        user_login_credentials_repository::get_user_login_credentials_by_user_id(pool, user.id)
            .await
            .map_err(internal_error("Error reading credentials"))?;
    let verified = match credentials {
        Some(credentials) => crypto_helper::verify_password_hash_hmac(
            &state.settings.hmac_secret,
            &password,
            &credentials.password_hash,
            &credentials.password_hmac,
        )
        .map_err(internal_error("Error verifying password"))?,
        None => {
            crypto_helper::run_fake_password_hash_check(&state.dummy_hashed_password);
            false
        }
    };
    if !verified {
        warn!("Failed login for user {}", user.id);
        return Err(AppError::new(ErrorType::UnauthorizedError, INVALID_CREDENTIALS));
    }
    if !user.is_active {
        return Err(AppError::new(
            ErrorType::UnauthorizedError,
            "User account is disabled.",
        ));
    }

    users_repository::update_last_login(pool, user.id)
        .await
        .map_err(internal_error("Error recording last login"))?;
    info!("User {} logged in", user.id);

    login_response(&state, &user).await
}

async fn login_response(state: &AppState, user: &Users) -> Result<Response, AppError> {
    let tokens = token_service::issue_token_pair(state, user.id).await?;
    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            access: tokens.access,
            refresh: tokens.refresh,
            user: LoginUser::from(user),
        }),
    )
        .into_response())
}

pub async fn refresh(state: Arc<AppState>, request: RefreshRequest) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "RefreshRequest"))?;
    let access = token_service::refresh_access_token(&state, &request.refresh).await?;
    Ok((StatusCode::OK, Json(RefreshResponse { access })).into_response())
}

/// Blacklists the presented refresh token.
pub async fn logout(state: Arc<AppState>, request: RefreshRequest) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "RefreshRequest"))?;
    token_service::revoke_refresh_token(&state, &request.refresh).await?;
    Ok(message(StatusCode::OK, "Logout successful"))
}

/// Signs in with a Google ID token, linking or creating the local account.
#[tracing::instrument(
    skip(state, request),
    fields(service.name = "auth_service", service.operation = "google_auth")
)]
pub async fn google_auth(
    state: Arc<AppState>,
    request: GoogleAuthRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "GoogleAuthRequest"))?;

    let identity = state
        .google_verifier
        .verify(&request.token)
        .await
        .map_err(|e| {
            warn!("Google token rejected: {}", e);
            match e {
                GoogleAuthError::NotConfigured => {
                    AppError::new(ErrorType::BadRequest, "Google sign-in is not configured.")
                }
                other => AppError::new(ErrorType::BadRequest, other.to_string()),
            }
        })?;

    let pool = &state.db_pool;
    let email = normalize_email(&identity.email);
    let existing = users_repository::get_user_by_email(pool, &email)
        .await
        .map_err(internal_error("Error reading user"))?;

    let user = match existing {
        Some(user) if user.google_id.is_none() => users_repository::link_google_account(
            pool,
            user.id,
            &identity.google_id,
            &identity.given_name,
            &identity.family_name,
        )
        .await
        .map_err(internal_error("Error linking Google account"))?,
        Some(user) => user,
        None => create_google_user(&state, &email, &identity).await?,
    };

    login_response(&state, &user).await
}

async fn create_google_user(
    state: &AppState,
    email: &str,
    identity: &crate::service::google::GoogleIdentity,
) -> Result<Users, AppError> {
    let pool = &state.db_pool;
    let base_username = email
        .split('@')
        .next()
        .filter(|local| !local.is_empty())
        .unwrap_or("user")
        .to_string();

    let mut username = base_username.clone();
    let mut counter = 1;
    while users_repository::username_taken(pool, &username, None)
        .await
        .map_err(internal_error("Error checking username"))?
    {
        username = format!("{base_username}{counter}");
        counter += 1;
    }

    let password = crypto_helper::generate_random_password(GOOGLE_PASSWORD_LENGTH);
    let (password_hash, password_hmac) =
        crypto_helper::hash_password_sign_with_hmac(&state.settings.hmac_secret, &password)
            .map_err(internal_error("Error hashing password"))?;

    let user = users_repository::create_account(
        pool,
        &NewUser {
            username,
            email: email.to_string(),
            first_name: identity.given_name.clone(),
            last_name: identity.family_name.clone(),
            is_email_verified: true,
            google_id: Some(identity.google_id.clone()),
        },
        &password_hash,
        &password_hmac,
    )
    .await
    .map_err(internal_error("Error creating Google user"))?;
    info!("Created user {} from Google sign-in", user.id);

    Ok(user)
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(MessageResponse::new(text))).into_response()
}
