use crate::api::model::account::{ProfileResponse, UpdateProfileRequest};
use crate::config::app_config::AppState;
use crate::db::repo::users_repository;
use crate::error::error_model::{internal_error, AppError, ErrorType};
use crate::middleware::auth::AuthContext;
use crate::service::auth_service::normalize_email;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::sync::Arc;
use tracing::{error, info};
use validator::Validate;

/// Returns the caller's account with its profile.
#[tracing::instrument(
    skip(state, auth),
    fields(service.name = "user_service", service.operation = "get_profile", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn get_profile(state: Arc<AppState>, auth: AuthContext) -> Result<Response, AppError> {
    let pool = &state.db_pool;
    let user = users_repository::get_user_by_id(pool, auth.user_id)
        .await
        .map_err(internal_error("Error reading user"))?
        .ok_or_else(|| AppError::new(ErrorType::NotFound, "User not found."))?;
    let profile = users_repository::get_or_create_profile(pool, user.id)
        .await
        .map_err(internal_error("Error reading profile"))?;

    Ok((StatusCode::OK, Json(ProfileResponse::new(&user, profile))).into_response())
}

/// Applies the supplied fields to the caller's account and profile.
///
/// Username and email keep the registration rules, including uniqueness. PUT and PATCH
/// both land here: omitted fields keep their value.
#[tracing::instrument(
    skip(state, auth, request),
    fields(service.name = "user_service", service.operation = "update_profile", user.id = auth.user_id, token.jti = %auth.jti)
)]
pub async fn update_profile(
    state: Arc<AppState>,
    auth: AuthContext,
    request: UpdateProfileRequest,
) -> Result<Response, AppError> {
    request
        .validate()
        .map_err(|e| AppError::validation(e, "UpdateProfileRequest"))?;

    let pool = &state.db_pool;
    let mut user = users_repository::get_user_by_id(pool, auth.user_id)
        .await
        .map_err(internal_error("Error reading user"))?
        .ok_or_else(|| AppError::new(ErrorType::NotFound, "User not found."))?;

    let username = request.username.unwrap_or_else(|| user.username.clone());
    let email = request
        .email
        .map(|email| normalize_email(&email))
        .unwrap_or_else(|| user.email.clone());

    if username != user.username
        && users_repository::username_taken(pool, &username, Some(user.id))
            .await
            .map_err(internal_error("Error checking username"))?
    {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "A user with that username already exists.",
        ));
    }
    if email != user.email
        && users_repository::email_taken(pool, &email, Some(user.id))
            .await
            .map_err(internal_error("Error checking email"))?
    {
        return Err(AppError::new(
            ErrorType::BadRequest,
            "user with this email already exists.",
        ));
    }

    if username != user.username || email != user.email {
        user = users_repository::update_username_and_email(pool, user.id, &username, &email)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db_err) if db_err.is_unique_violation() => AppError::new(
                    ErrorType::BadRequest,
                    "A user with that username or email already exists.",
                ),
                _ => {
                    error!("Error updating user: {:?}", e);
                    AppError::internal()
                }
            })?;
    }

    let mut profile = users_repository::get_or_create_profile(pool, user.id)
        .await
        .map_err(internal_error("Error reading profile"))?;
    if let Some(changes) = request.profile {
        let image = match changes.image {
            Some(image) if image.is_empty() => None,
            Some(image) => Some(image),
            None => profile.image.clone(),
        };
        let bio = changes.bio.unwrap_or_else(|| profile.bio.clone());
        profile = users_repository::update_profile(pool, user.id, image.as_deref(), &bio)
            .await
            .map_err(internal_error("Error updating profile"))?;
    }
    info!("Updated profile of user {}", user.id);

    Ok((StatusCode::OK, Json(ProfileResponse::new(&user, profile))).into_response())
}
