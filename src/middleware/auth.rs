use crate::config::app_config::AppState;
use crate::db::repo::users_repository;
use crate::error::error_model::{AppError, ErrorType};
use crate::service::token_service::{self, TokenType};
use axum::extract::State;
use axum::http::{header, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use std::sync::Arc;
use tracing::{error, warn};

/// Context inserted into request extensions after successful auth.
#[derive(Clone, Debug)]
pub struct AuthContext {
    pub user_id: i64,
    pub jti: String,
}

/// Middleware function that enforces Bearer JWT authentication.
///
/// # Behavior
/// 1. Decodes the `Authorization` header as a typed `Bearer` credential.
/// 2. Decodes the token with HS256, rejecting expired and non-access tokens.
/// 3. Loads the user and rejects unknown or inactive accounts.
/// 4. Inserts an `AuthContext` into the request extensions for downstream handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Response {
    let unauthorized = |msg: &str| -> Response {
        AppError::new(ErrorType::UnauthorizedError, msg).into_response()
    };

    if !req.headers().contains_key(header::AUTHORIZATION) {
        return unauthorized("Authentication credentials were not provided.");
    }
    let bearer = match req.headers().typed_get::<Authorization<Bearer>>() {
        Some(Authorization(bearer)) if !bearer.token().trim().is_empty() => bearer,
        _ => return unauthorized("Authorization header must be Bearer token"),
    };
    let token = bearer.token().trim();

    let claims =
        match token_service::decode_token(&state.settings.secret_key, token, TokenType::Access) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Rejected access token: {}", e);
                return unauthorized("Given token not valid for any token type");
            }
        };

    match users_repository::get_user_by_id(&state.db_pool, claims.user_id).await {
        Ok(Some(user)) if user.is_active => {}
        Ok(Some(_)) => return unauthorized("User is inactive"),
        Ok(None) => return unauthorized("User not found"),
        Err(e) => {
            error!("Error loading user for token: {:?}", e);
            return AppError::internal().into_response();
        }
    }

    req.extensions_mut().insert(AuthContext {
        user_id: claims.user_id,
        jti: claims.jti,
    });

    next.run(req).await
}
