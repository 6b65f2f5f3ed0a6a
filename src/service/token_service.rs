use crate::config::app_config::AppState;
use crate::db::repo::auth_repository;
use crate::error::error_model::{AppError, ErrorType};
use chrono::{DateTime, Duration, Utc};
use derive_more::{Display, Error};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

pub const INVALID_TOKEN_MESSAGE: &str = "Token is invalid or expired";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    #[display("access")]
    Access,
    #[display("refresh")]
    Refresh,
}

#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum TokenError {
    #[display("token has expired")]
    Expired,
    #[display("token is malformed or has a bad signature")]
    Invalid,
    #[display("expected a {expected} token")]
    WrongType { expected: TokenType },
    #[display("token could not be signed")]
    Signing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub token_type: TokenType,
    pub user_id: i64,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Signs a fresh token of `token_type` for `user_id` with HS256.
pub fn encode_token(
    secret: &str,
    token_type: TokenType,
    user_id: i64,
    lifetime_secs: i64,
    now: DateTime<Utc>,
) -> Result<(String, Claims), TokenError> {
    let claims = Claims {
        token_type,
        user_id,
        jti: nanoid!(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(lifetime_secs)).timestamp(),
    };
    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| TokenError::Signing)?;
    Ok((token, claims))
}

/// Verifies signature and expiry (no leeway) and checks the token type.
pub fn decode_token(secret: &str, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })?
    .claims;

    if claims.token_type != expected {
        return Err(TokenError::WrongType { expected });
    }
    Ok(claims)
}

fn invalid_token() -> AppError {
    AppError::new(ErrorType::UnauthorizedError, INVALID_TOKEN_MESSAGE)
}

/// Issues an access/refresh pair and records the refresh token as outstanding.
#[tracing::instrument(skip(state))]
pub async fn issue_token_pair(state: &AppState, user_id: i64) -> Result<TokenPair, AppError> {
    let settings = &state.settings;
    let now = Utc::now();

    let (access, _) = encode_token(
        &settings.secret_key,
        TokenType::Access,
        user_id,
        settings.access_token_lifetime_secs,
        now,
    )
    .map_err(|e| {
        error!("Error signing access token: {}", e);
        AppError::internal()
    })?;
    let (refresh, refresh_claims) = encode_token(
        &settings.secret_key,
        TokenType::Refresh,
        user_id,
        settings.refresh_token_lifetime_secs,
        now,
    )
    .map_err(|e| {
        error!("Error signing refresh token: {}", e);
        AppError::internal()
    })?;

    let expires_at = DateTime::from_timestamp(refresh_claims.exp, 0).unwrap_or(now);
    auth_repository::add_refresh_token(&state.db_pool, user_id, &refresh_claims.jti, expires_at)
        .await
        .map_err(|e| {
            error!("Error recording refresh token: {:?}", e);
            AppError::internal()
        })?;

    Ok(TokenPair { access, refresh })
}

/// Decodes a refresh token and makes sure it is still outstanding.
async fn outstanding_refresh_claims(state: &AppState, refresh: &str) -> Result<Claims, AppError> {
    let claims =
        decode_token(&state.settings.secret_key, refresh, TokenType::Refresh).map_err(|e| {
            warn!("Rejected refresh token: {}", e);
            invalid_token()
        })?;

    let record = auth_repository::get_refresh_token_by_jti(&state.db_pool, &claims.jti)
        .await
        .map_err(|e| {
            error!("Error reading refresh token: {:?}", e);
            AppError::internal()
        })?;

    match record {
        Some(record) if record.is_usable(Utc::now()) => Ok(claims),
        Some(_) => {
            warn!("Refresh token {} is revoked or expired", claims.jti);
            Err(invalid_token())
        }
        None => Err(invalid_token()),
    }
}

/// Mints a new access token from an outstanding refresh token.
#[tracing::instrument(skip_all)]
pub async fn refresh_access_token(state: &AppState, refresh: &str) -> Result<String, AppError> {
    let claims = outstanding_refresh_claims(state, refresh).await?;
    let (access, _) = encode_token(
        &state.settings.secret_key,
        TokenType::Access,
        claims.user_id,
        state.settings.access_token_lifetime_secs,
        Utc::now(),
    )
    .map_err(|e| {
        error!("Error signing access token: {}", e);
        AppError::internal()
    })?;
    Ok(access)
}

/// Blacklists an outstanding refresh token.
#[tracing::instrument(skip_all)]
pub async fn revoke_refresh_token(state: &AppState, refresh: &str) -> Result<(), AppError> {
    let claims = outstanding_refresh_claims(state, refresh).await?;
    let revoked = auth_repository::revoke_refresh_token(&state.db_pool, &claims.jti)
        .await
        .map_err(|e| {
            error!("Error revoking refresh token: {:?}", e);
            AppError::internal()
        })?;
    if !revoked {
        return Err(invalid_token());
    }
    Ok(())
}
