use async_trait::async_trait;
use derive_more::{Display, Error};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];
const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Display, Error)]
pub enum GoogleAuthError {
    #[display("Invalid Google token: {message}")]
    InvalidToken { message: String },
    #[display("Invalid token issuer")]
    InvalidIssuer,
    #[display("Google sign-in is not configured")]
    NotConfigured,
}

impl GoogleAuthError {
    fn invalid(message: impl Into<String>) -> Self {
        GoogleAuthError::InvalidToken {
            message: message.into(),
        }
    }
}

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub google_id: String,
    pub email: String,
    pub given_name: String,
    pub family_name: String,
    pub email_verified: bool,
}

#[async_trait]
pub trait GoogleTokenVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    pub kid: String,
    pub n: String,
    pub e: String,
}

#[derive(Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

#[derive(Deserialize)]
struct GoogleClaims {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
}

struct CachedKeys {
    keys: Vec<Jwk>,
    fetched_at: Instant,
}

/// Verifies Google ID tokens (RS256) against Google's published signing keys.
pub struct GoogleIdTokenVerifier {
    client_id: Option<String>,
    certs_url: String,
    http_client: Option<reqwest::Client>,
    cached: RwLock<Option<CachedKeys>>,
}

impl GoogleIdTokenVerifier {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client_id,
            certs_url: GOOGLE_CERTS_URL.to_string(),
            http_client: Some(reqwest::Client::new()),
            cached: RwLock::new(None),
        }
    }

    /// Verifier that never goes to the network.
    pub fn with_static_keys(client_id: impl Into<String>, keys: Vec<Jwk>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            certs_url: String::new(),
            http_client: None,
            cached: RwLock::new(Some(CachedKeys {
                keys,
                fetched_at: Instant::now(),
            })),
        }
    }

    async fn find_key(&self, kid: &str) -> Result<Jwk, GoogleAuthError> {
        if let Some(key) = self.lookup_cached(kid).await {
            return Ok(key);
        }
        if self.http_client.is_some() {
            self.refresh_keys().await?;
            if let Some(key) = self.lookup_cached(kid).await {
                return Ok(key);
            }
        }
        Err(GoogleAuthError::invalid(format!("no signing key matches kid {kid}")))
    }

    async fn lookup_cached(&self, kid: &str) -> Option<Jwk> {
        let cache = self.cached.read().await;
        let cached = cache.as_ref()?;
        if self.http_client.is_some() && cached.fetched_at.elapsed() > JWKS_CACHE_TTL {
            return None;
        }
        cached.keys.iter().find(|k| k.kid == kid).cloned()
    }

    async fn refresh_keys(&self) -> Result<(), GoogleAuthError> {
        let Some(client) = self.http_client.as_ref() else {
            return Ok(());
        };
        debug!("Fetching Google signing keys");
        let response: JwksResponse = client
            .get(&self.certs_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GoogleAuthError::invalid(e.to_string()))?
            .json()
            .await
            .map_err(|e| GoogleAuthError::invalid(e.to_string()))?;

        *self.cached.write().await = Some(CachedKeys {
            keys: response.keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

#[async_trait]
impl GoogleTokenVerifier for GoogleIdTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, GoogleAuthError> {
        let client_id = self
            .client_id
            .as_deref()
            .ok_or(GoogleAuthError::NotConfigured)?;

        let header = decode_header(id_token).map_err(|e| GoogleAuthError::invalid(e.to_string()))?;
        let kid = header
            .kid
            .ok_or_else(|| GoogleAuthError::invalid("missing kid in token header"))?;
        let key = self.find_key(&kid).await?;
        let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|e| GoogleAuthError::invalid(e.to_string()))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[client_id]);
        validation.set_issuer(&GOOGLE_ISSUERS);

        let claims = decode::<GoogleClaims>(id_token, &decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidIssuer => GoogleAuthError::InvalidIssuer,
                _ => GoogleAuthError::invalid(e.to_string()),
            })?
            .claims;

        let email = claims
            .email
            .ok_or_else(|| GoogleAuthError::invalid("token has no email"))?;

        Ok(GoogleIdentity {
            google_id: claims.sub,
            email,
            given_name: claims.given_name,
            family_name: claims.family_name,
            email_verified: claims.email_verified,
        })
    }
}
