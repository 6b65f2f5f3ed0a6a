use crate::config::settings::Settings;
use crate::db::pool;
use crate::db::repo::auth_repository;
use crate::service::email::{self, EmailSender};
use crate::service::google::{GoogleIdTokenVerifier, GoogleTokenVerifier};
use crate::util::crypto_helper;
use derive_more::{Display, Error, From};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Display, Error, From)]
pub enum StartupError {
    #[display("database error: {_0}")]
    Database(sqlx::Error),
    #[display("migration error: {_0}")]
    Migration(sqlx::migrate::MigrateError),
    #[display("email sender error: {_0}")]
    Email(email::EmailError),
    #[display("crypto error: {_0}")]
    Crypto(crypto_helper::CryptoError),
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub settings: Settings,
    pub dummy_hashed_password: String,
    pub email_sender: Arc<dyn EmailSender>,
    pub google_verifier: Arc<dyn GoogleTokenVerifier>,
}

impl AppState {
    /// Assembles the state from already built collaborators.
    pub fn new(
        db_pool: SqlitePool,
        settings: Settings,
        email_sender: Arc<dyn EmailSender>,
        google_verifier: Arc<dyn GoogleTokenVerifier>,
    ) -> Result<Self, StartupError> {
        Ok(Self {
            db_pool,
            settings,
            dummy_hashed_password: crypto_helper::generate_dummy_password_hash()?,
            email_sender,
            google_verifier,
        })
    }
}

/// Opens the database, applies pending migrations, drops expired refresh tokens and wires
/// the production collaborators.
///
/// # Errors
/// Returns a `StartupError` when the database cannot be opened or migrated, or when the
/// Mailtrap client cannot be built.
pub async fn initialize_app_state(settings: Settings) -> Result<Arc<AppState>, StartupError> {
    let db_pool = pool::connect(&settings.database_url).await?;
    pool::run_migrations(&db_pool).await?;

    let purged =
        auth_repository::delete_expired_refresh_tokens(&db_pool, chrono::Utc::now()).await?;
    if purged > 0 {
        info!("Purged {} expired refresh tokens", purged);
    }

    let email_sender = email::sender_from_settings(&settings)?;
    let google_verifier = Arc::new(GoogleIdTokenVerifier::new(settings.google_client_id.clone()));

    Ok(Arc::new(AppState::new(
        db_pool,
        settings,
        email_sender,
        google_verifier,
    )?))
}
