use derive_more::{Display, Error};
use std::fmt;

const DEV_SECRET_KEY: &str = "dev-insecure-secret-key-change-me";
const DEV_HMAC_SECRET: &str = "dev-insecure-hmac-secret-change-me";

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("{key} must be set")]
    Missing { key: String },
    #[display("{key} has an invalid value: {value}")]
    Invalid { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Clone)]
pub struct MailtrapSettings {
    pub api_token: String,
    pub inbox_id: String,
}

/// Runtime settings, read once at start-up.
#[derive(Clone)]
pub struct Settings {
    pub environment: Environment,
    pub server_host: String,
    pub server_port: u16,
    pub database_url: String,
    pub secret_key: String,
    pub hmac_secret: String,
    pub access_token_lifetime_secs: i64,
    pub refresh_token_lifetime_secs: i64,
    pub frontend_url: String,
    pub mailtrap: Option<MailtrapSettings>,
    pub default_from_email: String,
    pub default_from_name: String,
    pub google_client_id: Option<String>,
    pub request_timeout_secs: u64,
}

// Secrets stay out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("environment", &self.environment)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("database_url", &self.database_url)
            .field("access_token_lifetime_secs", &self.access_token_lifetime_secs)
            .field("refresh_token_lifetime_secs", &self.refresh_token_lifetime_secs)
            .field("frontend_url", &self.frontend_url)
            .field("mailtrap", &self.mailtrap.is_some())
            .field("google_client_id", &self.google_client_id)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the settings from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = match get("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV".to_string(),
                    value: other.to_string(),
                })
            }
        };
        let production = environment.is_production();

        let secret = |key: &str, dev_default: &str| match get(key) {
            Some(value) => Ok(value),
            None if production => Err(ConfigError::Missing {
                key: key.to_string(),
            }),
            None => Ok(dev_default.to_string()),
        };
        let secret_key = secret("SECRET_KEY", DEV_SECRET_KEY)?;
        let hmac_secret = secret("HMAC_SECRET", DEV_HMAC_SECRET)?;

        let frontend_url = match get("FRONTEND_URL") {
            Some(url) => url.trim_end_matches('/').to_string(),
            None if production => {
                return Err(ConfigError::Missing {
                    key: "FRONTEND_URL".to_string(),
                })
            }
            None => "http://localhost:3000".to_string(),
        };

        let mailtrap = match (get("MAILTRAP_API_TOKEN"), get("MAILTRAP_INBOX_ID")) {
            (Some(api_token), Some(inbox_id)) => Some(MailtrapSettings {
                api_token,
                inbox_id,
            }),
            _ => None,
        };

        Ok(Settings {
            environment,
            server_host: get("SERVER_HOST").unwrap_or_else(|| {
                (if production { "0.0.0.0" } else { "127.0.0.1" }).to_string()
            }),
            server_port: parse_or(&get, "SERVER_PORT", 8000)?,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite://db.sqlite3".to_string()),
            secret_key,
            hmac_secret,
            access_token_lifetime_secs: parse_or(
                &get,
                "ACCESS_TOKEN_LIFETIME_SECS",
                if production { 15 * 60 } else { 2 * 60 * 60 },
            )?,
            refresh_token_lifetime_secs: parse_or(
                &get,
                "REFRESH_TOKEN_LIFETIME_SECS",
                if production { 24 * 60 * 60 } else { 7 * 24 * 60 * 60 },
            )?,
            frontend_url,
            mailtrap,
            default_from_email: get("DEFAULT_FROM_EMAIL")
                .unwrap_or_else(|| "noreply@localhost".to_string()),
            default_from_name: get("DEFAULT_FROM_NAME").unwrap_or_else(|| "5thsocial".to_string()),
            google_client_id: get("GOOGLE_OAUTH2_CLIENT_ID"),
            request_timeout_secs: parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}
