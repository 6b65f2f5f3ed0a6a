use crate::config::settings::Settings;
use async_trait::async_trait;
use derive_more::{Display, Error};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const MAILTRAP_SANDBOX_URL: &str = "https://sandbox.api.mailtrap.io/api/send";

#[derive(Debug, Display, Error)]
pub enum EmailError {
    #[display("email transport failed: {message}")]
    Transport { message: String },
    #[display("email provider rejected the message with status {status}")]
    Rejected { status: u16 },
}

/// A rendered message ready to hand to a sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub category: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Picks the Mailtrap sender when credentials are configured, otherwise logs messages.
pub fn sender_from_settings(settings: &Settings) -> Result<Arc<dyn EmailSender>, EmailError> {
    match &settings.mailtrap {
        Some(mailtrap) => Ok(Arc::new(MailtrapEmailSender::new(
            mailtrap.api_token.clone(),
            mailtrap.inbox_id.clone(),
            settings.default_from_email.clone(),
            settings.default_from_name.clone(),
        )?)),
        None => {
            warn!("Mailtrap credentials not set, emails will only be logged");
            Ok(Arc::new(LogEmailSender))
        }
    }
}

/// Builds the account verification message for `username` pointing at `verification_url`.
pub fn verification_email(
    to_email: &str,
    username: &str,
    verification_url: &str,
) -> EmailMessage {
    let text = format!(
        "Hello {username},\n\n\
         Thanks for signing up. Please confirm your email address by opening the link below:\n\n\
         {verification_url}\n\n\
         This link expires in 24 hours. If you did not create an account, you can ignore this email."
    );
    let html = format!(
        "<html><body>\
         <h2>Verify your email address</h2>\
         <p>Hello {username},</p>\
         <p>Thanks for signing up. Please confirm your email address by clicking the button below.</p>\
         <p><a href=\"{verification_url}\">Verify Email</a></p>\
         <p>Or paste this link into your browser: {verification_url}</p>\
         <p>This link expires in 24 hours. If you did not create an account, you can ignore this email.</p>\
         </body></html>"
    );
    EmailMessage {
        to_email: to_email.to_string(),
        to_name: username.to_string(),
        subject: "Verify Your Email Address".to_string(),
        text,
        html,
        category: "Email Verification".to_string(),
    }
}

/// Development sender: writes the message to the log instead of delivering it.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!("Sending email to: {}", message.to_email);
        info!("Subject: {}", message.subject);
        info!("Body: {}", message.text);
        Ok(())
    }
}

#[derive(Serialize)]
struct MailtrapAddress<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct MailtrapRequest<'a> {
    from: MailtrapAddress<'a>,
    to: Vec<MailtrapAddress<'a>>,
    subject: &'a str,
    text: &'a str,
    html: &'a str,
    category: &'a str,
}

/// Mailtrap sandbox sending API.
pub struct MailtrapEmailSender {
    client: Client,
    api_token: String,
    endpoint: String,
    from_email: String,
    from_name: String,
}

impl MailtrapEmailSender {
    pub fn new(
        api_token: String,
        inbox_id: String,
        from_email: String,
        from_name: String,
    ) -> Result<Self, EmailError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EmailError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            api_token,
            endpoint: format!("{MAILTRAP_SANDBOX_URL}/{inbox_id}"),
            from_email,
            from_name,
        })
    }
}

#[async_trait]
impl EmailSender for MailtrapEmailSender {
    #[tracing::instrument(skip(self, message), fields(to = %message.to_email))]
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let body = MailtrapRequest {
            from: MailtrapAddress {
                email: &self.from_email,
                name: &self.from_name,
            },
            to: vec![MailtrapAddress {
                email: &message.to_email,
                name: &message.to_name,
            }],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
            category: &message.category,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmailError::Transport {
                message: e.to_string(),
            })?;

        // Mailtrap answers 200 on acceptance; anything else is a failure.
        if response.status() == StatusCode::OK {
            debug!("Mailtrap accepted the message");
            Ok(())
        } else {
            Err(EmailError::Rejected {
                status: response.status().as_u16(),
            })
        }
    }
}

/// Keeps sent messages in memory. Can be switched to fail every send.
#[derive(Clone, Default)]
pub struct MemoryEmailSender {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
    failing: Arc<Mutex<bool>>,
}

impl MemoryEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn set_failing(&self, failing: bool) {
        *self.failing.lock().await = failing;
    }
}

#[async_trait]
impl EmailSender for MemoryEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        if *self.failing.lock().await {
            return Err(EmailError::Transport {
                message: "memory sender configured to fail".to_string(),
            });
        }
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}
