//! Email provider implementations.

mod sendgrid;
mod smtp;

pub use sendgrid::{SendGridConfig, SendGridProvider};
pub use smtp::{SmtpConfig, SmtpProvider};

use crate::error::NotificationResult;
use async_trait::async_trait;

/// A sent email with the provider-specific message id.
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub message_id: Option<String>,
    pub accepted: bool,
}

/// Email content ready for sending.
#[derive(Debug, Clone, Default)]
pub struct EmailContent {
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Trait for email sending providers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email.
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail>;

    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Whether the provider is reachable/configured.
    async fn health_check(&self) -> NotificationResult<bool>;
}
