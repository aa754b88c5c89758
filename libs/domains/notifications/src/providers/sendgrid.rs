//! SendGrid provider over the v3 REST API.

use super::{EmailContent, EmailProvider, SentEmail};
use crate::error::{NotificationError, NotificationResult};
use async_trait::async_trait;
use core_config::{env_or_default, env_required, ConfigError, FromEnv};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error, info};

/// SendGrid API configuration.
#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
    pub api_url: String,
}

impl SendGridConfig {
    pub fn new(api_key: impl Into<String>, from_email: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            from_email: from_email.into(),
            from_name: "Courier".to_string(),
            api_url: "https://api.sendgrid.com/v3".to_string(),
        }
    }
}

impl FromEnv for SendGridConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_key: env_required("SENDGRID_API_KEY")?,
            from_email: env_required("SENDGRID_FROM_EMAIL")?,
            from_name: env_or_default("SENDGRID_FROM_NAME", "Courier"),
            api_url: env_or_default("SENDGRID_API_URL", "https://api.sendgrid.com/v3"),
        })
    }
}

/// SendGrid email provider.
pub struct SendGridProvider {
    config: SendGridConfig,
    client: Client,
}

impl SendGridProvider {
    pub fn new(config: SendGridConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendGridRequest {
    personalizations: Vec<Personalization>,
    from: EmailAddress,
    subject: String,
    content: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Personalization {
    to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
struct EmailAddress {
    email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

#[async_trait]
impl EmailProvider for SendGridProvider {
    async fn send(&self, email: &EmailContent) -> NotificationResult<SentEmail> {
        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: email.to_email.clone(),
                    name: None,
                }],
            }],
            from: EmailAddress {
                email: self.config.from_email.clone(),
                name: Some(self.config.from_name.clone()),
            },
            subject: email.subject.clone(),
            // SendGrid requires text/plain before text/html
            content: vec![
                Content {
                    content_type: "text/plain".to_string(),
                    value: email.text_body.clone(),
                },
                Content {
                    content_type: "text/html".to_string(),
                    value: email.html_body.clone(),
                },
            ],
        };

        debug!(to = %email.to_email, subject = %email.subject, "Sending email via SendGrid");

        let response = self
            .client
            .post(format!("{}/mail/send", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(to = %email.to_email, status = %status, body = %body, "SendGrid rejected email");
            return Err(NotificationError::ProviderError(format!(
                "SendGrid returned {status}: {body}"
            )));
        }

        let message_id = response
            .headers()
            .get("x-message-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        info!(to = %email.to_email, message_id = ?message_id, "Email accepted by SendGrid");

        Ok(SentEmail {
            message_id,
            accepted: true,
        })
    }

    fn name(&self) -> &'static str {
        "sendgrid"
    }

    async fn health_check(&self) -> NotificationResult<bool> {
        Ok(!self.config.api_key.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![EmailAddress {
                    email: "user@example.com".into(),
                    name: None,
                }],
            }],
            from: EmailAddress {
                email: "noreply@example.com".into(),
                name: Some("Courier".into()),
            },
            subject: "Hi".into(),
            content: vec![Content {
                content_type: "text/plain".into(),
                value: "hello".into(),
            }],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["personalizations"][0]["to"][0]["email"], "user@example.com");
        assert_eq!(json["content"][0]["type"], "text/plain");
        // `name: None` is omitted entirely
        assert!(json["personalizations"][0]["to"][0].get("name").is_none());
    }
}
