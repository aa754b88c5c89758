//! The kind → handler dispatch for notification jobs.
//!
//! `NotificationProcessor` implements the queue's [`Processor`] trait:
//! render the kind's templates from the job payload, then hand the result
//! to the email provider. Render and payload errors are permanent (a
//! malformed payload will not improve with retries); provider errors are
//! transient and drive the backoff policy.

use crate::error::NotificationError;
use crate::models::NotificationKind;
use crate::providers::{EmailContent, EmailProvider};
use crate::templates::TemplateEngine;
use async_trait::async_trait;
use job_queue::{JobRecord, Processor, QueueError};
use std::sync::Arc;
use tracing::info;

pub struct NotificationProcessor<P: EmailProvider> {
    provider: Arc<P>,
    templates: Arc<TemplateEngine>,
}

impl<P: EmailProvider> NotificationProcessor<P> {
    pub fn new(provider: P, templates: TemplateEngine) -> Self {
        Self {
            provider: Arc::new(provider),
            templates: Arc::new(templates),
        }
    }

    pub fn with_arcs(provider: Arc<P>, templates: Arc<TemplateEngine>) -> Self {
        Self { provider, templates }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: EmailProvider> Clone for NotificationProcessor<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            templates: Arc::clone(&self.templates),
        }
    }
}

fn into_queue_error(err: NotificationError) -> QueueError {
    if err.is_transient() {
        QueueError::transient(err.to_string())
    } else {
        QueueError::permanent(err.to_string())
    }
}

#[async_trait]
impl<P: EmailProvider + 'static> Processor for NotificationProcessor<P> {
    type Kind = NotificationKind;

    async fn process(&self, kind: NotificationKind, job: &JobRecord) -> job_queue::Result<()> {
        info!(
            job_id = %job.id,
            kind = %kind,
            to = %job.recipient,
            attempts = %job.attempts,
            "Processing notification job"
        );

        let rendered = self
            .templates
            .render(kind, &job.payload)
            .map_err(into_queue_error)?;

        let email = EmailContent {
            to_email: job.recipient.clone(),
            subject: job.subject.clone(),
            html_body: rendered.html,
            text_body: rendered.text,
        };

        let sent = self.provider.send(&email).await.map_err(into_queue_error)?;

        info!(
            job_id = %job.id,
            kind = %kind,
            to = %job.recipient,
            message_id = ?sent.message_id,
            "Notification delivered"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "NotificationProcessor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MagicLinkData;
    use crate::providers::{MockEmailProvider, SentEmail};
    use job_queue::{BackoffStrategy, ErrorCategory, NewJob};

    fn magic_link_job() -> JobRecord {
        let data = MagicLinkData {
            user_name: "Ada".into(),
            login_url: "https://app.example.com/login?t=abc".into(),
            expires_in_minutes: 15,
            company_name: "Courier".into(),
        };
        NewJob::new(
            NotificationKind::MagicLink,
            "ada@example.com",
            "Your login link",
            serde_json::to_value(&data).unwrap(),
        )
        .into_record(5, BackoffStrategy::default())
    }

    #[tokio::test]
    async fn test_process_renders_and_sends() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(1).returning(|email| {
            assert_eq!(email.to_email, "ada@example.com");
            assert_eq!(email.subject, "Your login link");
            assert!(email.html_body.contains("https://app.example.com/login?t=abc"));
            assert!(email.text_body.contains("expires in 15 minutes"));
            Ok(SentEmail {
                message_id: Some("msg-1".into()),
                accepted: true,
            })
        });

        let processor =
            NotificationProcessor::new(provider, TemplateEngine::new().unwrap());
        let job = magic_link_job();
        job_queue::dispatch(&processor, &job).await.unwrap();
    }

    #[tokio::test]
    async fn test_provider_failure_is_transient() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .returning(|_| Err(NotificationError::ProviderError("451 try later".into())));

        let processor =
            NotificationProcessor::new(provider, TemplateEngine::new().unwrap());
        let err = job_queue::dispatch(&processor, &magic_link_job())
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Transient);
    }

    #[tokio::test]
    async fn test_bad_payload_is_permanent() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(0);

        let processor =
            NotificationProcessor::new(provider, TemplateEngine::new().unwrap());
        let job = NewJob::new(
            NotificationKind::MagicLink,
            "ada@example.com",
            "Your login link",
            serde_json::json!({"unexpected": "shape"}),
        )
        .into_record(5, BackoffStrategy::default());

        let err = job_queue::dispatch(&processor, &job).await.unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Permanent);
    }

    #[tokio::test]
    async fn test_unknown_kind_never_reaches_the_provider() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(0);

        let processor =
            NotificationProcessor::new(provider, TemplateEngine::new().unwrap());
        let job = NewJob::new("marketing-blast", "a@b.com", "Hi", serde_json::json!({}))
            .into_record(5, BackoffStrategy::default());

        let err = job_queue::dispatch(&processor, &job).await.unwrap_err();
        assert!(matches!(err, QueueError::UnknownKind(_)));
    }
}
