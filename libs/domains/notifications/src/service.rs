//! Notification service: the enqueue-side API.
//!
//! One `queue_*` helper per notification kind builds the typed payload and
//! subject, then enqueues through the [`QueueClient`]. When the queue
//! store is unavailable the service can fall back to direct synchronous
//! delivery — same dispatch table as the worker, but no durability, retry,
//! or concurrency control.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    AdminNotificationData, BusinessInvitationData, GiftCardRedemptionData, MagicLinkData,
    NotificationKind, OrderConfirmationData, OrderSummary, PasswordResetData,
};
use crate::processor::NotificationProcessor;
use crate::providers::EmailProvider;
use chrono::Utc;
use core_config::{env_or_default, env_parse_or, ConfigError, FromEnv};
use job_queue::{BackoffStrategy, EnqueueOutcome, ErrorCategory, NewJob, QueueClient};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Configuration for the notification service.
#[derive(Debug, Clone)]
pub struct NotificationServiceConfig {
    /// Base URL for links in emails.
    pub frontend_url: String,
    /// Company name for email footers.
    pub company_name: String,
    /// Fall back to direct delivery when the queue store is unavailable.
    pub deliver_on_unavailable: bool,
    pub invitation_expiry_days: u32,
    pub magic_link_expiry_minutes: u32,
    pub password_reset_expiry_hours: u32,
}

impl Default for NotificationServiceConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            company_name: "Courier".to_string(),
            deliver_on_unavailable: true,
            invitation_expiry_days: 7,
            magic_link_expiry_minutes: 15,
            password_reset_expiry_hours: 1,
        }
    }
}

impl FromEnv for NotificationServiceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            frontend_url: env_or_default("FRONTEND_URL", &defaults.frontend_url),
            company_name: env_or_default("COMPANY_NAME", &defaults.company_name),
            deliver_on_unavailable: env_parse_or(
                "NOTIFY_DELIVER_ON_UNAVAILABLE",
                defaults.deliver_on_unavailable,
            )?,
            invitation_expiry_days: env_parse_or(
                "INVITATION_EXPIRY_DAYS",
                defaults.invitation_expiry_days,
            )?,
            magic_link_expiry_minutes: env_parse_or(
                "MAGIC_LINK_EXPIRY_MINUTES",
                defaults.magic_link_expiry_minutes,
            )?,
            password_reset_expiry_hours: env_parse_or(
                "PASSWORD_RESET_EXPIRY_HOURS",
                defaults.password_reset_expiry_hours,
            )?,
        })
    }
}

/// Service for queueing (or directly delivering) email notifications.
pub struct NotificationService<P: EmailProvider + 'static> {
    client: Arc<QueueClient>,
    processor: Arc<NotificationProcessor<P>>,
    config: NotificationServiceConfig,
}

impl<P: EmailProvider + 'static> NotificationService<P> {
    pub fn new(
        client: Arc<QueueClient>,
        processor: Arc<NotificationProcessor<P>>,
        config: NotificationServiceConfig,
    ) -> Self {
        Self {
            client,
            processor,
            config,
        }
    }

    pub fn client(&self) -> &QueueClient {
        &self.client
    }

    /// Enqueue, falling back to direct delivery when the store is
    /// unavailable (and the fallback is enabled). The caller only ever
    /// sees a structured outcome.
    async fn submit(
        &self,
        kind: NotificationKind,
        recipient: &str,
        subject: String,
        data: impl Serialize,
    ) -> EnqueueOutcome {
        let payload = match serde_json::to_value(data) {
            Ok(payload) => payload,
            Err(e) => return EnqueueOutcome::failed(e.to_string()),
        };
        let job = NewJob::new(kind, recipient, subject, payload);

        let outcome = self.client.enqueue(job.clone()).await;
        if outcome.success {
            return outcome;
        }

        if self.config.deliver_on_unavailable && !self.client.initialize().await.is_ready() {
            warn!(
                kind = %kind,
                recipient = %recipient,
                "Queue store unavailable; attempting direct delivery"
            );
            return match self.deliver_now(job).await {
                Ok(()) => EnqueueOutcome::delivered_directly(),
                Err(e) => EnqueueOutcome::failed(e.to_string()),
            };
        }

        outcome
    }

    /// Execute one job body synchronously, bypassing the store. Shares the
    /// worker's dispatch table, so behavior matches the pooled path — minus
    /// retries, durability, and concurrency control.
    pub async fn deliver_now(&self, job: NewJob) -> NotificationResult<()> {
        let record = job.into_record(1, BackoffStrategy::Fixed { delay_secs: 0 });
        info!(job_id = %record.id, kind = %record.kind, "Delivering notification directly");

        job_queue::dispatch(self.processor.as_ref(), &record)
            .await
            .map_err(|e| match e.category() {
                ErrorCategory::Transient => NotificationError::ProviderError(e.to_string()),
                ErrorCategory::Permanent => NotificationError::Internal(e.to_string()),
            })
    }

    /// Queue an order confirmation receipt.
    pub async fn queue_order_confirmation(
        &self,
        recipient: &str,
        customer_name: &str,
        order: OrderSummary,
    ) -> EnqueueOutcome {
        let subject = format!("Order {} confirmed", order.order_id);
        let data = OrderConfirmationData {
            customer_name: customer_name.to_string(),
            order_url: format!("{}/orders/{}", self.config.frontend_url, order.order_id),
            order_id: order.order_id,
            items: order.items,
            total: order.total,
            currency: order.currency,
            company_name: self.config.company_name.clone(),
        };
        self.submit(NotificationKind::OrderConfirmation, recipient, subject, data)
            .await
    }

    /// Queue an invitation to join a business account.
    pub async fn queue_business_invitation(
        &self,
        recipient: &str,
        invitee_name: &str,
        inviter_name: &str,
        business_name: &str,
        invite_token: &str,
    ) -> EnqueueOutcome {
        let subject = format!("{inviter_name} invited you to join {business_name}");
        let data = BusinessInvitationData {
            invitee_name: invitee_name.to_string(),
            inviter_name: inviter_name.to_string(),
            business_name: business_name.to_string(),
            accept_url: format!(
                "{}/invitations/accept?token={}",
                self.config.frontend_url, invite_token
            ),
            expires_in_days: self.config.invitation_expiry_days,
            company_name: self.config.company_name.clone(),
        };
        self.submit(NotificationKind::BusinessInvitation, recipient, subject, data)
            .await
    }

    /// Queue a passwordless login link.
    pub async fn queue_magic_link(
        &self,
        recipient: &str,
        user_name: &str,
        login_token: &str,
    ) -> EnqueueOutcome {
        let data = MagicLinkData {
            user_name: user_name.to_string(),
            login_url: format!(
                "{}/auth/magic-link?token={}",
                self.config.frontend_url, login_token
            ),
            expires_in_minutes: self.config.magic_link_expiry_minutes,
            company_name: self.config.company_name.clone(),
        };
        self.submit(
            NotificationKind::MagicLink,
            recipient,
            "Your login link".to_string(),
            data,
        )
        .await
    }

    /// Queue a password reset email.
    pub async fn queue_password_reset(
        &self,
        recipient: &str,
        user_name: &str,
        reset_token: &str,
    ) -> EnqueueOutcome {
        let data = PasswordResetData {
            user_name: user_name.to_string(),
            reset_url: format!(
                "{}/auth/reset-password?token={}",
                self.config.frontend_url, reset_token
            ),
            expires_in_hours: self.config.password_reset_expiry_hours,
            company_name: self.config.company_name.clone(),
        };
        self.submit(
            NotificationKind::PasswordReset,
            recipient,
            "Reset your password".to_string(),
            data,
        )
        .await
    }

    /// Queue a gift-card redemption receipt.
    pub async fn queue_gift_card_redemption(
        &self,
        recipient: &str,
        customer_name: &str,
        code_suffix: &str,
        amount: &str,
        remaining_balance: &str,
        currency: &str,
    ) -> EnqueueOutcome {
        let data = GiftCardRedemptionData {
            customer_name: customer_name.to_string(),
            code_suffix: code_suffix.to_string(),
            amount: amount.to_string(),
            remaining_balance: remaining_balance.to_string(),
            currency: currency.to_string(),
            company_name: self.config.company_name.clone(),
        };
        self.submit(
            NotificationKind::GiftCardRedemption,
            recipient,
            "Your gift card receipt".to_string(),
            data,
        )
        .await
    }

    /// Queue an operational alert for administrators.
    pub async fn queue_admin_notification(
        &self,
        recipient: &str,
        event: &str,
        severity: &str,
        details: serde_json::Value,
    ) -> EnqueueOutcome {
        let subject = format!("[{severity}] {event}");
        let data = AdminNotificationData {
            event: event.to_string(),
            severity: severity.to_string(),
            details,
            occurred_at: Utc::now(),
            company_name: self.config.company_name.clone(),
        };
        self.submit(NotificationKind::AdminNotification, recipient, subject, data)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockEmailProvider, SentEmail};
    use crate::templates::TemplateEngine;
    use core_config::redis::RedisConfig;
    use job_queue::{JobState, JobStore, MemoryJobStore, QueueConfig};

    fn service_with_memory_store(
        provider: MockEmailProvider,
    ) -> (NotificationService<MockEmailProvider>, Arc<MemoryJobStore>) {
        let store = Arc::new(MemoryJobStore::default());
        let client = Arc::new(QueueClient::with_store(
            QueueConfig::default(),
            store.clone() as Arc<dyn JobStore>,
        ));
        let processor = Arc::new(NotificationProcessor::new(
            provider,
            TemplateEngine::new().unwrap(),
        ));
        let service = NotificationService::new(
            client,
            processor,
            NotificationServiceConfig::default(),
        );
        (service, store)
    }

    fn service_with_unreachable_store(
        provider: MockEmailProvider,
        deliver_on_unavailable: bool,
    ) -> NotificationService<MockEmailProvider> {
        let config = QueueConfig::default().with_redis(RedisConfig::new("127.0.0.1", 1));
        let client = Arc::new(QueueClient::new(config));
        let processor = Arc::new(NotificationProcessor::new(
            provider,
            TemplateEngine::new().unwrap(),
        ));
        NotificationService::new(
            client,
            processor,
            NotificationServiceConfig {
                deliver_on_unavailable,
                ..NotificationServiceConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_queue_magic_link_builds_payload() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(0);
        let (service, store) = service_with_memory_store(provider);

        let outcome = service
            .queue_magic_link("ada@example.com", "Ada", "tok_123")
            .await;
        assert!(outcome.success);

        let record = store
            .fetch(&outcome.job_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, "magic-link");
        assert_eq!(record.recipient, "ada@example.com");
        assert_eq!(record.state, JobState::Waiting);
        assert_eq!(record.payload["login_url"], "http://localhost:3000/auth/magic-link?token=tok_123");
        assert_eq!(record.payload["expires_in_minutes"], 15);
    }

    #[tokio::test]
    async fn test_queue_order_confirmation_subject_and_url() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(0);
        let (service, store) = service_with_memory_store(provider);

        let outcome = service
            .queue_order_confirmation(
                "buyer@example.com",
                "Ada",
                OrderSummary {
                    order_id: "ord_9".into(),
                    items: vec![],
                    total: "12.00".into(),
                    currency: "USD".into(),
                },
            )
            .await;

        let record = store
            .fetch(&outcome.job_id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.subject, "Order ord_9 confirmed");
        assert_eq!(record.payload["order_url"], "http://localhost:3000/orders/ord_9");
    }

    #[tokio::test]
    async fn test_fallback_delivers_directly_when_store_unavailable() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(1).returning(|email| {
            assert_eq!(email.to_email, "ada@example.com");
            Ok(SentEmail {
                message_id: None,
                accepted: true,
            })
        });
        let service = service_with_unreachable_store(provider, true);

        let outcome = service
            .queue_password_reset("ada@example.com", "Ada", "tok_r")
            .await;

        assert!(outcome.success);
        assert!(outcome.job_id.is_none());
        assert!(outcome.message.as_deref().unwrap_or("").contains("directly"));
    }

    #[tokio::test]
    async fn test_fallback_disabled_reports_unavailable() {
        let mut provider = MockEmailProvider::new();
        provider.expect_send().times(0);
        let service = service_with_unreachable_store(provider, false);

        let outcome = service
            .queue_password_reset("ada@example.com", "Ada", "tok_r")
            .await;

        assert!(!outcome.success);
        assert!(!outcome.error.as_deref().unwrap_or("").is_empty());
    }

    #[tokio::test]
    async fn test_deliver_now_surfaces_provider_errors() {
        let mut provider = MockEmailProvider::new();
        provider
            .expect_send()
            .returning(|_| Err(NotificationError::ProviderError("connection reset".into())));
        let (service, _store) = service_with_memory_store(provider);

        let data = MagicLinkData {
            user_name: "Ada".into(),
            login_url: "https://x/login".into(),
            expires_in_minutes: 15,
            company_name: "Courier".into(),
        };
        let job = NewJob::new(
            NotificationKind::MagicLink,
            "ada@example.com",
            "Your login link",
            serde_json::to_value(&data).unwrap(),
        );

        let err = service.deliver_now(job).await.unwrap_err();
        assert!(matches!(err, NotificationError::ProviderError(_)));
    }
}
