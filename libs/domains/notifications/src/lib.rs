//! Notifications Domain
//!
//! Transactional email notifications delivered through the background job
//! queue.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   API Handler   │  ← decides to notify
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ NotificationSvc │  ← builds payload, enqueues via QueueClient
//! └────────┬────────┘      (direct delivery if the store is down)
//!          │
//! ┌────────▼────────┐
//! │  Durable queue  │  ← Redis-backed job store
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │   Worker pool   │  ← claims jobs, dispatches by kind
//! └────────┬────────┘
//!          │
//! ┌────────▼────────┐
//! │ Email provider  │  ← SMTP, SendGrid
//! └─────────────────┘
//! ```
//!
//! The kind → handler table is a single exhaustive `match` over
//! [`NotificationKind`]; adding a kind without a template and renderer is
//! a compile error. The pooled worker and the direct-delivery fallback go
//! through the same dispatch entry point.

pub mod error;
pub mod models;
pub mod processor;
pub mod providers;
pub mod service;
pub mod templates;

pub use error::{NotificationError, NotificationResult};
pub use models::{
    AdminNotificationData, BusinessInvitationData, GiftCardRedemptionData, MagicLinkData,
    NotificationKind, OrderConfirmationData, OrderItem, OrderSummary, PasswordResetData,
};
pub use processor::NotificationProcessor;
pub use providers::{
    EmailContent, EmailProvider, SendGridConfig, SendGridProvider, SentEmail, SmtpConfig,
    SmtpProvider,
};
pub use service::{NotificationService, NotificationServiceConfig};
pub use templates::{RenderedEmail, TemplateEngine};
