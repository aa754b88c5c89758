//! Notification kinds and their payload shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// The closed set of notification kinds this system sends.
///
/// The wire tag is the kebab-case name (`order-confirmation`, ...). The
/// processor matches exhaustively over this enum, so every kind has a
/// handler by construction; a wire tag outside this set fails to parse and
/// the job is failed permanently at dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    /// Receipt for a placed order.
    OrderConfirmation,
    /// Invitation to join a business account.
    BusinessInvitation,
    /// Passwordless login link.
    MagicLink,
    /// Password reset link.
    PasswordReset,
    /// Receipt for a redeemed gift card.
    GiftCardRedemption,
    /// Operational alert for administrators.
    AdminNotification,
}

/// A purchased line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    /// Preformatted unit price, e.g. "19.99".
    pub unit_price: String,
}

/// Caller-supplied order facts; the service adds URLs and branding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub order_id: String,
    pub items: Vec<OrderItem>,
    pub total: String,
    pub currency: String,
}

/// Template data for an order confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderConfirmationData {
    pub customer_name: String,
    pub order_id: String,
    pub items: Vec<OrderItem>,
    pub total: String,
    pub currency: String,
    pub order_url: String,
    pub company_name: String,
}

/// Template data for a business invitation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessInvitationData {
    pub invitee_name: String,
    pub inviter_name: String,
    pub business_name: String,
    pub accept_url: String,
    pub expires_in_days: u32,
    pub company_name: String,
}

/// Template data for a magic-link login email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicLinkData {
    pub user_name: String,
    pub login_url: String,
    pub expires_in_minutes: u32,
    pub company_name: String,
}

/// Template data for a password reset email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetData {
    pub user_name: String,
    pub reset_url: String,
    pub expires_in_hours: u32,
    pub company_name: String,
}

/// Template data for a gift-card redemption receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftCardRedemptionData {
    pub customer_name: String,
    /// Last characters of the card code; full codes never leave the
    /// redemption service.
    pub code_suffix: String,
    pub amount: String,
    pub currency: String,
    pub remaining_balance: String,
    pub company_name: String,
}

/// Template data for an admin alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminNotificationData {
    pub event: String,
    pub severity: String,
    pub details: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub company_name: String,
}
