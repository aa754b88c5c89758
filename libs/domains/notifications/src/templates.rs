//! Email template rendering.
//!
//! One HTML + text template pair per [`NotificationKind`], rendered with
//! Handlebars. `render` is the typed boundary: the job's opaque payload is
//! deserialized into the kind's data struct before rendering, so a payload
//! that does not match its kind fails here (permanently) rather than
//! producing a half-rendered email.

use crate::error::{NotificationError, NotificationResult};
use crate::models::{
    AdminNotificationData, BusinessInvitationData, GiftCardRedemptionData, MagicLinkData,
    NotificationKind, OrderConfirmationData, PasswordResetData,
};
use handlebars::Handlebars;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Rendered email bodies; the subject rides on the job record.
#[derive(Debug, Clone)]
pub struct RenderedEmail {
    pub html: String,
    pub text: String,
}

pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Create an engine with every kind's templates registered.
    pub fn new() -> NotificationResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);

        let sources: [(&str, &str); 12] = [
            ("order-confirmation_html", ORDER_CONFIRMATION_HTML),
            ("order-confirmation_text", ORDER_CONFIRMATION_TEXT),
            ("business-invitation_html", BUSINESS_INVITATION_HTML),
            ("business-invitation_text", BUSINESS_INVITATION_TEXT),
            ("magic-link_html", MAGIC_LINK_HTML),
            ("magic-link_text", MAGIC_LINK_TEXT),
            ("password-reset_html", PASSWORD_RESET_HTML),
            ("password-reset_text", PASSWORD_RESET_TEXT),
            ("gift-card-redemption_html", GIFT_CARD_REDEMPTION_HTML),
            ("gift-card-redemption_text", GIFT_CARD_REDEMPTION_TEXT),
            ("admin-notification_html", ADMIN_NOTIFICATION_HTML),
            ("admin-notification_text", ADMIN_NOTIFICATION_TEXT),
        ];
        for (name, source) in sources {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| {
                    NotificationError::TemplateError(format!("failed to register {name}: {e}"))
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Render the templates for `kind` from the job's opaque payload.
    pub fn render(
        &self,
        kind: NotificationKind,
        payload: &serde_json::Value,
    ) -> NotificationResult<RenderedEmail> {
        match kind {
            NotificationKind::OrderConfirmation => {
                self.render_typed::<OrderConfirmationData>(kind, payload)
            }
            NotificationKind::BusinessInvitation => {
                self.render_typed::<BusinessInvitationData>(kind, payload)
            }
            NotificationKind::MagicLink => self.render_typed::<MagicLinkData>(kind, payload),
            NotificationKind::PasswordReset => {
                self.render_typed::<PasswordResetData>(kind, payload)
            }
            NotificationKind::GiftCardRedemption => {
                self.render_typed::<GiftCardRedemptionData>(kind, payload)
            }
            NotificationKind::AdminNotification => {
                self.render_typed::<AdminNotificationData>(kind, payload)
            }
        }
    }

    fn render_typed<T: DeserializeOwned + Serialize>(
        &self,
        kind: NotificationKind,
        payload: &serde_json::Value,
    ) -> NotificationResult<RenderedEmail> {
        let data: T =
            serde_json::from_value(payload.clone()).map_err(|e| NotificationError::PayloadError {
                kind: kind.to_string(),
                details: e.to_string(),
            })?;

        let html = self.handlebars.render(&format!("{kind}_html"), &data)?;
        let text = self.handlebars.render(&format!("{kind}_text"), &data)?;
        Ok(RenderedEmail { html, text })
    }
}

const ORDER_CONFIRMATION_HTML: &str = r#"<html><body>
<h2>Thanks for your order, {{customer_name}}!</h2>
<p>Order <strong>{{order_id}}</strong> is confirmed.</p>
<ul>
{{#each items}}<li>{{quantity}} × {{name}} — {{unit_price}}</li>
{{/each}}</ul>
<p>Total: <strong>{{total}} {{currency}}</strong></p>
<p><a href="{{order_url}}">View your order</a></p>
<p>— {{company_name}}</p>
</body></html>"#;

const ORDER_CONFIRMATION_TEXT: &str = r#"Thanks for your order, {{customer_name}}!

Order {{order_id}} is confirmed.
{{#each items}}- {{quantity}} x {{name}} ({{unit_price}})
{{/each}}
Total: {{total}} {{currency}}

View your order: {{order_url}}

- {{company_name}}"#;

const BUSINESS_INVITATION_HTML: &str = r#"<html><body>
<h2>Hi {{invitee_name}},</h2>
<p>{{inviter_name}} invited you to join <strong>{{business_name}}</strong>.</p>
<p><a href="{{accept_url}}">Accept the invitation</a></p>
<p>This invitation expires in {{expires_in_days}} days.</p>
<p>— {{company_name}}</p>
</body></html>"#;

const BUSINESS_INVITATION_TEXT: &str = r#"Hi {{invitee_name}},

{{inviter_name}} invited you to join {{business_name}}.

Accept the invitation: {{accept_url}}

This invitation expires in {{expires_in_days}} days.

- {{company_name}}"#;

const MAGIC_LINK_HTML: &str = r#"<html><body>
<h2>Hi {{user_name}},</h2>
<p><a href="{{login_url}}">Click here to log in</a></p>
<p>The link expires in {{expires_in_minutes}} minutes. If you did not
request it, you can ignore this email.</p>
<p>— {{company_name}}</p>
</body></html>"#;

const MAGIC_LINK_TEXT: &str = r#"Hi {{user_name}},

Log in: {{login_url}}

The link expires in {{expires_in_minutes}} minutes. If you did not
request it, you can ignore this email.

- {{company_name}}"#;

const PASSWORD_RESET_HTML: &str = r#"<html><body>
<h2>Hi {{user_name}},</h2>
<p><a href="{{reset_url}}">Reset your password</a></p>
<p>The link expires in {{expires_in_hours}} hours. If you did not request
a reset, you can ignore this email.</p>
<p>— {{company_name}}</p>
</body></html>"#;

const PASSWORD_RESET_TEXT: &str = r#"Hi {{user_name}},

Reset your password: {{reset_url}}

The link expires in {{expires_in_hours}} hours. If you did not request a
reset, you can ignore this email.

- {{company_name}}"#;

const GIFT_CARD_REDEMPTION_HTML: &str = r#"<html><body>
<h2>Hi {{customer_name}},</h2>
<p>Gift card ending in <strong>{{code_suffix}}</strong> was redeemed for
{{amount}} {{currency}}.</p>
<p>Remaining balance: {{remaining_balance}} {{currency}}</p>
<p>— {{company_name}}</p>
</body></html>"#;

const GIFT_CARD_REDEMPTION_TEXT: &str = r#"Hi {{customer_name}},

Gift card ending in {{code_suffix}} was redeemed for {{amount}} {{currency}}.
Remaining balance: {{remaining_balance}} {{currency}}

- {{company_name}}"#;

const ADMIN_NOTIFICATION_HTML: &str = r#"<html><body>
<h2>[{{severity}}] {{event}}</h2>
<p>At {{occurred_at}}:</p>
<pre>{{details}}</pre>
<p>— {{company_name}}</p>
</body></html>"#;

const ADMIN_NOTIFICATION_TEXT: &str = r#"[{{severity}}] {{event}}

At {{occurred_at}}:
{{details}}

- {{company_name}}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderItem;

    fn engine() -> TemplateEngine {
        TemplateEngine::new().unwrap()
    }

    #[test]
    fn test_render_order_confirmation() {
        let data = OrderConfirmationData {
            customer_name: "Ada".into(),
            order_id: "ord_42".into(),
            items: vec![OrderItem {
                name: "Widget".into(),
                quantity: 2,
                unit_price: "9.50".into(),
            }],
            total: "19.00".into(),
            currency: "EUR".into(),
            order_url: "https://shop.example.com/orders/ord_42".into(),
            company_name: "Courier".into(),
        };

        let rendered = engine()
            .render(
                NotificationKind::OrderConfirmation,
                &serde_json::to_value(&data).unwrap(),
            )
            .unwrap();

        assert!(rendered.html.contains("ord_42"));
        assert!(rendered.html.contains("2 × Widget"));
        assert!(rendered.text.contains("Total: 19.00 EUR"));
    }

    #[test]
    fn test_render_magic_link() {
        let data = MagicLinkData {
            user_name: "Ada".into(),
            login_url: "https://app.example.com/login?t=abc".into(),
            expires_in_minutes: 15,
            company_name: "Courier".into(),
        };

        let rendered = engine()
            .render(NotificationKind::MagicLink, &serde_json::to_value(&data).unwrap())
            .unwrap();
        assert!(rendered.text.contains("expires in 15 minutes"));
        assert!(rendered.html.contains("https://app.example.com/login?t=abc"));
    }

    #[test]
    fn test_payload_mismatch_is_rejected() {
        // A magic-link payload fed to the password-reset renderer.
        let wrong = serde_json::json!({"login_url": "https://x", "user_name": "Ada"});
        let err = engine()
            .render(NotificationKind::PasswordReset, &wrong)
            .unwrap_err();
        assert!(matches!(err, NotificationError::PayloadError { .. }));
    }

    #[test]
    fn test_every_kind_has_templates() {
        // Registration itself would fail in new() for a missing pair, but
        // keep the render path honest for the simple kinds.
        let data = PasswordResetData {
            user_name: "Ada".into(),
            reset_url: "https://app.example.com/reset?t=x".into(),
            expires_in_hours: 1,
            company_name: "Courier".into(),
        };
        engine()
            .render(NotificationKind::PasswordReset, &serde_json::to_value(&data).unwrap())
            .unwrap();
    }
}
