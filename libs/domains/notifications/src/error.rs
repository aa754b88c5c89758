//! Error types for the notifications domain.

use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Errors that can occur in the notifications domain.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Email provider rejected or failed to deliver.
    #[error("Email provider error: {0}")]
    ProviderError(String),

    /// Template rendering failed.
    #[error("Template rendering error: {0}")]
    TemplateError(String),

    /// Payload did not match the shape the kind's handler expects.
    #[error("Invalid payload for {kind}: {details}")]
    PayloadError { kind: String, details: String },

    /// Invalid recipient address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<handlebars::RenderError> for NotificationError {
    fn from(err: handlebars::RenderError) -> Self {
        NotificationError::TemplateError(err.to_string())
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::ProviderError(err.to_string())
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        NotificationError::Internal(format!("JSON serialization error: {}", err))
    }
}

impl NotificationError {
    /// Whether retrying could plausibly succeed. Provider/network problems
    /// are worth retrying; a payload that does not parse never will be.
    pub fn is_transient(&self) -> bool {
        matches!(self, NotificationError::ProviderError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(NotificationError::ProviderError("451".into()).is_transient());
        assert!(!NotificationError::TemplateError("bad".into()).is_transient());
        assert!(
            !NotificationError::PayloadError {
                kind: "magic-link".into(),
                details: "missing login_url".into()
            }
            .is_transient()
        );
    }
}
