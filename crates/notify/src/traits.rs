//! Push transport trait definition and shared error types.

use std::time::Duration;

use duewatch_core::config::PushConfig;

/// Errors that can occur during push delivery.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("destination token rejected: {0}")]
    InvalidToken(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport rejected message ({status}): {code}: {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Whether the destination token is malformed or no longer registered.
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, TransportError::InvalidToken(_))
    }
}

/// Display hints forwarded alongside the title and body.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PresentationHints {
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub require_interaction: bool,
    /// Deep link opened when the notification is clicked.
    pub link: Option<String>,
}

impl PresentationHints {
    pub fn from_config(config: &PushConfig) -> Self {
        Self {
            icon: config.icon_url.clone(),
            badge: config.badge_url.clone().or_else(|| config.icon_url.clone()),
            require_interaction: config.require_interaction,
            link: config.link_url.clone(),
        }
    }
}

/// A message ready for delivery to one destination token.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub hints: PresentationHints,
}

/// Trait for push delivery backends.
#[async_trait::async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver one message. Implementations must report dead tokens as
    /// [`TransportError::InvalidToken`].
    async fn send(&self, message: &PushMessage) -> Result<(), TransportError>;

    /// Human-readable name for this transport (e.g., "fcm", "webhook").
    fn transport_name(&self) -> &str;
}
