//! Push notification delivery for order deadline alerts.
//!
//! This crate provides:
//! - `PushTransport` trait for pluggable delivery backends
//! - FCM, webhook, and log-only transport implementations
//! - Minijinja message templates per notification threshold
//! - Dispatcher that bounds each send and classifies the outcome

pub mod dispatcher;
pub mod fcm;
pub mod log;
pub mod templating;
pub mod traits;
pub mod webhook;

use std::sync::Arc;

use duewatch_core::config::{PushConfig, PushProvider};

pub use dispatcher::{DeliveryOutcome, Dispatcher};
pub use templating::{MessageContext, MessageTemplates, RenderedMessage};
pub use traits::{PresentationHints, PushMessage, PushTransport, TransportError};

/// Build the transport selected by `config.provider`.
/// FCM resolves application default credentials here.
pub async fn transport_from_config(
    config: &PushConfig,
) -> Result<Arc<dyn PushTransport>, TransportError> {
    let provider = config
        .provider()
        .map_err(|e| TransportError::Config(e.to_string()))?;
    let transport: Arc<dyn PushTransport> = match provider {
        PushProvider::Fcm => Arc::new(fcm::FcmTransport::from_config(config).await?),
        PushProvider::Webhook => Arc::new(webhook::WebhookTransport::from_config(config)?),
        PushProvider::Log => Arc::new(log::LogTransport),
    };
    Ok(transport)
}
