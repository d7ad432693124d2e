//! Transport that only logs, for dry runs and local development.

use crate::traits::{PushMessage, PushTransport, TransportError};

#[derive(Debug, Default)]
pub struct LogTransport;

#[async_trait::async_trait]
impl PushTransport for LogTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), TransportError> {
        let skip = message.token.chars().count().saturating_sub(6);
        let token_tail: String = message.token.chars().skip(skip).collect();
        tracing::info!(
            token = %format!("…{token_tail}"),
            title = %message.title,
            body = %message.body,
            "push (log only)"
        );
        Ok(())
    }

    fn transport_name(&self) -> &str {
        "log"
    }
}
