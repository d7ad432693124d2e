//! Generic HTTP webhook transport.
//!
//! Posts each [`PushMessage`] as JSON to a configured relay URL with
//! optional custom headers. A 404 or 410 from the relay means the
//! destination token is gone.

use std::collections::BTreeMap;

use duewatch_core::config::PushConfig;

use crate::traits::{PushMessage, PushTransport, TransportError};

/// Delivers messages as JSON over HTTP to a configured endpoint.
///
/// Environment variable references (`${VAR_NAME}`) in the URL and header
/// values are resolved at construction time.
#[derive(Debug)]
pub struct WebhookTransport {
    /// Target URL (env vars already resolved).
    url: String,
    /// Custom headers to include on every request.
    headers: BTreeMap<String, String>,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl WebhookTransport {
    /// Create a new webhook transport.
    ///
    /// Missing env vars referenced from `url` or header values produce a
    /// [`TransportError::Config`] error.
    pub fn new(url: String, headers: BTreeMap<String, String>) -> Result<Self, TransportError> {
        let resolved_url = expand_env(&url)?;

        let mut resolved_headers = BTreeMap::new();
        for (key, value) in &headers {
            resolved_headers.insert(key.clone(), expand_env(value)?);
        }

        Ok(Self {
            url: resolved_url,
            headers: resolved_headers,
            client: reqwest::Client::new(),
        })
    }

    pub fn from_config(config: &PushConfig) -> Result<Self, TransportError> {
        let url = config
            .webhook_url
            .clone()
            .ok_or_else(|| TransportError::Config("PUSH_WEBHOOK_URL is not set".to_string()))?;
        Self::new(url, config.webhook_header_map())
    }
}

#[async_trait::async_trait]
impl PushTransport for WebhookTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), TransportError> {
        let mut request = self.client.post(&self.url).json(message);

        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            tracing::debug!(url = %self.url, status = %status, "webhook push delivered");
            return Ok(());
        }

        let body_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
            return Err(TransportError::InvalidToken(format!(
                "relay returned {status}: {body_text}"
            )));
        }

        tracing::warn!(
            url = %self.url,
            %status,
            body = %body_text,
            "webhook returned non-2xx status"
        );
        Err(TransportError::Rejected {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("UNKNOWN").to_string(),
            message: body_text,
        })
    }

    fn transport_name(&self) -> &str {
        "webhook"
    }
}

/// Expand `${VAR}` references from the process environment.
fn expand_env(input: &str) -> Result<String, TransportError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| TransportError::Config(format!("unclosed ${{...}} in {input:?}")))?;
        let name = &after[..end];
        let value = std::env::var(name)
            .map_err(|_| TransportError::Config(format!("{name} is referenced but not set")))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}
