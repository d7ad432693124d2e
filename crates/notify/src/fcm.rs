//! Firebase Cloud Messaging (HTTP v1) transport.
//!
//! Sends web-push messages via `projects/{id}/messages:send`, authenticated
//! with a token from application default credentials for every request. Dead
//! registration tokens (`UNREGISTERED`, or an `INVALID_ARGUMENT` that
//! names the token) are reported as [`TransportError::InvalidToken`].

use std::sync::Arc;

use duewatch_core::config::PushConfig;
use gcp_auth::TokenProvider;

use crate::traits::{PushMessage, PushTransport, TransportError};

/// OAuth2 scope required by `messages:send`.
pub const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Where the bearer token for each request comes from.
enum Credentials {
    /// Fixed token from `FCM_ACCESS_TOKEN`. Expires after about an hour.
    Static(String),
    /// Application default credentials; gcp_auth caches and refreshes.
    Provider(Arc<dyn TokenProvider>),
}

/// Delivers messages through the FCM HTTP v1 API.
pub struct FcmTransport {
    endpoint: String,
    project_id: String,
    credentials: Credentials,
    client: reqwest::Client,
}

impl std::fmt::Debug for FcmTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match self.credentials {
            Credentials::Static(_) => "static",
            Credentials::Provider(_) => "gcp_auth",
        };
        f.debug_struct("FcmTransport")
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("auth", &auth)
            .finish_non_exhaustive()
    }
}

impl FcmTransport {
    /// Create a transport that asks `provider` for a fresh token on every send.
    /// `endpoint` is the API origin without a trailing path.
    pub fn with_token_provider(
        endpoint: String,
        project_id: String,
        provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, TransportError> {
        Self::build(endpoint, project_id, Credentials::Provider(provider))
    }

    /// Create a transport that always sends `access_token`.
    pub fn with_static_token(
        endpoint: String,
        project_id: String,
        access_token: String,
    ) -> Result<Self, TransportError> {
        if access_token.trim().is_empty() {
            return Err(TransportError::Config(
                "FCM access token must not be empty".to_string(),
            ));
        }
        Self::build(endpoint, project_id, Credentials::Static(access_token))
    }

    fn build(
        endpoint: String,
        project_id: String,
        credentials: Credentials,
    ) -> Result<Self, TransportError> {
        if project_id.trim().is_empty() {
            return Err(TransportError::Config(
                "FCM project id must not be empty".to_string(),
            ));
        }
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project_id,
            credentials,
            client: reqwest::Client::new(),
        })
    }

    /// Build from config. `FCM_ACCESS_TOKEN` overrides application default
    /// credentials when set.
    pub async fn from_config(config: &PushConfig) -> Result<Self, TransportError> {
        let project_id = config
            .fcm_project_id
            .clone()
            .ok_or_else(|| TransportError::Config("FCM_PROJECT_ID is not set".to_string()))?;
        let endpoint = config.fcm_endpoint.clone();

        if let Some(token) = config.fcm_access_token.clone() {
            tracing::warn!("Using static FCM_ACCESS_TOKEN; sends fail once it expires");
            return Self::with_static_token(endpoint, project_id, token);
        }

        let provider = gcp_auth::provider()
            .await
            .map_err(|e| TransportError::Auth(format!("failed to initialize GCP auth: {e}")))?;
        Self::with_token_provider(endpoint, project_id, provider)
    }

    fn send_url(&self) -> String {
        format!("{}/v1/projects/{}/messages:send", self.endpoint, self.project_id)
    }

    /// Bearer token for the next request.
    async fn access_token(&self) -> Result<String, TransportError> {
        match &self.credentials {
            Credentials::Static(token) => Ok(token.clone()),
            Credentials::Provider(provider) => {
                let token = provider
                    .token(&[FCM_SCOPE])
                    .await
                    .map_err(|e| TransportError::Auth(format!("failed to get FCM token: {e}")))?;
                Ok(token.as_str().to_string())
            }
        }
    }
}

/// Build the `messages:send` request body.
pub(crate) fn build_payload(message: &PushMessage) -> serde_json::Value {
    let mut webpush_notification = serde_json::json!({
        "requireInteraction": message.hints.require_interaction,
    });
    if let Some(ref icon) = message.hints.icon {
        webpush_notification["icon"] = serde_json::Value::String(icon.clone());
    }
    if let Some(ref badge) = message.hints.badge {
        webpush_notification["badge"] = serde_json::Value::String(badge.clone());
    }

    let mut webpush = serde_json::json!({ "notification": webpush_notification });
    if let Some(ref link) = message.hints.link {
        webpush["fcm_options"] = serde_json::json!({ "link": link });
    }

    serde_json::json!({
        "message": {
            "token": message.token,
            "notification": {
                "title": message.title,
                "body": message.body,
            },
            "webpush": webpush,
        }
    })
}

/// Map a non-2xx FCM response to a [`TransportError`].
pub(crate) fn classify_error(status: u16, body: &serde_json::Value) -> TransportError {
    let error = body.get("error");
    let code = error
        .and_then(|e| e.get("status"))
        .and_then(|s| s.as_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(|m| m.as_str())
        .unwrap_or_default()
        .to_string();
    let fcm_code = error
        .and_then(|e| e.get("details"))
        .and_then(|d| d.as_array())
        .and_then(|details| {
            details
                .iter()
                .find_map(|d| d.get("errorCode").and_then(|c| c.as_str()))
        });

    let unregistered = fcm_code == Some("UNREGISTERED") || status == 404;
    let bad_token = code == "INVALID_ARGUMENT"
        && message.to_lowercase().contains("registration token");

    if unregistered || bad_token {
        return TransportError::InvalidToken(format!(
            "{}: {}",
            fcm_code.unwrap_or(code.as_str()),
            message
        ));
    }

    TransportError::Rejected {
        status,
        code: fcm_code.map(str::to_string).unwrap_or(code),
        message,
    }
}

#[async_trait::async_trait]
impl PushTransport for FcmTransport {
    async fn send(&self, message: &PushMessage) -> Result<(), TransportError> {
        let access_token = self.access_token().await?;
        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(&access_token)
            .json(&build_payload(message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(project = %self.project_id, "FCM accepted message");
            return Ok(());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .unwrap_or(serde_json::Value::Null);
        Err(classify_error(status.as_u16(), &body))
    }

    fn transport_name(&self) -> &str {
        "fcm"
    }
}
