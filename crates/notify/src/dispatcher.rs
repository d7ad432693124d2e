//! Sends a single notification and classifies the result.
//!
//! The dispatcher never fails: every transport error, including a
//! per-call timeout, is folded into a [`DeliveryOutcome`] so the caller
//! can decide whether to record the notification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::traits::{PresentationHints, PushMessage, PushTransport, TransportError};

/// Result of one dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The transport accepted the message.
    Delivered,
    /// The destination token is malformed or no longer registered.
    InvalidToken(String),
    /// Any other failure, timeouts included.
    TransportError(String),
}

/// Wraps a [`PushTransport`] with fixed presentation hints and a per-call timeout.
pub struct Dispatcher {
    transport: Arc<dyn PushTransport>,
    hints: PresentationHints,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn PushTransport>,
        hints: PresentationHints,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            hints,
            timeout,
        }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.transport_name()
    }

    /// Deliver `title`/`body` to `token`.
    pub async fn dispatch(&self, token: &str, title: &str, body: &str) -> DeliveryOutcome {
        let message = PushMessage {
            token: token.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            hints: self.hints.clone(),
        };

        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.transport.send(&message)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.timeout)),
        };
        let duration_ms = start.elapsed().as_millis() as u64;
        let transport = self.transport.transport_name();

        match result {
            Ok(()) => {
                tracing::info!(transport, duration_ms, "Push notification delivered");
                DeliveryOutcome::Delivered
            }
            Err(e) if e.is_invalid_token() => {
                // Token cleanup is left to the owner of the user record.
                tracing::warn!(
                    transport,
                    error = %e,
                    duration_ms,
                    "Push destination token is invalid; consider refreshing it"
                );
                DeliveryOutcome::InvalidToken(e.to_string())
            }
            Err(e) => {
                tracing::warn!(
                    transport,
                    error = %e,
                    duration_ms,
                    "Push notification delivery failed"
                );
                DeliveryOutcome::TransportError(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Behaviour {
        Accept,
        DeadToken,
        Reject,
        Hang,
    }

    struct MockTransport {
        behaviour: Behaviour,
        send_count: Arc<AtomicUsize>,
        last: Mutex<Option<PushMessage>>,
    }

    impl MockTransport {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                send_count: Arc::new(AtomicUsize::new(0)),
                last: Mutex::new(None),
            }
        }
    }

    #[async_trait::async_trait]
    impl PushTransport for MockTransport {
        async fn send(&self, message: &PushMessage) -> Result<(), TransportError> {
            self.send_count.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some(message.clone());
            match self.behaviour {
                Behaviour::Accept => Ok(()),
                Behaviour::DeadToken => Err(TransportError::InvalidToken("UNREGISTERED".into())),
                Behaviour::Reject => Err(TransportError::Rejected {
                    status: 503,
                    code: "UNAVAILABLE".into(),
                    message: "try later".into(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(())
                }
            }
        }

        fn transport_name(&self) -> &str {
            "mock"
        }
    }

    fn hints() -> PresentationHints {
        PresentationHints {
            icon: Some("https://example.com/icon-192.png".into()),
            badge: None,
            require_interaction: true,
            link: Some("https://example.com/".into()),
        }
    }

    #[tokio::test]
    async fn delivered_carries_hints() {
        let transport = Arc::new(MockTransport::new(Behaviour::Accept));
        let dispatcher = Dispatcher::new(transport.clone(), hints(), Duration::from_secs(1));

        let outcome = dispatcher.dispatch("tok-1", "Title", "Body").await;
        assert_eq!(outcome, DeliveryOutcome::Delivered);
        assert_eq!(transport.send_count.load(Ordering::SeqCst), 1);

        let sent = transport.last.lock().unwrap().clone().unwrap();
        assert_eq!(sent.token, "tok-1");
        assert_eq!(sent.title, "Title");
        assert!(sent.hints.require_interaction);
        assert_eq!(sent.hints.link.as_deref(), Some("https://example.com/"));
    }

    #[tokio::test]
    async fn dead_token_is_distinct() {
        let dispatcher = Dispatcher::new(
            Arc::new(MockTransport::new(Behaviour::DeadToken)),
            hints(),
            Duration::from_secs(1),
        );
        let outcome = dispatcher.dispatch("tok", "t", "b").await;
        assert!(matches!(outcome, DeliveryOutcome::InvalidToken(_)));
    }

    #[tokio::test]
    async fn rejection_is_transport_error() {
        let dispatcher = Dispatcher::new(
            Arc::new(MockTransport::new(Behaviour::Reject)),
            hints(),
            Duration::from_secs(1),
        );
        match dispatcher.dispatch("tok", "t", "b").await {
            DeliveryOutcome::TransportError(msg) => assert!(msg.contains("UNAVAILABLE")),
            other => panic!("expected TransportError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stuck_send_times_out() {
        let dispatcher = Dispatcher::new(
            Arc::new(MockTransport::new(Behaviour::Hang)),
            hints(),
            Duration::from_millis(50),
        );
        match dispatcher.dispatch("tok", "t", "b").await {
            DeliveryOutcome::TransportError(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected timeout, got: {other:?}"),
        }
    }
}
