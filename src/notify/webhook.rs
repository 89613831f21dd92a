//! Incoming-webhook delivery: one endpoint, no threads, no step messages.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{Notifier, POST_TIMEOUT};
use super::message::{MessageStyle, build_message};
use crate::build::BuildSnapshot;
use crate::errors::{DeliveryError, MonitorError};

/// Posts build-level messages to a Slack incoming webhook.
///
/// Webhooks return no message id, so there is nothing to thread under and
/// this type does not implement `StepNotifier`.
pub struct WebhookNotifier {
    client: reqwest::Client,
    webhook: String,
    style: MessageStyle,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(webhook: impl Into<String>, style: MessageStyle) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook: webhook.into(),
            style,
            timeout: POST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&mut self, snapshot: &BuildSnapshot) -> Result<(), MonitorError> {
        let message = build_message(&self.style, snapshot)?;
        let exchange = async {
            let resp = self
                .client
                .post(&self.webhook)
                .json(&message)
                .send()
                .await
                .map_err(|source| DeliveryError::Transport {
                    endpoint: "webhook".to_string(),
                    source,
                })?;

            // The webhook answers with plain text; it is logged, never interpreted.
            let status = resp.status();
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(error = %e, "Failed to read webhook response body");
                    String::new()
                }
            };
            Ok::<_, DeliveryError>((status, body))
        };

        let (status, body) = match timeout(self.timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(DeliveryError::Timeout {
                    endpoint: "webhook".to_string(),
                    after: self.timeout,
                }
                .into());
            }
        };
        if !status.is_success() {
            warn!(status = status.as_u16(), body = %body, "Webhook answered with non-success status");
        }
        info!(text = %message.text, response = %body, "Posted message to Slack webhook");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildStatus;
    use crate::config::AlertLevel;
    use axum::{Json, Router, extract::State, http::HeaderMap, routing::post};
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Received {
        bodies: Vec<serde_json::Value>,
        content_types: Vec<String>,
        authorization: Vec<Option<String>>,
    }

    async fn fake_webhook() -> (String, Arc<Mutex<Received>>) {
        let received = Arc::new(Mutex::new(Received::default()));
        let app = Router::new()
            .route(
                "/hook",
                post(
                    |State(r): State<Arc<Mutex<Received>>>,
                     headers: HeaderMap,
                     Json(body): Json<serde_json::Value>| async move {
                        let mut r = r.lock().await;
                        r.bodies.push(body);
                        r.content_types.push(
                            headers
                                .get("content-type")
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or_default()
                                .to_string(),
                        );
                        r.authorization.push(
                            headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                        );
                        "ok"
                    },
                ),
            )
            .with_state(received.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{}/hook", addr), received)
    }

    fn snapshot(status: &str) -> BuildSnapshot {
        BuildSnapshot {
            id: "b-1".into(),
            status: BuildStatus::from(status),
            start_time: Some("2024-01-01T00:00:00Z".into()),
            finish_time: Some("2024-01-01T00:00:07Z".into()),
            steps: vec![],
        }
    }

    #[tokio::test]
    async fn test_posts_json_without_auth() {
        let (url, received) = fake_webhook().await;
        let style = MessageStyle::new("shop", "proj", AlertLevel::Normal, "@oncall");
        let mut notifier = WebhookNotifier::new(url, style);

        notifier.notify(&snapshot("WORKING")).await.unwrap();
        notifier.notify(&snapshot("SUCCESS")).await.unwrap();

        let r = received.lock().await;
        assert_eq!(r.bodies.len(), 2);
        assert_eq!(r.bodies[0]["text"], ":hammer: *shop* build started");
        assert_eq!(r.bodies[1]["text"], ":white_check_mark: *shop* build _SUCCESS_ after _7s_ ");
        assert!(r.bodies[1].get("thread_ts").is_none());
        assert!(r.bodies[1].get("channel").is_none());
        assert!(r.content_types.iter().all(|c| c.starts_with("application/json")));
        assert!(r.authorization.iter().all(Option::is_none));
    }

    #[tokio::test]
    async fn test_has_no_step_capability() {
        let style = MessageStyle::new("shop", "proj", AlertLevel::Normal, "@oncall");
        let mut notifier = WebhookNotifier::new("http://127.0.0.1:9/hook", style);
        assert!(notifier.steps().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_webhook_is_delivery_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let style = MessageStyle::new("shop", "proj", AlertLevel::Normal, "@oncall");
        let mut notifier = WebhookNotifier::new(format!("http://{}/hook", addr), style);
        let err = notifier.notify(&snapshot("WORKING")).await.unwrap_err();
        assert!(matches!(
            err,
            MonitorError::Delivery(DeliveryError::Transport { .. })
        ));
    }

    /// Accepts connections and never answers them.
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}/hook", addr)
    }

    #[tokio::test]
    async fn test_unresponsive_webhook_times_out() {
        let style = MessageStyle::new("shop", "proj", AlertLevel::Normal, "@oncall");
        let mut notifier = WebhookNotifier::new(silent_server().await, style)
            .with_timeout(Duration::from_millis(200));

        let err = notifier.notify(&snapshot("WORKING")).await.unwrap_err();
        match err {
            MonitorError::Delivery(DeliveryError::Timeout { endpoint, after }) => {
                assert_eq!(endpoint, "webhook");
                assert_eq!(after, Duration::from_millis(200));
            }
            other => panic!("Expected Delivery(Timeout), got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_response_body_is_not_fatal() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        // Promise a longer body than is sent, then hang up.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 64 * 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\nok")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        let style = MessageStyle::new("shop", "proj", AlertLevel::Normal, "@oncall");
        let mut notifier = WebhookNotifier::new(format!("http://{}/hook", addr), style);
        notifier.notify(&snapshot("WORKING")).await.unwrap();
    }
}
