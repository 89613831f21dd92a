//! Token-authenticated delivery through `chat.postMessage`, with threading.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

use super::message::{ChatMessage, MessageStyle, build_message, step_message};
use super::{Notifier, POST_TIMEOUT, StepNotifier};
use crate::build::{BuildSnapshot, BuildStatus};
use crate::errors::{DeliveryError, MonitorError};

pub const SLACK_API: &str = "https://slack.com/api";

/// Response from `chat.postMessage` (subset of fields).
#[derive(Debug, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Posts to a channel and anchors every later message under the first one.
pub struct ThreadedNotifier {
    client: reqwest::Client,
    endpoint: String,
    channel: String,
    token: String,
    style: MessageStyle,
    /// `ts` of the first posted message; set once per session.
    thread_id: Option<String>,
    /// Highest step index posted so far, -1 before any.
    last_step_notified: i64,
    timeout: Duration,
}

impl ThreadedNotifier {
    pub fn with_api_base(
        api_base: &str,
        channel: impl Into<String>,
        token: impl Into<String>,
        style: MessageStyle,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat.postMessage", api_base.trim_end_matches('/')),
            channel: channel.into(),
            token: token.into(),
            style,
            thread_id: None,
            last_step_notified: -1,
            timeout: POST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    pub fn last_step_notified(&self) -> i64 {
        self.last_step_notified
    }

    async fn post(&self, message: &ChatMessage) -> Result<PostMessageResponse, DeliveryError> {
        match timeout(self.timeout, self.exchange(message)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout {
                endpoint: self.endpoint.clone(),
                after: self.timeout,
            }),
        }
    }

    async fn exchange(&self, message: &ChatMessage) -> Result<PostMessageResponse, DeliveryError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(message)
            .send()
            .await
            .map_err(|source| DeliveryError::Transport {
                endpoint: self.endpoint.clone(),
                source,
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| DeliveryError::Decode(e.to_string()))?;
        if !status.is_success() {
            return Err(DeliveryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: PostMessageResponse =
            serde_json::from_str(&body).map_err(|e| DeliveryError::Decode(e.to_string()))?;
        if !parsed.ok {
            return Err(DeliveryError::Rejected {
                error: parsed.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }

        info!(
            text = %message.text,
            ok = parsed.ok,
            ts = parsed.ts.as_deref().unwrap_or_default(),
            thread_ts = message.thread_ts.as_deref().unwrap_or_default(),
            "Posted message to Slack"
        );
        Ok(parsed)
    }
}

#[async_trait]
impl Notifier for ThreadedNotifier {
    async fn notify(&mut self, snapshot: &BuildSnapshot) -> Result<(), MonitorError> {
        let mut message = build_message(&self.style, snapshot)?.in_channel(&self.channel);
        if snapshot.status != BuildStatus::Working {
            message = message.in_thread(self.thread_id.as_deref());
        }

        let resp = self.post(&message).await?;
        if self.thread_id.is_none()
            && let Some(ts) = resp.ts.filter(|ts| !ts.is_empty())
        {
            debug!(thread_ts = %ts, "Anchored notification thread");
            self.thread_id = Some(ts);
        }
        Ok(())
    }

    fn steps(&mut self) -> Option<&mut dyn StepNotifier> {
        Some(self)
    }
}

#[async_trait]
impl StepNotifier for ThreadedNotifier {
    /// Post one threaded message per decided step, in order, stopping at the
    /// first undecided one.
    ///
    /// Steps already posted on an earlier call are posted again: the cursor
    /// is only a diagnostic and does not gate delivery.
    async fn notify_step(&mut self, snapshot: &BuildSnapshot) -> Result<(), MonitorError> {
        let Some(thread_id) = self.thread_id.clone() else {
            debug!("No thread anchor yet, skipping step messages");
            return Ok(());
        };

        for step in &snapshot.steps {
            debug!(
                step = step.index,
                status = ?step.state,
                last_step = self.last_step_notified,
                "Evaluating step"
            );
            if !step.state.is_decided() {
                return Ok(());
            }

            let message = step_message(step)
                .in_channel(&self.channel)
                .in_thread(Some(&thread_id));
            self.post(&message).await?;
            self.last_step_notified = self.last_step_notified.max(step.index as i64);
        }
        Ok(())
    }
}
