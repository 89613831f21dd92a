//! Chat notification transports.
//!
//! | Transport          | Threads | Step messages | Auth          |
//! |--------------------|---------|---------------|---------------|
//! | `WebhookNotifier`  | no      | no            | URL is secret |
//! | `ThreadedNotifier` | yes     | yes           | Bearer token  |
//!
//! Step notification is a separate capability (`StepNotifier`) that only the
//! threaded transport implements. The monitor asks for it through
//! [`Notifier::steps`] instead of calling a no-op.

pub mod emoji;
pub mod message;
pub mod threaded;
pub mod webhook;

use async_trait::async_trait;
use std::time::Duration;

use crate::build::BuildSnapshot;
use crate::config::{AuthMethod, WatchConfig};
use crate::errors::MonitorError;

pub use message::{ChatMessage, MessageStyle};
pub use threaded::ThreadedNotifier;
pub use webhook::WebhookNotifier;

/// Upper bound on one chat post, response body included.
pub const POST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build-level notifications: one "started" and one terminal message.
#[async_trait]
pub trait Notifier: Send {
    async fn notify(&mut self, snapshot: &BuildSnapshot) -> Result<(), MonitorError>;

    /// Per-step capability, if this transport has one.
    fn steps(&mut self) -> Option<&mut dyn StepNotifier> {
        None
    }
}

/// Per-step messages threaded under the build's parent message.
#[async_trait]
pub trait StepNotifier: Send {
    async fn notify_step(&mut self, snapshot: &BuildSnapshot) -> Result<(), MonitorError>;
}

/// Build the transport selected by the configuration.
pub fn from_config(config: &WatchConfig) -> Box<dyn Notifier> {
    let style = MessageStyle::new(
        config.project.clone(),
        config.project_id.clone(),
        config.alert_level,
        config.alert_mention.clone(),
    );
    match config.auth {
        AuthMethod::Webhook => Box::new(WebhookNotifier::new(config.webhook.clone(), style)),
        AuthMethod::Token => Box::new(ThreadedNotifier::with_api_base(
            &config.slack_api,
            config.channel.clone(),
            config.token.clone(),
            style,
        )),
    }
}
