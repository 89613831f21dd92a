//! Chat message construction, independent of the transport that delivers it.

use serde::Serialize;

use super::emoji::{build_emoji, step_emoji};
use crate::build::{BuildSnapshot, BuildStatus, StepStatus};
use crate::config::AlertLevel;
use crate::errors::MonitorError;

/// Display name the trigger passes when no project was configured.
const UNKNOWN_PROJECT: &str = "unknown";

/// Everything needed to render build-level messages for one project.
#[derive(Debug, Clone)]
pub struct MessageStyle {
    pub project: String,
    pub project_id: String,
    pub alert_level: AlertLevel,
    pub alert_mention: String,
}

impl MessageStyle {
    pub fn new(
        project: impl Into<String>,
        project_id: impl Into<String>,
        alert_level: AlertLevel,
        alert_mention: impl Into<String>,
    ) -> Self {
        let project = project.into();
        Self {
            project: if project == UNKNOWN_PROJECT {
                String::new()
            } else {
                project
            },
            project_id: project_id.into(),
            alert_level,
            alert_mention: alert_mention.into(),
        }
    }

    /// Mention prefix appended to terminal messages, with a trailing space,
    /// or empty.
    fn alert_tag(&self, status: &BuildStatus) -> String {
        if self.alert_level == AlertLevel::Elevated && status.is_alerting() {
            format!("{} ", self.alert_mention)
        } else {
            String::new()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub fallback: String,
    pub actions: Vec<Action>,
}

/// JSON body accepted by both incoming webhooks and `chat.postMessage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

impl ChatMessage {
    fn text(text: String) -> Self {
        Self {
            text,
            attachments: Vec::new(),
            channel: None,
            thread_ts: None,
        }
    }

    pub fn in_channel(mut self, channel: &str) -> Self {
        self.channel = Some(channel.to_string());
        self
    }

    pub fn in_thread(mut self, thread_ts: Option<&str>) -> Self {
        self.thread_ts = thread_ts.map(str::to_string);
        self
    }
}

pub fn console_url(build_id: &str, project_id: &str) -> String {
    format!(
        "https://console.cloud.google.com/cloud-build/builds/{}?project={}",
        build_id, project_id
    )
}

/// Render a duration in the compact `1h2m3s` form. Minutes and seconds are
/// always present once a larger unit is, so 120s is `2m0s`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let total = duration.num_seconds();
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{sign}{h}h{m}m{s}s")
    } else if m > 0 {
        format!("{sign}{m}m{s}s")
    } else {
        format!("{sign}{s}s")
    }
}

fn details_attachment(url: &str) -> Attachment {
    Attachment {
        fallback: format!("Open build details at {}", url),
        actions: vec![Action {
            kind: "button".to_string(),
            text: "Open details".to_string(),
            url: url.to_string(),
        }],
    }
}

/// Build-level message: "started" for WORKING, otherwise the terminal summary.
///
/// Terminal summaries need both timestamps; a snapshot missing either is
/// rejected as malformed.
pub fn build_message(style: &MessageStyle, snapshot: &BuildSnapshot) -> Result<ChatMessage, MonitorError> {
    let url = console_url(&snapshot.id, &style.project_id);
    let emoji = build_emoji(&snapshot.status);

    let text = if snapshot.status == BuildStatus::Working {
        format!("{} *{}* build started", emoji, style.project)
    } else {
        let duration = format_duration(snapshot.duration()?);
        format!(
            "{} *{}* build _{}_ after _{}_ {}",
            emoji,
            style.project,
            snapshot.status,
            duration,
            style.alert_tag(&snapshot.status)
        )
    };

    let mut message = ChatMessage::text(text);
    message.attachments.push(details_attachment(&url));
    Ok(message)
}

pub fn step_message(step: &StepStatus) -> ChatMessage {
    ChatMessage::text(format!(
        "{} *Step {}*: {}",
        step_emoji(&step.state),
        step.index,
        step.id
    ))
}
