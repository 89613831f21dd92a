//! Point-in-time build status as reported by Cloud Build.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::errors::MonitorError;

/// Lifecycle status of a whole build.
///
/// Deserialized from the wire string; values this crate does not know about
/// are kept verbatim in `Other` so they can still be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum BuildStatus {
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Cancelled,
    StatusUnknown,
    Other(String),
}

impl From<String> for BuildStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "QUEUED" => BuildStatus::Queued,
            "WORKING" => BuildStatus::Working,
            "SUCCESS" => BuildStatus::Success,
            "FAILURE" => BuildStatus::Failure,
            "INTERNAL_ERROR" => BuildStatus::InternalError,
            "TIMEOUT" => BuildStatus::Timeout,
            "CANCELLED" => BuildStatus::Cancelled,
            "STATUS_UNKNOWN" => BuildStatus::StatusUnknown,
            _ => BuildStatus::Other(s),
        }
    }
}

impl From<&str> for BuildStatus {
    fn from(s: &str) -> Self {
        BuildStatus::from(s.to_string())
    }
}

impl BuildStatus {
    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::Queued => "QUEUED",
            BuildStatus::Working => "WORKING",
            BuildStatus::Success => "SUCCESS",
            BuildStatus::Failure => "FAILURE",
            BuildStatus::InternalError => "INTERNAL_ERROR",
            BuildStatus::Timeout => "TIMEOUT",
            BuildStatus::Cancelled => "CANCELLED",
            BuildStatus::StatusUnknown => "STATUS_UNKNOWN",
            BuildStatus::Other(s) => s,
        }
    }

    /// Statuses after which the build will not change again.
    ///
    /// `STATUS_UNKNOWN` is deliberately absent: the session keeps polling.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BuildStatus::Success
                | BuildStatus::Failure
                | BuildStatus::InternalError
                | BuildStatus::Timeout
                | BuildStatus::Cancelled
        )
    }

    /// Statuses that page the on-call mention when alerting is elevated.
    pub fn is_alerting(&self) -> bool {
        matches!(
            self,
            BuildStatus::Timeout | BuildStatus::Failure | BuildStatus::InternalError
        )
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single build step. Steps have their own terminal set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Queued,
    Working,
    Success,
    Failure,
    InternalError,
    Timeout,
    Expired,
    Cancelled,
    StatusUnknown,
    Other(String),
}

impl From<&str> for StepState {
    fn from(s: &str) -> Self {
        match s {
            "" => StepState::Pending,
            "QUEUED" => StepState::Queued,
            "WORKING" => StepState::Working,
            "SUCCESS" => StepState::Success,
            "FAILURE" => StepState::Failure,
            "INTERNAL_ERROR" => StepState::InternalError,
            "TIMEOUT" => StepState::Timeout,
            "EXPIRED" => StepState::Expired,
            "CANCELLED" => StepState::Cancelled,
            "STATUS_UNKNOWN" => StepState::StatusUnknown,
            other => StepState::Other(other.to_string()),
        }
    }
}

impl StepState {
    /// A step is decided once it has left the queued/working/empty states.
    pub fn is_decided(&self) -> bool {
        !matches!(
            self,
            StepState::Pending | StepState::Queued | StepState::Working
        )
    }
}

/// One entry of the build's ordered step list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepStatus {
    /// Position in the step sequence; stable across polls.
    pub index: usize,
    pub id: String,
    pub state: StepState,
}

#[derive(Debug, Deserialize)]
struct WireStep {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBuild {
    id: String,
    #[serde(default = "unknown_status")]
    status: BuildStatus,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    finish_time: Option<String>,
    #[serde(default)]
    steps: Vec<WireStep>,
}

fn unknown_status() -> BuildStatus {
    BuildStatus::StatusUnknown
}

/// One polled, immutable view of a build.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "WireBuild")]
pub struct BuildSnapshot {
    pub id: String,
    pub status: BuildStatus,
    /// RFC 3339 timestamps, kept raw until a message needs them.
    pub start_time: Option<String>,
    pub finish_time: Option<String>,
    pub steps: Vec<StepStatus>,
}

impl From<WireBuild> for BuildSnapshot {
    fn from(wire: WireBuild) -> Self {
        let steps = wire
            .steps
            .into_iter()
            .enumerate()
            .map(|(index, step)| StepStatus {
                index,
                id: if step.id.is_empty() { step.name } else { step.id },
                state: StepState::from(step.status.as_str()),
            })
            .collect();
        Self {
            id: wire.id,
            status: wire.status,
            start_time: wire.start_time,
            finish_time: wire.finish_time,
            steps,
        }
    }
}

impl BuildSnapshot {
    /// Wall time between start and finish, truncated to whole seconds.
    pub fn duration(&self) -> Result<chrono::Duration, MonitorError> {
        let start = parse_timestamp("startTime", self.start_time.as_deref())?;
        let finish = parse_timestamp("finishTime", self.finish_time.as_deref())?;
        Ok(chrono::Duration::seconds((finish - start).num_seconds()))
    }
}

fn parse_timestamp(field: &'static str, raw: Option<&str>) -> Result<DateTime<Utc>, MonitorError> {
    let raw = raw.unwrap_or_default();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| MonitorError::MalformedSnapshot {
            field,
            value: raw.to_string(),
        })
}
