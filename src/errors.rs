//! Typed error hierarchy for buildwatch.
//!
//! Three enums cover the three failure surfaces:
//! - `SourceError` — fetching a build snapshot failed
//! - `DeliveryError` — posting a notification failed
//! - `MonitorError` — a monitoring session ended abnormally

use thiserror::Error;

/// Errors from a status source fetch.
///
/// The monitor counts every variant against its error budget; the split only
/// tells the operator what went wrong.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transient build status failure: {0}")]
    Transient(String),

    #[error("Build status request rejected: {0}")]
    Fatal(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

/// Errors from posting a chat notification. Always fatal.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to post to {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("No response from {endpoint} within {after:?}")]
    Timeout {
        endpoint: String,
        after: std::time::Duration,
    },

    #[error("Chat API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unable to decode chat API response: {0}")]
    Decode(String),

    #[error("Chat API rejected message: {error}")]
    Rejected { error: String },
}

/// Errors that end a monitoring session.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Reached maximum number of errors ({max_errors}): {last}")]
    BudgetExhausted {
        max_errors: u32,
        #[source]
        last: SourceError,
    },

    #[error("Build snapshot has malformed {field}: {value:?}")]
    MalformedSnapshot { field: &'static str, value: String },

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}
