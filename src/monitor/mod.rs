//! Polling state machine for one monitored build.
//!
//! Each tick fetches a fresh snapshot and maps its status to a transition:
//!
//! | Status          | Seen WORKING before | Transition | Notifications            |
//! |-----------------|---------------------|------------|--------------------------|
//! | WORKING         | no                  | `Started`  | notify (start)           |
//! | WORKING         | yes                 | `Progress` | steps                    |
//! | terminal        | either              | `Finished` | steps, then notify; stop |
//! | anything else   | either              | `Idle`     | none                     |
//!
//! Fetch failures are retried at the same cadence until more than
//! `max_errors` happen in a row, which ends the session.

pub mod ticker;

use tracing::{error, info, warn};

use crate::build::{BuildSnapshot, BuildStatus, StatusSource};
use crate::errors::MonitorError;
use crate::notify::Notifier;

pub use ticker::{SleepTicker, Ticker};

/// What a successfully fetched snapshot means for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    Progress,
    Finished,
    Idle,
}

/// Per-session monitor bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub has_seen_working: bool,
    pub consecutive_errors: u32,
}

impl MonitorState {
    /// Classify a fetched status, flipping `has_seen_working` on the first
    /// WORKING so the start transition fires once.
    pub fn observe(&mut self, status: &BuildStatus) -> Transition {
        self.consecutive_errors = 0;
        if *status == BuildStatus::Working {
            if self.has_seen_working {
                Transition::Progress
            } else {
                self.has_seen_working = true;
                Transition::Started
            }
        } else if status.is_terminal() {
            Transition::Finished
        } else {
            Transition::Idle
        }
    }

    /// Count a failed fetch. Returns `true` while the budget still allows a retry.
    pub fn record_error(&mut self, max_errors: u32) -> bool {
        self.consecutive_errors += 1;
        self.consecutive_errors <= max_errors
    }
}

pub struct Monitor<S, T> {
    source: S,
    notifier: Box<dyn Notifier>,
    ticker: T,
    build_id: String,
    max_errors: u32,
    state: MonitorState,
}

impl<S: StatusSource, T: Ticker> Monitor<S, T> {
    pub fn new(
        build_id: impl Into<String>,
        source: S,
        notifier: Box<dyn Notifier>,
        ticker: T,
        max_errors: u32,
    ) -> Self {
        Self {
            source,
            notifier,
            ticker,
            build_id: build_id.into(),
            max_errors,
            state: MonitorState::default(),
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    /// Poll until the build reaches a terminal status, returning that snapshot.
    pub async fn run(&mut self) -> Result<BuildSnapshot, MonitorError> {
        loop {
            info!(build = %self.build_id, "Polling build");
            match self.source.fetch(&self.build_id).await {
                Ok(snapshot) => {
                    if self.handle(&snapshot).await? == Transition::Finished {
                        return Ok(snapshot);
                    }
                }
                Err(err) => {
                    if !self.state.record_error(self.max_errors) {
                        error!(
                            max_errors = self.max_errors,
                            error = %err,
                            "Reached maximum number of errors"
                        );
                        return Err(MonitorError::BudgetExhausted {
                            max_errors: self.max_errors,
                            last: err,
                        });
                    }
                    warn!(
                        error = %err,
                        attempt = self.state.consecutive_errors,
                        max_errors = self.max_errors,
                        "Failed to get build details, will retry next tick"
                    );
                }
            }
            self.ticker.tick().await;
        }
    }

    async fn handle(&mut self, snapshot: &BuildSnapshot) -> Result<Transition, MonitorError> {
        let transition = self.state.observe(&snapshot.status);
        match transition {
            Transition::Started => {
                info!(build = %snapshot.id, "Build started. Notifying");
                self.notifier.notify(snapshot).await?;
            }
            Transition::Progress => self.notify_steps(snapshot).await?,
            Transition::Finished => {
                info!(build = %snapshot.id, status = %snapshot.status, "Terminal status reached. Notifying");
                self.notify_steps(snapshot).await?;
                self.notifier.notify(snapshot).await?;
            }
            Transition::Idle => {}
        }
        Ok(transition)
    }

    async fn notify_steps(&mut self, snapshot: &BuildSnapshot) -> Result<(), MonitorError> {
        if let Some(steps) = self.notifier.steps() {
            steps.notify_step(snapshot).await?;
        }
        Ok(())
    }
}
