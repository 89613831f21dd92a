//! Status glyphs shared by every transport.
//!
//! Build-level and step-level statuses use separate tables. Both are total:
//! anything unrecognized renders as a question mark.

use crate::build::{BuildStatus, StepState};

pub const QUESTION: &str = ":question:";

// Build level
pub const HAMMER: &str = ":hammer:";
pub const CHECK: &str = ":white_check_mark:";
pub const CROSS: &str = ":x:";
pub const WASTEBASKET: &str = ":wastebasket:";
pub const HOURGLASS: &str = ":hourglass:";
pub const INTERROBANG: &str = ":interrobang:";

// Step level
pub const STEP_OK: &str = ":check_green:";
pub const STEP_FAILED: &str = ":x:";
pub const STEP_UNSURE: &str = ":notsureif:";

pub fn build_emoji(status: &BuildStatus) -> &'static str {
    match status {
        BuildStatus::Working => HAMMER,
        BuildStatus::Success => CHECK,
        BuildStatus::Failure => CROSS,
        BuildStatus::Cancelled => WASTEBASKET,
        BuildStatus::Timeout => HOURGLASS,
        BuildStatus::StatusUnknown | BuildStatus::InternalError => INTERROBANG,
        BuildStatus::Queued | BuildStatus::Other(_) => QUESTION,
    }
}

pub fn step_emoji(state: &StepState) -> &'static str {
    match state {
        StepState::Success => STEP_OK,
        StepState::Failure | StepState::InternalError | StepState::Timeout | StepState::Expired => {
            STEP_FAILED
        }
        StepState::StatusUnknown | StepState::Cancelled => STEP_UNSURE,
        StepState::Pending | StepState::Queued | StepState::Working | StepState::Other(_) => {
            QUESTION
        }
    }
}
